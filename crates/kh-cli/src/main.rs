//! Knowledge Hub CLI
//!
//! Runs the portal and its maintenance tasks.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod config;
mod logging;
mod validator;

use commands::{create_superuser, migrate, print_stats, run_server, ServeOverrides, SuperuserArgs};
use config::AppConfig;
use validator::ConfigValidator;

#[derive(Parser)]
#[command(name = "knowledge-hub")]
#[command(author = "Knowledge Hub Team")]
#[command(version)]
#[command(about = "Internal knowledge-base portal", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "KH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Database URL (sqlite://...)
        #[arg(short, long, env = "DATABASE_URL")]
        database: Option<String>,

        /// Validate configuration and exit without starting the server
        #[arg(long)]
        validate_only: bool,
    },

    /// Apply database migrations
    Migrate {
        /// Database URL (sqlite://...)
        #[arg(short, long, env = "DATABASE_URL")]
        database: Option<String>,
    },

    /// Create a superuser account
    CreateSuperuser {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Job title shown on the profile
        #[arg(long, default_value = "Administrator")]
        position: String,

        /// Password
        #[arg(long, env = "KH_SUPERUSER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Database URL (sqlite://...)
        #[arg(short, long, env = "DATABASE_URL")]
        database: Option<String>,
    },

    /// Show site statistics
    Stats {
        /// Database URL (sqlite://...)
        #[arg(short, long, env = "DATABASE_URL")]
        database: Option<String>,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = AppConfig::load_or_default(&config_path)?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    logging::init_logging(level, config.logging.json);

    match cli.command {
        Commands::Serve {
            port,
            host,
            database,
            validate_only,
        } => {
            let config = ServeOverrides {
                host,
                port,
                database_url: database,
            }
            .apply(config);
            cmd_serve(config, validate_only).await
        }
        Commands::Migrate { database } => migrate(&with_database(config, database)).await,
        Commands::CreateSuperuser {
            username,
            email,
            position,
            password,
            database,
        } => {
            create_superuser(
                &with_database(config, database),
                SuperuserArgs {
                    username,
                    email,
                    position,
                    password,
                },
            )
            .await
        }
        Commands::Stats { database } => {
            print_stats(
                &with_database(config, database),
                cli.format == OutputFormat::Json,
            )
            .await
        }
        Commands::Config => cmd_config(&config, &config_path, cli.format),
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "knowledge-hub", "knowledge-hub") {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config/default.yaml")
    }
}

fn with_database(config: AppConfig, database: Option<String>) -> AppConfig {
    ServeOverrides {
        database_url: database,
        ..Default::default()
    }
    .apply(config)
}

async fn cmd_serve(config: AppConfig, validate_only: bool) -> Result<()> {
    println!("{}", "Validating configuration...".cyan());

    let validation_result = ConfigValidator::validate(&config);
    validation_result.print();

    if validation_result.has_errors() {
        println!();
        let message = if validate_only {
            "Configuration validation failed. Fix the errors above before starting the server."
        } else {
            "Server startup aborted due to configuration errors. Fix the errors above and try again."
        };
        println!("{}", message.red().bold());
        std::process::exit(1);
    }

    if validate_only {
        println!();
        if validation_result.has_warnings() {
            println!(
                "{}",
                "Configuration is valid with warnings. Review the warnings above."
                    .yellow()
                    .bold()
            );
        } else {
            println!(
                "{}",
                "Configuration is valid. Server can be started."
                    .green()
                    .bold()
            );
        }
        return Ok(());
    }

    println!();
    run_server(config).await
}

fn cmd_config(config: &AppConfig, path: &std::path::Path, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        let source = if path.exists() {
            path.display().to_string()
        } else {
            format!("{} (not found, using defaults)", path.display())
        };
        println!("{}", "Current Configuration".bold());
        println!("─────────────────────────");
        println!("{} {}", "Source:".cyan(), source);
        println!();
        print!("{}", serde_yaml::to_string(config)?);
    }

    Ok(())
}
