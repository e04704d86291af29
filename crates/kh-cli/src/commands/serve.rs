//! Serve command: migrates, seeds the first superuser and starts the portal.

use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::time::Duration;

use kh_api::{ApiServer, ApiServerConfig, AppState, SessionConfig};
use kh_core::db::{ensure_superuser, seed::ADMIN_USERNAME};

use super::admin::open_database;
use crate::config::AppConfig;

/// Command-line overrides for the `[server]` and `[database]` settings.
#[derive(Debug, Clone, Default)]
pub struct ServeOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
}

impl ServeOverrides {
    /// Applies the overrides on top of the file configuration.
    pub fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        config
    }
}

/// Builds the web server settings from the configuration.
pub fn server_config(config: &AppConfig) -> Result<ApiServerConfig> {
    let bind_address: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid bind address")?;

    Ok(ApiServerConfig {
        bind_address,
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        session: SessionConfig {
            cookie_name: config.session.cookie_name.clone(),
            expiry: Duration::from_secs(config.session.expiry_seconds),
            secure: config.session.secure,
        },
    })
}

/// Runs the web server until Ctrl+C or SIGTERM.
pub async fn run_server(config: AppConfig) -> Result<()> {
    println!("{} Starting Knowledge Hub...", "[server]".cyan());

    let server_config = server_config(&config)?;
    let db_pool = open_database(&config).await?;

    if let Some(password) = ensure_superuser(&db_pool)
        .await
        .context("Failed to create the initial superuser")?
    {
        println!();
        println!("{}", "Initial superuser created".yellow().bold());
        println!("  {} {}", "Username:".cyan(), ADMIN_USERNAME);
        println!("  {} {}", "Password:".cyan(), password);
        println!(
            "  {}",
            "This password is shown only once. Change it after logging in.".yellow()
        );
    }

    let state = AppState::new(db_pool);
    let bind_address = server_config.bind_address;

    println!();
    println!("{}", "Knowledge Hub".bold());
    println!("{}", "═".repeat(40));
    println!("  {} http://{}", "Address:".cyan(), bind_address);
    println!("  {} {}", "Database:".cyan(), config.database.url);
    println!();
    println!("{}", "Pages:".bold());
    println!("  GET  /                   - Home and statistics");
    println!("  GET  /knowledge_list     - Knowledge bases");
    println!("  GET  /category_list      - Categories");
    println!("  GET  /article_list       - Articles");
    println!("  GET  /employee_list/     - Employees");
    println!("  GET  /login              - Log in");
    println!("  GET  /health             - Health check");
    println!();
    println!("Press {} to stop", "Ctrl+C".yellow());
    println!();

    let server = ApiServer::new(state, server_config);
    server.run().await.context("Server error")?;

    println!();
    println!("{} Server stopped", "[server]".cyan());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_file_values() {
        let overrides = ServeOverrides {
            host: Some("127.0.0.1".to_string()),
            port: Some(9000),
            database_url: None,
        };
        let config = overrides.apply(AppConfig::default());

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.url, "sqlite://knowledge-hub.db?mode=rwc");
    }

    #[test]
    fn test_server_config_from_app_config() {
        let mut config = AppConfig::default();
        config.session.secure = true;
        config.session.expiry_seconds = 600;

        let server = server_config(&config).unwrap();
        assert_eq!(server.bind_address, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(server.request_timeout, Duration::from_secs(30));
        assert_eq!(server.session.expiry, Duration::from_secs(600));
        assert!(server.session.secure);
    }

    #[test]
    fn test_server_config_rejects_bad_host() {
        let mut config = AppConfig::default();
        config.server.host = "example host".to_string();
        assert!(server_config(&config).is_err());
    }
}
