//! Startup validation of the effective configuration.

use crate::config::AppConfig;
use colored::Colorize;
use kh_core::db::seed::ADMIN_PASSWORD_ENV;
use kh_core::validate_password_strength;
use std::net::{IpAddr, SocketAddr};

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Problems that prevent startup.
    pub errors: Vec<String>,
    /// Problems worth fixing that do not prevent startup.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Validates application configuration before startup.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the configuration and the environment it depends on.
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_server(config, &mut result);
        Self::validate_database(config, &mut result);
        Self::validate_session(config, &mut result);
        Self::validate_logging(config, &mut result);
        Self::validate_admin_password(
            std::env::var(ADMIN_PASSWORD_ENV).ok().as_deref(),
            &mut result,
        );

        result
    }

    fn validate_server(config: &AppConfig, result: &mut ValidationResult) {
        let server = &config.server;

        if format!("{}:{}", server.host, server.port)
            .parse::<SocketAddr>()
            .is_err()
        {
            result.add_error(format!(
                "server.host '{}' is not a valid IP address (e.g., 0.0.0.0 or 127.0.0.1)",
                server.host
            ));
        }

        if server.port == 0 {
            result.add_warning("server.port is 0; the server will bind a random port.");
        }

        if server.request_timeout_secs == 0 {
            result.add_error("server.request_timeout_secs must be greater than 0.");
        }
    }

    fn validate_database(config: &AppConfig, result: &mut ValidationResult) {
        let database = &config.database;

        if !database.url.starts_with("sqlite:") {
            result.add_error(format!(
                "Unsupported database URL '{}'. Expected a sqlite: URL \
                 (e.g., sqlite://knowledge-hub.db?mode=rwc).",
                database.url
            ));
        } else if database.url.contains(":memory:") {
            result.add_warning("database.url is in-memory; all data is lost on shutdown.");
        }

        if database.max_connections == 0 {
            result.add_error("database.max_connections must be at least 1.");
        }
    }

    fn validate_session(config: &AppConfig, result: &mut ValidationResult) {
        let session = &config.session;

        let valid_name = !session.cookie_name.is_empty()
            && session
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid_name {
            result.add_error(format!(
                "session.cookie_name '{}' must be non-empty and use only letters, digits, '_', '-' or '.'.",
                session.cookie_name
            ));
        }

        if session.expiry_seconds == 0 {
            result.add_error("session.expiry_seconds must be greater than 0.");
        }

        let loopback = config
            .server
            .host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false);
        if !session.secure && !loopback {
            result.add_warning(
                "session.secure is false while listening on a public interface. \
                 Enable it when the portal is served over HTTPS.",
            );
        }
    }

    fn validate_logging(config: &AppConfig, result: &mut ValidationResult) {
        if config.logging.level.parse::<tracing::Level>().is_err() {
            result.add_error(format!(
                "logging.level '{}' is not one of trace, debug, info, warn, error.",
                config.logging.level
            ));
        }
    }

    fn validate_admin_password(password: Option<&str>, result: &mut ValidationResult) {
        let Some(password) = password.filter(|p| !p.is_empty()) else {
            return;
        };
        let problems = validate_password_strength(password);
        if !problems.is_empty() {
            result.add_error(format!(
                "{} is too weak: {}",
                ADMIN_PASSWORD_ENV,
                problems.join("; ")
            ));
        }
    }
}
