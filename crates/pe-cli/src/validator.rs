//! Startup validation of the application configuration.

use crate::config::AppConfig;
use colored::Colorize;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Critical errors that prevent startup.
    pub errors: Vec<String>,
    /// Warnings that should be addressed but don't prevent startup.
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
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_database_url(config, &mut result);
        Self::validate_server(config, &mut result);
        Self::validate_navigation_lock(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_database_url(config: &AppConfig, result: &mut ValidationResult) {
        let url = &config.database.url;

        if url.is_empty() {
            result.add_error("Database URL is empty");
        } else if !(url.starts_with("sqlite:") || url.starts_with("postgres")) {
            result.add_error(format!(
                "Unsupported database URL '{}': expected sqlite: or postgres://",
                url
            ));
        } else if url.contains("memory") {
            result.add_warning("In-memory database: policies are lost on restart");
        }
    }

    fn validate_server(config: &AppConfig, result: &mut ValidationResult) {
        if let Err(e) = config.api_server_config() {
            result.add_error(format!("{:#}", e));
        }

        let session = &config.server.session;
        if session.cookie_name.trim().is_empty() {
            result.add_error("Session cookie name is empty");
        }
        if session.expiry_seconds <= 0 {
            result.add_error(format!(
                "Session expiry must be positive, got {}",
                session.expiry_seconds
            ));
        }
        if !session.secure {
            result.add_warning(
                "Session cookie is not marked secure. Enable server.session.secure behind HTTPS.",
            );
        }
    }

    fn validate_navigation_lock(config: &AppConfig, result: &mut ValidationResult) {
        if let Err(e) = config.navigation_lock() {
            result.add_error(format!("{:#}", e));
        }

        if config.navigation_lock.lock.token_query_param.trim().is_empty() {
            result.add_error("Navigation lock token query parameter is empty");
        }

        for path in &config.navigation_lock.allowed_paths {
            if !path.starts_with('/') {
                result.add_error(format!(
                    "Allowed path '{}' must be absolute (start with '/')",
                    path
                ));
            }
        }
    }

    fn validate_logging(config: &AppConfig, result: &mut ValidationResult) {
        if let Err(e) = config.logging_config() {
            result.add_error(format!("{:#}", e));
        }
    }
}
