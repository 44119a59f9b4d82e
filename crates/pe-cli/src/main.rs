//! Password Enhancements CLI
//!
//! Runs the API server and administers password policies.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

mod commands;
mod config;
mod validator;

use commands::{run_policy_command, run_server, PolicyCommand};
use config::AppConfig;
use pe_observability::{init_logging_with_config, LogFormat};
use validator::ConfigValidator;

#[derive(Parser)]
#[command(name = "password-enhancements")]
#[command(version)]
#[command(about = "Password policies and forced password changes", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
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
    /// Start the API server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Database URL (overrides config)
        #[arg(short, long)]
        database: Option<String>,

        /// Validate configuration and exit without starting the server
        #[arg(long)]
        validate_only: bool,
    },

    /// Manage password policies
    Policies {
        /// Database URL (overrides config)
        #[arg(short, long, global = true)]
        database: Option<String>,

        #[command(subcommand)]
        action: PolicyCommand,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Validate the configuration
    Check,

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path, cli.config.is_some(), cli.verbose)?;
    config.apply_env_overrides()?;

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.format == OutputFormat::Json {
        config.logging.format = LogFormat::Json;
    }

    if let Err(e) = config
        .logging_config()
        .and_then(|logging| init_logging_with_config(logging).map_err(Into::into))
    {
        eprintln!("{}: {:#}", "Logging disabled".yellow(), e);
    }

    let json = cli.format == OutputFormat::Json;

    match cli.command {
        Commands::Serve {
            port,
            host,
            database,
            validate_only,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(database) = database {
                config.database.url = database;
            }
            cmd_serve(config, validate_only).await
        }
        Commands::Policies { database, action } => {
            let database_url = database.unwrap_or(config.database.url);
            run_policy_command(action, &database_url, json).await
        }
        Commands::Config { action } => match action {
            ConfigCommand::Check => cmd_config_check(&config, &config_path),
            ConfigCommand::Show => cmd_config_show(&config),
        },
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from(
        "org",
        "password-enhancements",
        "password-enhancements",
    ) {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config/default.yaml")
    }
}

/// Loads the configuration file. A missing default file falls back to the
/// built-in defaults; a missing explicit file is an error.
fn load_config(path: &Path, explicit: bool, verbose: bool) -> Result<AppConfig> {
    if !explicit && !path.exists() {
        if verbose {
            eprintln!("Using default configuration (no config file found)");
        }
        return Ok(AppConfig::default());
    }

    AppConfig::load(path).with_context(|| format!("Cannot load {}", path.display()))
}

async fn cmd_serve(config: AppConfig, validate_only: bool) -> Result<()> {
    println!("{}", "Validating configuration...".cyan());

    let validation_result = ConfigValidator::validate(&config);
    validation_result.print();

    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Server startup aborted due to configuration errors. Fix the errors above and try again."
                .red()
                .bold()
        );
        std::process::exit(1);
    }

    if validate_only {
        println!();
        println!(
            "{}",
            "Configuration is valid. Server can be started."
                .green()
                .bold()
        );
        return Ok(());
    }

    println!();
    run_server(config).await
}

fn cmd_config_check(config: &AppConfig, config_path: &Path) -> Result<()> {
    println!(
        "{} {}",
        "Checking configuration:".bold(),
        config_path.display()
    );

    let result = ConfigValidator::validate(config);
    result.print();

    println!();
    println!("{}", "Configuration Summary".bold());
    println!("─────────────────────");
    println!(
        "  Bind: {}:{}",
        config.server.host, config.server.port
    );
    println!("  Database: {}", config.database.url);
    println!(
        "  Token parameter: {}",
        config.navigation_lock.lock.token_query_param
    );
    println!(
        "  Extra allowed paths: {}",
        config.navigation_lock.allowed_paths.len()
    );

    if result.has_errors() {
        println!();
        println!("{}", "Configuration is invalid.".red().bold());
        std::process::exit(1);
    }

    println!();
    println!("{}", "Configuration is valid.".green().bold());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
