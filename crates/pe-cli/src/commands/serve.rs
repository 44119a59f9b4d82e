//! Serve command - starts the API server.

use anyhow::{Context, Result};
use colored::Colorize;

use pe_api::{ApiServer, AppState};
use pe_core::db::{create_pool, run_migrations};

use crate::config::AppConfig;

/// Runs the API server until shutdown.
pub async fn run_server(config: AppConfig) -> Result<()> {
    println!(
        "{} Starting Password Enhancements API Server...",
        "[server]".cyan()
    );

    println!("  {} Database: {}", "→".green(), config.database.url);
    let db_pool = create_pool(&config.database.url)
        .await
        .context("Failed to create database connection pool")?;

    println!("  {} Running migrations...", "→".green());
    run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    println!("  {} Migrations complete", "✓".green());

    let lock = config.navigation_lock()?;
    let server_config = config.api_server_config()?;

    println!();
    println!("{}", "Password Enhancements API Server".bold());
    println!("{}", "═".repeat(40));
    println!(
        "  {} http://{}",
        "Address:".cyan(),
        server_config.bind_address
    );
    println!("  {} {}", "Database:".cyan(), config.database.url);
    println!(
        "  {} {}",
        "Password change:".cyan(),
        lock.password_change_path()
    );
    println!("  {} {}", "Allowed while locked:".cyan(), lock.allowed_paths().join(", "));

    println!();
    println!("{}", "Endpoints:".bold());
    println!("  GET  /health                           - Health check");
    println!(
        "  GET  {:<34} - Password change details",
        lock.password_change_path()
    );
    println!("  POST {:<34} - Log out", lock.logout_path());
    println!("  GET  /api/messages                     - Drain flash messages");
    println!("  GET  /api/policies                     - List policies");
    println!("  GET  /api/policies/resolve             - Resolve governing policy");
    println!("  POST /api/policies                     - Create policy");
    println!("  PUT  /api/users/:id/password-state     - Force a password change");
    println!();
    println!("Press {} to stop", "Ctrl+C".yellow());
    println!();

    let state = AppState::from_pool(&db_pool, lock);
    let server = ApiServer::new(state, server_config);
    server.run().await.context("Server error")?;

    println!();
    println!("{} Server stopped", "[server]".cyan());

    Ok(())
}
