//! Policy administration against the configured database.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::sync::Arc;

use pe_core::db::{
    create_constraint_repository, create_policy_repository, create_pool, run_migrations,
    SqlCascadeBoundary,
};
use pe_core::{NewPolicy, Policy, PolicyResolver, PolicyStore, QueryOrder};

#[derive(Subcommand)]
pub enum PolicyCommand {
    /// List policies in ranked order
    List {
        /// Comma-separated roles (omit for all, empty for none)
        #[arg(short, long)]
        roles: Option<String>,

        /// Sort order (asc, desc)
        #[arg(short, long, default_value = "desc")]
        order: QueryOrder,
    },

    /// Show the policy governing a set of roles
    Resolve {
        /// Comma-separated roles
        roles: String,

        /// Sort order (asc, desc)
        #[arg(short, long, default_value = "desc")]
        order: QueryOrder,
    },

    /// Create a policy for a role
    Create {
        /// Role governed by the policy
        role: String,

        /// Priority; higher wins
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        priority: i32,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete policies and their constraints
    Delete {
        /// Policy ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

fn parse_roles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect()
}

async fn open_store(database_url: &str) -> Result<Arc<PolicyStore>> {
    let pool = create_pool(database_url)
        .await
        .context("Failed to create database connection pool")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let store = PolicyStore::new(
        Arc::from(create_policy_repository(&pool)),
        Arc::from(create_constraint_repository(&pool)),
    )
    .with_cascade_boundary(Arc::new(SqlCascadeBoundary::new(pool)));

    Ok(Arc::new(store))
}

fn print_policy_line(policy: &Policy) {
    println!(
        "  {:<24} {:>6}  {}",
        policy.id.cyan(),
        policy.priority,
        policy.description.as_deref().unwrap_or("-")
    );
}

/// Runs a policy subcommand.
pub async fn run_policy_command(
    command: PolicyCommand,
    database_url: &str,
    json: bool,
) -> Result<()> {
    let store = open_store(database_url).await?;
    let resolver = PolicyResolver::new(store.clone());

    match command {
        PolicyCommand::List { roles, order } => {
            let roles = roles.as_deref().map(parse_roles);
            let policies = resolver.resolve_all(roles.as_deref(), order).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&policies)?);
            } else {
                println!("{}", "Policies".bold());
                println!("────────");
                if policies.is_empty() {
                    println!("No policies found");
                }
                for policy in &policies {
                    print_policy_line(policy);
                }
            }
        }
        PolicyCommand::Resolve { roles, order } => {
            let roles = parse_roles(&roles);
            let policy = resolver.resolve_one(Some(&roles), order).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&policy)?);
            } else {
                match policy {
                    Some(policy) => {
                        println!("{}", "Governing policy".bold());
                        print_policy_line(&policy);

                        let constraints = store.constraints_for(&policy.id).await?;
                        println!();
                        println!("{} ({})", "Constraints".bold(), constraints.len());
                        for constraint in &constraints {
                            println!("  {} {}", constraint.kind.cyan(), constraint.settings);
                        }
                    }
                    None => println!("No policy governs roles: {}", roles.join(", ")),
                }
            }
        }
        PolicyCommand::Create {
            role,
            priority,
            description,
        } => {
            let policy = store
                .create(NewPolicy {
                    role,
                    priority,
                    description,
                })
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&policy)?);
            } else {
                println!("{} Created policy {}", "✓".green(), policy.id.bold());
            }
        }
        PolicyCommand::Delete { ids } => {
            let report = store.delete(&ids).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for id in &report.deleted {
                    println!("{} Deleted policy {}", "✓".green(), id.bold());
                }
                for id in &report.missing {
                    println!("{} No policy {}", "⚠".yellow(), id);
                }
                println!("  {} constraint(s) removed", report.constraints_deleted);
            }
        }
    }

    Ok(())
}
