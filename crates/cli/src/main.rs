//! Karavan CLI - database migrations and ops tooling.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! karavan migrate
//!
//! # Seed demo catalog products
//! karavan seed
//!
//! # Seed products and provision a demo admin
//! karavan seed --admin user_demo_admin
//!
//! # Grant the admin role to a synced user
//! karavan admin grant --external-id user_2x9PqLmT
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the catalog with demo products
//! - `admin grant` / `admin revoke` - Manage the admin role

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "karavan")]
#[command(author, version, about = "Karavan CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog with demo products
    Seed {
        /// Also provision a demo admin under this external id
        #[arg(long)]
        admin: Option<String>,
    },
    /// Manage the admin role
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin role to a synced user
    Grant {
        /// The identity provider's stable id for the user
        #[arg(long)]
        external_id: String,
    },
    /// Revoke the admin role from a synced user
    Revoke {
        /// The identity provider's stable id for the user
        #[arg(long)]
        external_id: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing; defaults to info when RUST_LOG is not set
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { admin } => commands::seed::run(admin.as_deref()).await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { external_id } => {
                commands::admin::set_role(&external_id, true).await?;
            }
            AdminAction::Revoke { external_id } => {
                commands::admin::set_role(&external_id, false).await?;
            }
        },
    }
    Ok(())
}
