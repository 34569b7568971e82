//! Festiv CLI - database migrations and admin bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Create the schema and the session table
//! festiv migrate
//!
//! # Create the first admin (later admins register through the API)
//! festiv admin create --name "Asha Rao" --email asha@festiv.in \
//!     --phone 9876543210 --password 'correct horse battery'
//! ```
//!
//! # Environment Variables
//!
//! - `FESTIV_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "festiv")]
#[command(author, version, about = "Festiv CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations and create the session table
    Migrate,
    /// Manage admins
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create an admin with a password
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Ten-digit phone number
        #[arg(short, long)]
        phone: String,

        /// Password (at least 8 characters)
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

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
        Commands::Admin { action } => match action {
            AdminAction::Create {
                name,
                email,
                phone,
                password,
            } => {
                let id = commands::admin::create(&name, &email, &phone, &password).await?;
                tracing::info!(admin_id = %id, "Admin created");
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_create() {
        let cli = Cli::try_parse_from([
            "festiv", "admin", "create", "--name", "Asha", "--email", "asha@festiv.in",
            "--phone", "9876543210", "--password", "long enough",
        ]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Admin {
                action: AdminAction::Create { .. }
            })
        ));
    }
}
