//! Gazetteer CLI - Database migrations and directory management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! gz-cli migrate
//!
//! # Drop everything and migrate from scratch
//! gz-cli reset --yes
//!
//! # Seed the first administrator from a secrets file
//! gz-cli admin seed --secrets secrets.json
//!
//! # Users and roles
//! gz-cli role create -n editor -d "Edits the directory"
//! gz-cli user create -e editor@example.org -p "long password" --role editor
//!
//! # Addresses
//! gz-cli address create -t country
//! gz-cli address create -t city --parent 1
//! gz-cli address name --id 1 -n Italy
//! gz-cli address show --id 2
//! ```
//!
//! All commands read `DATABASE_URL` (and the other `GAZETTEER_*` variables)
//! from the environment or a `.env` file.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gz-cli")]
#[command(author, version, about = "Gazetteer CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Drop the gazetteer schema and migrate from scratch
    Reset {
        /// Confirm that all data will be destroyed
        #[arg(long)]
        yes: bool,
    },
    /// Administrator bootstrap
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage roles
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
    /// Manage addresses and their names
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create the administrator from a secrets file unless it exists
    Seed {
        /// JSON file with `admin_username` and `admin_password`
        #[arg(short, long)]
        secrets: PathBuf,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Existing role to assign
        #[arg(short, long)]
        role: Option<String>,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// Create a new role
    Create {
        /// Role name
        #[arg(short, long)]
        name: String,

        /// Free-form description
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
enum AddressAction {
    /// Create an address
    Create {
        /// Type tag, e.g. `country` or `city`
        #[arg(short = 't', long = "type")]
        kind: String,

        /// Parent address id
        #[arg(long)]
        parent: Option<i32>,
    },
    /// Register a name and materialize full names
    Name {
        /// Address id
        #[arg(long)]
        id: i32,

        /// The new name
        #[arg(short, long)]
        name: String,
    },
    /// Show an address with its ancestors and name history
    Show {
        /// Address id
        #[arg(long)]
        id: i32,
    },
}

#[tokio::main]
async fn main() {
    // Command output goes through tracing, so default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
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
        Commands::Reset { yes } => commands::migrate::reset(yes).await?,
        Commands::Admin { action } => match action {
            AdminAction::Seed { secrets } => commands::admin::seed(&secrets).await?,
        },
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                password,
                role,
            } => commands::user::create(&email, &password, role.as_deref()).await?,
        },
        Commands::Role { action } => match action {
            RoleAction::Create { name, description } => {
                commands::role::create(&name, description.as_deref()).await?;
            }
        },
        Commands::Address { action } => match action {
            AddressAction::Create { kind, parent } => {
                commands::address::create(&kind, parent).await?;
            }
            AddressAction::Name { id, name } => commands::address::name(id, &name).await?,
            AddressAction::Show { id } => commands::address::show(id).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_address_create() {
        let cli = Cli::try_parse_from(["gz-cli", "address", "create", "-t", "city", "--parent", "3"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Address {
                action: AddressAction::Create { ref kind, parent: Some(3) }
            } if kind == "city"
        ));
    }

    #[test]
    fn test_reset_requires_flag_value() {
        let cli = Cli::try_parse_from(["gz-cli", "reset"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(cli.command, Commands::Reset { yes: false }));
    }
}
