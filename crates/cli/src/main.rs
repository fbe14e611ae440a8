//! Device warranty CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! dw-cli migrate
//!
//! # Create an administrator account (password read from stdin if omitted)
//! dw-cli admin create -e admin@example.com -n "Admin Name" -p +15550100 -a "HQ"
//!
//! # Create and list warranty passports
//! dw-cli passport create --name "Kettle" --model K1 --prefix ABC --from 1 --to 9999 --months 24
//! dw-cli passport list
//! ```
//!
//! All commands read the same environment as the server (`DW_DATABASE_URL`,
//! `DW_JWT_SECRET`, ...), including a `.env` file.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dw-cli")]
#[command(author, version, about = "Device warranty CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage administrator accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage warranty passports
    Passport {
        #[command(subcommand)]
        action: PassportAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new administrator account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Full name
        #[arg(short, long)]
        name: String,

        /// Phone number
        #[arg(short, long)]
        phone: String,

        /// Postal address
        #[arg(short, long, default_value = "-")]
        address: String,

        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum PassportAction {
    /// Create a passport
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        model: String,

        /// Serial number letter prefix, e.g. `ABC`
        #[arg(long)]
        prefix: String,

        /// First unit number covered (inclusive)
        #[arg(long)]
        from: i64,

        /// Last unit number covered (inclusive)
        #[arg(long)]
        to: i64,

        /// Warranty length in months
        #[arg(long)]
        months: i32,
    },
    /// List all passports as JSON
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                phone,
                address,
                password,
            } => {
                commands::admin::create(&name, &email, &phone, &address, password).await?;
            }
        },
        Commands::Passport { action } => match action {
            PassportAction::Create {
                name,
                model,
                prefix,
                from,
                to,
                months,
            } => {
                commands::passport::create(commands::passport::PassportArgs {
                    name,
                    model,
                    prefix,
                    from,
                    to,
                    months,
                })
                .await?;
            }
            PassportAction::List => commands::passport::list().await?,
        },
    }
    Ok(())
}
