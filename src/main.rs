//! Receiptbox cli

use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use receiptbox::*;
use std::path::PathBuf;
use tracing::{info, warn};

/// Cli
#[derive(Debug, Parser)]
#[command(name = "receiptbox", about = "Donation payment and receipt server.", version)]
pub struct Cli {
    /// config file path
    #[arg(short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// run migrations and start the http server (default)
    Serve,
    /// apply database migrations
    Migrate {
        /// drop all tables first
        #[arg(long)]
        fresh: bool,
    },
    /// email an issued receipt again
    Resend {
        #[arg(value_name = "RECEIPT_NUMBER")]
        receipt_number: String,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "INFO");
    }
    // try to load config from .env
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let args = Cli::parse();
    let state: AppState = AppState::create(args.config, Some("RECEIPTBOX".to_string())).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            Migrator::up(state.service.db(), None).await?;
            info!("Start receiptbox server");
            start(state).await?;
            info!("Server shutdown");
        }
        Command::Migrate { fresh } => {
            if fresh {
                warn!("Drop all tables and migrate");
                Migrator::fresh(state.service.db()).await?;
            } else {
                Migrator::up(state.service.db(), None).await?;
            }
            info!("Migration done");
        }
        Command::Resend { receipt_number } => {
            match state.service.resend_receipt(&receipt_number).await? {
                Delivery::Sent => info!(receipt_number = %receipt_number, "receipt sent"),
                Delivery::NoAddress => warn!(receipt_number = %receipt_number, "donor has no email"),
                Delivery::Failed(reason) => {
                    return Err(Error::DeliveryFailure(reason));
                }
            }
        }
    }
    Ok(())
}
