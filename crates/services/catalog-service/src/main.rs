//! Catalog Service - maintenance commands for the catalog store.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_service_lib::config::CatalogConfig;
use catalog_service_lib::{Catalog, MigrateAction};

#[derive(Parser)]
#[command(name = "catalog-service")]
#[command(about = "Catalog, stock and account data-access core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    /// Check store and cache connectivity
    Health,
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            catalog_service_lib::run_migrations(migrate_action).await?;
        }
        Commands::Health => {
            let config = CatalogConfig::from_env();
            let catalog = Catalog::connect(&config).await?;
            let report = catalog.health().await;

            println!("store: {:?}", report.store);
            println!("cache: {:?}", report.cache);

            if !report.is_healthy() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
