//! `product-import` command-line entry point.
//!
//! ```text
//! product-import import <file> <platform> [location_id]
//! product-import backfill
//! product-import reset-image <sku>
//! product-import logs [platform]
//! ```
//!
//! Settings come from `config/default.yaml` (or the file named by
//! `PRODUCT_IMPORT_CONFIG`) and `PRODUCT_IMPORT__*` environment variables.

use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::{error, info};

use product_import::db::establish_connection_pool;
use product_import::forms::import::{ImportProductsForm, ImportProductsPayload};
use product_import::models::config::AppConfig;
use product_import::repository::DieselRepository;
use product_import::services::images::{BackfillOptions, HttpImageFetcher, run_image_backfill};
use product_import::services::import::{import_products, reset_image_failure, show_import_logs};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Parser, Debug)]
#[command(
    name = "product-import",
    version,
    about = "Product spreadsheet import and image backfill"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Import a product spreadsheet (XLSX or XLS) into the catalog
    Import {
        /// Path to the spreadsheet
        file: String,
        /// Platform tag selecting the column layout
        platform: String,
        /// Stock location assigned to imported entries
        location: Option<i32>,
    },
    /// Download missing product images
    Backfill,
    /// Re-admit an entry whose image download was given up
    ResetImage { sku: String },
    /// List import logs, newest first
    Logs {
        /// Only show logs of this platform
        platform: Option<String>,
    },
}

fn run(command: Commands, config: &AppConfig) -> Result<(), String> {
    let pool = establish_connection_pool(&config.database_url)
        .map_err(|e| format!("failed to open {}: {e}", config.database_url))?;
    {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| format!("failed to run migrations: {e}"))?;
    }
    let repo = DieselRepository::new(pool);
    let mut session = repo.session().map_err(|e| e.to_string())?;

    match command {
        Commands::Import {
            file,
            platform,
            location,
        } => {
            let bytes = std::fs::read(&file).map_err(|e| format!("failed to read {file}: {e}"))?;
            let file_name = Path::new(&file)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.clone());
            let form = ImportProductsForm {
                file_name,
                file: bytes,
                platform,
                default_location: location,
                batch_size: config.import.batch_size,
            };
            let payload = ImportProductsPayload::try_from(form).map_err(|e| e.to_string())?;
            let log = import_products(payload, &mut session).map_err(|e| e.to_string())?;
            info!(
                "Import log #{}: {} total, {} imported, {} failed, {} without SKU",
                log.id, log.total, log.success, log.failed, log.skipped
            );
            for line in log.messages() {
                println!("{line}");
            }
        }
        Commands::Backfill => {
            let fetcher = HttpImageFetcher::new().map_err(|e| e.to_string())?;
            let options = BackfillOptions::from(&config.image_backfill);
            let summary =
                run_image_backfill(&mut session, &fetcher, options).map_err(|e| e.to_string())?;
            println!(
                "processed={} succeeded={} failed={}",
                summary.processed, summary.succeeded, summary.failed
            );
        }
        Commands::ResetImage { sku } => {
            reset_image_failure(&sku, &mut session).map_err(|e| format!("{sku}: {e}"))?;
        }
        Commands::Logs { platform } => {
            let logs =
                show_import_logs(platform.as_deref(), &mut session).map_err(|e| e.to_string())?;
            for log in logs {
                println!(
                    "#{} {} [{}] {}: total={} success={} failed={} skipped={}",
                    log.id,
                    log.created_at,
                    log.platform,
                    log.name,
                    log.total,
                    log.success,
                    log.failed,
                    log.skipped
                );
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match AppConfig::load(None) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
