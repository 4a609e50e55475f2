//! Database initialization
//!
//! `init_db [--drop] [--seed]`: create the tables, optionally dropping the
//! existing ones first (after confirmation) and loading sample data.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};
use tracing::{info, warn};

use rose_checker::auth::password::default_params;
use rose_checker::seed::{seed_sample_data, SAMPLE_USERS};
use rose_checker::utils::init_tracing;
use rose_checker::{Settings, SqliteStore};

struct Options {
    drop_existing: bool,
    seed: bool,
}

fn parse_args() -> Result<Options> {
    let mut options = Options { drop_existing: false, seed: false };
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--drop" => options.drop_existing = true,
            "--seed" => options.seed = true,
            "-h" | "--help" => {
                println!("Usage: init_db [--drop] [--seed]");
                std::process::exit(0);
            }
            other => bail!("Unknown argument '{}'. Usage: init_db [--drop] [--seed]", other),
        }
    }
    Ok(options)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = parse_args()?;
    let settings = Settings::from_env()?;
    let _telemetry = init_tracing("init_db", None)?;

    info!("{}", "=".repeat(60));
    info!("{} - Database Initialization", settings.app_name);
    info!("{}", "=".repeat(60));
    info!("Database URL: {}", settings.database_url);

    let db_path = settings.database_path()?;
    let store = SqliteStore::new(&db_path).await?;

    if options.drop_existing {
        if !confirm("\n⚠️  This will DELETE all existing data. Continue? (yes/no): ")? {
            info!("Operation cancelled by user");
            return Ok(());
        }
        warn!("Dropping all tables...");
        store.drop_all().await?;
        store.init().await?;
    }

    let tables = store.table_names().await?;
    info!("✓ Database initialized with {} tables: {}", tables.len(), tables.join(", "));

    if options.seed {
        let report = seed_sample_data(&store, default_params()).await?;
        info!(
            "Seed: {} users created, {} already present, {} diagnoses added",
            report.users_created, report.users_existing, report.diagnoses_created
        );
        info!("Sample User Credentials:");
        for user in &SAMPLE_USERS {
            info!("  Email: {}  Password: {}", user.email, user.password);
        }
    }

    info!("Database initialization complete!");
    Ok(())
}
