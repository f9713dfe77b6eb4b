use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use tracing_subscriber::EnvFilter;

use internhub::{attendance, auth::password, config::AppConfig, db, store::PgStore};

const USAGE: &str =
    "Usage: maintenance backfill-attendance [--today YYYY-MM-DD] | maintenance hash-password <password>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("backfill-attendance") => {
            let today = parse_today(args.collect())?;
            backfill_attendance(today).await?
        }
        Some("hash-password") => match args.next() {
            Some(plain) => println!("{}", password::hash_password(&plain)?),
            None => {
                eprintln!("{USAGE}");
                std::process::exit(1);
            }
        },
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn parse_today(args: Vec<String>) -> Result<NaiveDate> {
    match args.as_slice() {
        [] => Ok(Utc::now().date_naive()),
        [flag, value] if flag == "--today" => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .with_context(|| format!("invalid date `{value}`, expected YYYY-MM-DD")),
        _ => anyhow::bail!("unexpected arguments: {}\n{USAGE}", args.join(" ")),
    }
}

async fn backfill_attendance(today: NaiveDate) -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        %today,
        "loaded backend configuration"
    );
    let pool = db::init_pool_with(
        &config.database_url,
        config.database_max_pool_size,
        config.database_statement_timeout,
    )?;
    // Batch runs get a longer per-call bound than requests.
    let store = PgStore::new(pool, config.store_timeout.max(Duration::from_secs(30)));

    let report = attendance::backfill_absences(&store, today)
        .await
        .context("attendance backfill failed")?;
    println!(
        "Backfill complete: {} interns, {} absences inserted, {} already recorded.",
        report.interns, report.inserted, report.duplicates
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
