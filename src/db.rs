use std::time::Duration;

use anyhow::anyhow;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub const DEFAULT_MAX_POOL_SIZE: u32 = 4;
pub const DEFAULT_STATEMENT_TIMEOUT_MS: u64 = 5_000;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies `statement_timeout` to every connection the pool hands out.
#[derive(Debug, Clone, Copy)]
struct StatementTimeout(Duration);

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for StatementTimeout {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "SET statement_timeout = {}",
            self.0.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    init_pool_with(
        database_url,
        DEFAULT_MAX_POOL_SIZE,
        Duration::from_millis(DEFAULT_STATEMENT_TIMEOUT_MS),
    )
}

pub fn init_pool_with(
    database_url: &str,
    max_size: u32,
    statement_timeout: Duration,
) -> anyhow::Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool_size = max_size.max(1);
    let pool = Pool::builder()
        .max_size(pool_size)
        .connection_timeout(Duration::from_secs(10))
        .connection_customizer(Box::new(StatementTimeout(statement_timeout)))
        .build(manager)?;
    Ok(pool)
}

pub fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
    Ok(())
}
