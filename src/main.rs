use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower::make::Shared;
use tracing_subscriber::EnvFilter;

use internhub::auth::jwt::JwtService;
use internhub::config::AppConfig;
use internhub::db;
use internhub::engine::Engine;
use internhub::mail::build_mailer;
use internhub::notify::NotificationDispatcher;
use internhub::routes::create_router;
use internhub::state::AppState;
use internhub::store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "api",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        server_host = %config.server_host,
        server_port = config.server_port,
        smtp_enabled = config.smtp.is_some(),
        notify_queue_capacity = config.notify_queue_capacity,
        "loaded backend configuration"
    );

    let pool = db::init_pool_with(
        &config.database_url,
        config.database_max_pool_size,
        config.database_statement_timeout,
    )?;
    {
        let pool = pool.clone();
        tokio::task::spawn_blocking(move || db::run_migrations(&pool)).await??;
    }

    let store = Arc::new(PgStore::new(pool, config.store_timeout));
    let mailer = build_mailer(&config)?;
    let (notifier, worker) = NotificationDispatcher::new(
        config.notify_queue_capacity,
        store.clone(),
        store.clone(),
        mailer,
        config.mail_timeout,
    );
    tokio::spawn(worker.run());

    let engine = Engine::new(store.clone(), store.clone(), notifier);
    let jwt = JwtService::from_config(&config)?;
    let listen_addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;

    let state = AppState::new(config, jwt, engine, store.clone(), store);
    let router = create_router(state);

    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("listening on {}", listen_addr);

    axum::serve(listener, Shared::new(router))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
