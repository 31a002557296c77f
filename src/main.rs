//! Fleamarket - Marketplace REST backend
//! Mission: Serve signup/login/refresh/logout and item listings behind JWT auth

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::{net::TcpListener, time::interval};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleamarket_backend::{
    auth::{AuthService, JwtHandler, SqliteTokenBlacklist, SqliteUserStore},
    create_router,
    items::SqliteItemStore,
    Command, Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    let config = Config::parse();
    init_tracing();

    match config.command() {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(&config),
        Command::PurgeTokens => purge_tokens(&config),
    }
}

async fn serve(config: Config) -> Result<()> {
    let secret = config.require_secret()?;
    let (auth_service, item_store) = open_stores(&config, secret)?;

    let purge_task = tokio::spawn(blacklist_purge_polling(
        auth_service.clone(),
        config.purge_interval(),
    ));

    let app = create_router(auth_service, item_store);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    purge_task.abort();
    info!("Server stopped gracefully");
    Ok(())
}

fn open_stores(
    config: &Config,
    secret: &str,
) -> Result<(Arc<AuthService>, Arc<SqliteItemStore>)> {
    let users = Arc::new(
        SqliteUserStore::new(&config.db_path)
            .with_context(|| format!("Failed to open user database {}", config.db_path))?,
    );
    let items = Arc::new(
        SqliteItemStore::new(&config.db_path)
            .with_context(|| format!("Failed to open item database {}", config.db_path))?,
    );
    let blacklist = Arc::new(
        SqliteTokenBlacklist::new(&config.token_db_path).with_context(|| {
            format!("Failed to open token database {}", config.token_db_path)
        })?,
    );
    info!(
        "Databases ready: {} (users, items), {} (token blacklist)",
        config.db_path, config.token_db_path
    );

    let jwt = Arc::new(JwtHandler::new(secret));
    Ok((Arc::new(AuthService::new(users, blacklist, jwt)), items))
}

fn migrate(config: &Config) -> Result<()> {
    SqliteUserStore::new(&config.db_path).context("users schema")?;
    SqliteItemStore::new(&config.db_path).context("items schema")?;
    SqliteTokenBlacklist::new(&config.token_db_path).context("blacklist schema")?;
    info!("Migrated {} and {}", config.db_path, config.token_db_path);
    Ok(())
}

fn purge_tokens(config: &Config) -> Result<()> {
    use fleamarket_backend::auth::TokenBlacklist;

    let blacklist = SqliteTokenBlacklist::new(&config.token_db_path)
        .with_context(|| format!("Failed to open token database {}", config.token_db_path))?;
    let purged = blacklist
        .purge_expired(chrono::Utc::now().timestamp())
        .context("Blacklist purge failed")?;
    info!("Purged {} expired blacklist entries", purged);
    Ok(())
}

/// Periodically drop blacklist entries for tokens that have expired anyway.
async fn blacklist_purge_polling(auth: Arc<AuthService>, every: std::time::Duration) {
    let mut ticker = interval(every);
    loop {
        ticker.tick().await;
        if let Err(e) = auth.purge_expired_tokens() {
            warn!("Blacklist purge failed: {}", e);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => warn!("Received SIGTERM, initiating graceful shutdown"),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "fleamarket_backend=debug,fleamarket=debug,tower_http=debug".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Also the crate's own .env when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
