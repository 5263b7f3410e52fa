//! Chit-fund server binary.
//!
//! Connects to SurrealDB, applies pending migrations, wires the
//! authentication, profile, lifecycle and ledger services, and keeps
//! expired refresh tokens and one-time codes swept until shutdown.
//!
//! # Usage
//!
//! ```bash
//! chitfund-server \
//!     --jwt-private-key keys/private.pem \
//!     --jwt-public-key keys/public.pem
//!
//! CHITFUND_DB_URL=db:8000 CHITFUND_LOG_FORMAT=text chitfund-server ...
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chitfund_db::{DbError, DbManager};
use chitfund_server::{Cli, LogFormat, Services};
use clap::Parser;
use surrealdb::engine::remote::ws::Client;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Startup failures of the server binary.
#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error("failed to read {}: {source}", path.display())]
    Key {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("database setup failed: {0}")]
    Database(#[from] DbError),

    #[error("failed to listen for shutdown signal: {0}")]
    Signal(std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let cli = Cli::parse();
    init_logging(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting chitfund server");

    if let Err(e) = run(cli).await {
        error!(error = %e, "Server failed");
        return Err(e);
    }

    info!("Chitfund server stopped");
    Ok(())
}

fn init_logging(cli: &Cli) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_filter));

    match cli.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init(),
    }
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    let private_key_pem = read_key(&cli.jwt_private_key)?;
    let public_key_pem = read_key(&cli.jwt_public_key)?;
    let auth_config = cli.auth_config(private_key_pem, public_key_pem);

    let manager = DbManager::connect_and_migrate(&cli.db_config()).await?;
    let services = Arc::new(Services::new(manager.client().clone(), auth_config));

    info!(
        issuer = %services.auth.config().jwt_issuer,
        audience = %services.auth.config().jwt_audience,
        "Chitfund services ready"
    );

    let sweeper = tokio::spawn(sweep_expired(
        Arc::clone(&services),
        Duration::from_secs(cli.cleanup_interval_secs.max(1)),
    ));

    let shutdown = tokio::signal::ctrl_c().await;
    sweeper.abort();
    info!("Shutdown signal received");
    shutdown.map_err(ServerError::Signal)
}

fn read_key(path: &Path) -> Result<String, ServerError> {
    std::fs::read_to_string(path).map_err(|source| ServerError::Key {
        path: path.to_path_buf(),
        source,
    })
}

/// Periodically drop expired refresh tokens and one-time codes.
async fn sweep_expired(services: Arc<Services<Client>>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;

        match services.sweep_expired(chrono::Utc::now()).await {
            Ok(sweep) if sweep.refresh_tokens > 0 || sweep.one_time_codes > 0 => info!(
                refresh_tokens = sweep.refresh_tokens,
                one_time_codes = sweep.one_time_codes,
                "Removed expired credentials"
            ),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Expiry sweep failed"),
        }
    }
}
