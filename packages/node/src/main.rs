//! `siteframe-server`: Siteframe endpoint server.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory server on the default port:
//! SITEFRAME_TOKEN_SECRET=dev siteframe-server
//!
//! # Persistent SQLite server with a bootstrap admin account:
//! SITEFRAME_TOKEN_SECRET=... SITEFRAME_DB=./sites.db \
//!     SITEFRAME_ADMIN_EMAIL=admin@example.com siteframe-server
//! ```
//!
//! # Environment variables
//!
//! See [`siteframe_server::ServerConfig`] for the full list.

use std::process::ExitCode;
use std::sync::Arc;

use siteframe_api::UserRole;
use siteframe_server::{
    build_server, MemoryStorage, ServerConfig, ServerError, Services, SqliteStorage, Storage,
    StorageError, TokenCodec,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siteframe_server=info,tower_http=debug".into()),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::from_env()?;

    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => {
            tracing::info!("storage: SQLite at {path}");
            Arc::new(SqliteStorage::open(path).map_err(|e| {
                StorageError::Internal(format!("failed to open SQLite database at {path}: {e}"))
            })?)
        }
        None => {
            tracing::info!("storage: in-memory (data will not survive restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    let services = Services::new(storage, TokenCodec::new(config.token_secret.as_bytes()));

    if let Some(email) = &config.admin_email {
        let admin = services
            .users
            .ensure(email, None, UserRole::Admin)
            .await
            .map_err(|e| ServerError::Bootstrap(format!("admin account: {e}")))?;
        let token = services
            .tokens
            .encode(&admin.email, Some(&admin.user_id))
            .map_err(|e| ServerError::Bootstrap(format!("admin token: {e}")))?;
        tracing::info!(email = %admin.email, "admin account ready");
        println!("admin token: {token}");
    }

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    build_server(&config, &services, shutdown)?.serve().await
}
