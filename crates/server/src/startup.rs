use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use configs::{AppConfig, ArtifactBackend};
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use service::artifacts::{self, ArtifactStore};
use service::ProvisioningService;

use crate::errors::StartupError;
use crate::routes::{self, auth};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// `config.toml` when present, otherwise environment variables only.
fn load_config() -> Result<AppConfig, StartupError> {
    match AppConfig::load_and_validate() {
        Ok(cfg) => Ok(cfg),
        Err(file_err) => {
            debug!(error = %file_err, "config file unusable, falling back to environment");
            AppConfig::from_env().map_err(|e| StartupError::InvalidConfig(e.to_string()))
        }
    }
}

/// Connect, migrate and assemble everything the handlers share.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<(auth::ServerState, Arc<dyn ArtifactStore>)> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    models::db::migrate(&db).await?;

    if cfg.artifacts.backend == ArtifactBackend::Dir {
        common::env::ensure_private_dir(&cfg.artifacts.dir).await?;
    }
    let store = artifacts::from_config(&cfg.artifacts);

    let state = auth::ServerState {
        db: db.clone(),
        auth: auth::ServerAuthConfig { jwt_secret: cfg.auth.jwt_secret.clone() },
        provisioning: ProvisioningService::new(db, Arc::clone(&store)),
    };
    Ok((state, store))
}

/// Periodically drop spreadsheets nobody downloaded.
fn spawn_artifact_purge(store: Arc<dyn ArtifactStore>, ttl: Duration) {
    let period = (ttl / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(n) => info!(removed = n, "expired artifacts purged"),
                Err(e) => warn!(error = %e, "artifact purge failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();

    let cfg = load_config()?;
    let (state, store) = build_state(&cfg).await?;
    spawn_artifact_purge(store, Duration::from_secs(cfg.artifacts.ttl_secs));

    let app: Router = routes::build_router(state, build_cors());

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, backend = ?cfg.artifacts.backend, "starting admin server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
