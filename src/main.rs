//! Typerace server entrypoint wiring REST, WebSocket, SSE and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use typerace::{
    config::AppConfig,
    dao::{
        race_store::{RaceStore, memory::MemoryRaceStore},
        storage::StorageError,
    },
    routes,
    services::{persistence, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());

    tokio::spawn(persistence::run(app_state.clone()));
    spawn_storage(app_state.clone()).await;
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the storage backend from `STORE_BACKEND` (`memory`, `mongodb` or
/// `couchdb`) and start supervising it.
async fn spawn_storage(state: SharedState) {
    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".into());
    match backend.as_str() {
        #[cfg(feature = "mongo-store")]
        "mongodb" => {
            use typerace::dao::race_store::mongodb::{MongoConfig, MongoRaceStore};

            info!("using MongoDB storage");
            tokio::spawn(storage_supervisor::run(state, || async {
                let config = MongoConfig::from_env().await?;
                let store = MongoRaceStore::connect(config).await?;
                Ok::<_, StorageError>(Arc::new(store) as Arc<dyn RaceStore>)
            }));
        }
        #[cfg(feature = "couch-store")]
        "couchdb" => {
            use typerace::dao::race_store::couchdb::{CouchConfig, CouchRaceStore};

            info!("using CouchDB storage");
            tokio::spawn(storage_supervisor::run(state, || async {
                let config = CouchConfig::from_env()?;
                let store = CouchRaceStore::connect(config).await?;
                Ok::<_, StorageError>(Arc::new(store) as Arc<dyn RaceStore>)
            }));
        }
        other => {
            if other != "memory" {
                warn!(backend = other, "unknown or disabled storage backend; using memory");
            }
            state
                .install_race_store(Arc::new(MemoryRaceStore::new()))
                .await;
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
