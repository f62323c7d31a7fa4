use chanwatch_core::Settings;
use chanwatch_db::PgStore;
use chanwatch_worker::{Scheduler, WorkerState};
use chanwatch_youtube::YoutubeClient;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

mod error;
mod middleware;
mod routes;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    // A missing YOUTUBE_API_KEY stops the process here.
    let settings = Settings::from_env()?;

    let store = PgStore::connect(&settings.database_url, settings.db_max_connections).await?;
    store.migrate().await?;

    let client = YoutubeClient::new(
        &settings.youtube_api_key,
        &settings.youtube_api_base_url,
        settings.http_timeout(),
    )?;

    let state = AppState {
        store: Arc::new(store.clone()),
        stats: Arc::new(client),
    };

    let scheduler = if settings.scheduler_enabled {
        Some(Scheduler::spawn(
            WorkerState {
                store: state.store.clone(),
                stats: state.stats.clone(),
            },
            settings.refresh_interval(),
            settings.refresh_on_start,
        ))
    } else {
        info!("in-process refresh scheduler disabled");
        None
    };

    let app = routes::app(state);
    let addr = settings.bind_addr();

    info!(%addr, env = %settings.chanwatch_env, "starting api");

    let served = async {
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
    .await;

    // The timer must be gone before the pool closes.
    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }
    store.close().await;
    info!("api stopped");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
