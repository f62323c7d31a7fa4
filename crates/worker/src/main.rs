use anyhow::Result;
use chanwatch_core::config::MAX_REFRESH_INTERVAL_SECS;
use chanwatch_core::Settings;
use chanwatch_db::PgStore;
use chanwatch_worker::{jobs, Scheduler, WorkerState};
use chanwatch_youtube::YoutubeClient;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "chanwatch-worker")]
#[command(
    about = "Refreshes tracked channel statistics from YouTube",
    long_about = "Refreshes tracked channel statistics from YouTube.\n\n\
                  chanwatch-api already runs this timer in-process. Only run the worker \
                  next to an api started with CHANWATCH_SCHEDULER_ENABLED=false, otherwise \
                  every cycle writes history twice.",
    version
)]
struct Args {
    /// Run a single refresh cycle and exit instead of staying on the timer.
    #[arg(long)]
    once: bool,
    /// Override the refresh period in seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_REFRESH_INTERVAL_SECS))]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let args = Args::parse();
    let settings = Settings::from_env()?;

    let store = PgStore::connect(&settings.database_url, settings.db_max_connections).await?;
    store.migrate().await?;

    let client = YoutubeClient::new(
        &settings.youtube_api_key,
        &settings.youtube_api_base_url,
        settings.http_timeout(),
    )?;

    let state = WorkerState {
        store: Arc::new(store.clone()),
        stats: Arc::new(client),
    };

    if args.once {
        let report = jobs::refresh::refresh_all(&state).await?;
        info!(?report, "single refresh cycle finished");
        store.close().await;
        return Ok(());
    }

    let period = args
        .interval_secs
        .map(std::time::Duration::from_secs)
        .unwrap_or_else(|| settings.refresh_interval());

    info!(period_secs = period.as_secs(), "worker starting");
    let scheduler = Scheduler::spawn(state, period, settings.refresh_on_start);

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    scheduler.shutdown().await;
    store.close().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_runs_scheduler() {
        let args = Args::try_parse_from(["chanwatch-worker"]).unwrap();
        assert!(!args.once);
        assert_eq!(args.interval_secs, None);
    }

    #[test]
    fn test_args_once() {
        let args = Args::try_parse_from(["chanwatch-worker", "--once"]).unwrap();
        assert!(args.once);
    }

    #[test]
    fn test_args_interval_override() {
        let args =
            Args::try_parse_from(["chanwatch-worker", "--interval-secs", "3600"]).unwrap();
        assert_eq!(args.interval_secs, Some(3600));
    }

    #[test]
    fn test_args_rejects_non_numeric_interval() {
        assert!(Args::try_parse_from(["chanwatch-worker", "--interval-secs", "soon"]).is_err());
    }

    #[test]
    fn test_args_rejects_out_of_range_interval() {
        assert!(Args::try_parse_from(["chanwatch-worker", "--interval-secs", "0"]).is_err());

        let huge = u64::MAX.to_string();
        assert!(Args::try_parse_from(["chanwatch-worker", "--interval-secs", huge.as_str()]).is_err());
    }
}
