use anyhow::Context;
use chanwatch_core::StatsRecord;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::WorkerState;

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub tracked: usize,
    pub updated: u64,
    pub failed: usize,
    pub snapshots: u64,
}

/// Fetch fresh stats for every tracked channel and append a history row per
/// channel.
///
/// A channel whose fetch fails or comes back empty keeps its stored values and
/// is still snapshotted. Only store failures abort the cycle.
pub async fn refresh_all(state: &WorkerState) -> anyhow::Result<RefreshReport> {
    let tracked = state
        .store
        .tracked_channel_ids()
        .await
        .context("loading tracked channels")?;

    let mut updates: Vec<StatsRecord> = Vec::with_capacity(tracked.len());
    let mut failed = 0;

    for channel_id in &tracked {
        match state.stats.fetch(channel_id).await {
            Ok(Some(stats)) => updates.push(stats),
            Ok(None) => {
                failed += 1;
                warn!(channel_id = %channel_id, "channel no longer found upstream, keeping stored stats");
            }
            Err(err) => {
                failed += 1;
                warn!(channel_id = %channel_id, error = %err, "failed to fetch channel stats");
            }
        }
    }

    let commit = state
        .store
        .apply_refresh(&updates, &tracked)
        .await
        .context("committing refresh batch")?;

    Ok(RefreshReport {
        tracked: tracked.len(),
        updated: commit.updated,
        failed,
        snapshots: commit.snapshots,
    })
}

/// Run one cycle and swallow any error. This is what the scheduler calls.
pub async fn run_cycle(state: &WorkerState) -> Option<RefreshReport> {
    info!("starting scheduled channel refresh");
    let start = Instant::now();

    match refresh_all(state).await {
        Ok(report) => {
            info!(
                tracked = report.tracked,
                updated = report.updated,
                failed = report.failed,
                snapshots = report.snapshots,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "channel refresh finished"
            );
            Some(report)
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "channel refresh failed");
            None
        }
    }
}
