//! Process-wide refresh timer.
//!
//! The scheduler owns a single tokio task that runs
//! [`run_cycle`](crate::jobs::refresh::run_cycle) once per period. It shares
//! nothing with request handling except the store. Cycles never overlap: a
//! tick that comes due while a cycle is still running is delayed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::jobs::refresh::run_cycle;
use crate::WorkerState;

pub struct Scheduler;

impl Scheduler {
    /// Start the timer. With `run_immediately` the first cycle starts right
    /// away; otherwise it starts one `period` from now.
    ///
    /// `period` must be non-zero and fit on the tokio clock;
    /// [`Settings`](chanwatch_core::Settings) caps it at one year.
    pub fn spawn(state: WorkerState, period: Duration, run_immediately: bool) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let cycles = Arc::new(AtomicU64::new(0));
        let completed = cycles.clone();

        let first = if run_immediately {
            Instant::now()
        } else {
            Instant::now() + period
        };

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(period_secs = period.as_secs(), run_immediately, "refresh scheduler started");

            loop {
                tokio::select! {
                    biased;
                    // A dropped sender counts as shutdown too.
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        run_cycle(&state).await;
                        completed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }

            info!("refresh scheduler stopped");
        });

        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
            cycles,
        }
    }
}

pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    cycles: Arc<AtomicU64>,
}

impl SchedulerHandle {
    /// Number of cycles that have run to completion.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Stop the timer and wait for the task to exit. A cycle already in
    /// progress finishes first; no new cycle starts.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            warn!(error = %err, "refresh scheduler task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanwatch_core::config::DEFAULT_REFRESH_INTERVAL_SECS;
    use chanwatch_core::StatsRecord;
    use chanwatch_db::memory::MemoryStore;
    use chanwatch_db::ChannelStore;
    use chanwatch_youtube::testing::StaticStats;
    use chrono::{TimeZone, Utc};

    fn stats(channel_id: &str) -> StatsRecord {
        StatsRecord {
            channel_id: channel_id.to_string(),
            title: "X".to_string(),
            description: String::new(),
            published_at: Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap(),
            subscriber_count: 1,
            video_count: 1,
            view_count: 1,
        }
    }

    async fn wait_for_cycles(handle: &SchedulerHandle, at_least: u64) {
        time::timeout(Duration::from_secs(5), async {
            while handle.cycles() < at_least {
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("scheduler did not reach expected cycle count");
    }

    #[tokio::test]
    async fn test_runs_repeatedly_until_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(StaticStats::new());
        store.create_channel(&stats("UC1")).await.unwrap();
        remote.set_channel(stats("UC1")).await;

        let handle = Scheduler::spawn(
            WorkerState {
                store: store.clone(),
                stats: remote,
            },
            Duration::from_millis(20),
            true,
        );

        wait_for_cycles(&handle, 2).await;
        handle.shutdown().await;

        let rows = store.history_len("UC1").await;
        assert!(rows >= 3, "expected initial row plus two cycles, got {rows}");

        time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.history_len("UC1").await, rows, "no cycle may run after shutdown");
    }

    #[tokio::test]
    async fn test_first_cycle_waits_one_period() {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(StaticStats::new());
        store.create_channel(&stats("UC1")).await.unwrap();

        let handle = Scheduler::spawn(
            WorkerState {
                store: store.clone(),
                stats: remote.clone(),
            },
            Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            false,
        );

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.cycles(), 0);
        handle.shutdown().await;

        assert!(remote.calls().await.is_empty());
        assert_eq!(store.history_len("UC1").await, 1);
    }

    #[tokio::test]
    async fn test_store_outage_does_not_kill_scheduler() {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(StaticStats::new());
        store.create_channel(&stats("UC1")).await.unwrap();
        store.set_unavailable(true);

        let handle = Scheduler::spawn(
            WorkerState {
                store: store.clone(),
                stats: remote,
            },
            Duration::from_millis(20),
            true,
        );

        wait_for_cycles(&handle, 2).await;
        store.set_unavailable(false);
        let before = handle.cycles();
        wait_for_cycles(&handle, before + 1).await;
        handle.shutdown().await;

        assert!(store.history_len("UC1").await >= 2);
    }
}
