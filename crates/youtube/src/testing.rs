//! Scripted [`StatsClient`] for tests that must not reach YouTube.

use crate::{FetchError, StatsClient};
use async_trait::async_trait;
use chanwatch_core::StatsRecord;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Scripted {
    Found(StatsRecord),
    Failing(u16),
}

/// Answers from a fixed table. Unknown ids are reported as not found.
#[derive(Debug, Default)]
pub struct StaticStats {
    responses: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl StaticStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_channel(&self, record: StatsRecord) {
        self.responses
            .lock()
            .await
            .insert(record.channel_id.clone(), Scripted::Found(record));
    }

    /// Make every fetch of `channel_id` fail with the given HTTP status.
    pub async fn fail_channel(&self, channel_id: &str, status: u16) {
        self.responses
            .lock()
            .await
            .insert(channel_id.to_string(), Scripted::Failing(status));
    }

    /// Ids passed to `fetch`, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl StatsClient for StaticStats {
    async fn fetch(&self, channel_id: &str) -> Result<Option<StatsRecord>, FetchError> {
        self.calls.lock().await.push(channel_id.to_string());
        match self.responses.lock().await.get(channel_id).cloned() {
            Some(Scripted::Found(record)) => Ok(Some(record)),
            Some(Scripted::Failing(status)) => Err(FetchError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
            None => Ok(None),
        }
    }
}
