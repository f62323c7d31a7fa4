use chanwatch_db::ChannelStore;
use chanwatch_youtube::StatsClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChannelStore>,
    pub stats: Arc<dyn StatsClient>,
}

/// Per-request id set by the request id middleware.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);
