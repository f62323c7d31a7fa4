use chanwatch_db::ChannelStore;
use chanwatch_youtube::StatsClient;
use std::sync::Arc;

pub mod jobs;
pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerHandle};

#[derive(Clone)]
pub struct WorkerState {
    pub store: Arc<dyn ChannelStore>,
    pub stats: Arc<dyn StatsClient>,
}
