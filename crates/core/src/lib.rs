pub mod config;
pub mod types;

pub use config::{ConfigError, Settings};
pub use types::{SortBy, StatsRecord};
