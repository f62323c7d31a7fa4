pub mod models;
pub mod queries;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use store::{ChannelStore, ListQuery, PgStore, RefreshCommit, StoreError, StoreResult};
