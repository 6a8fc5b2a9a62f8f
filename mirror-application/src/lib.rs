// Mirror Application Layer

pub mod commands;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod queries;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AppError, SyncError};
pub use metrics::SyncMetrics;
pub use state::SyncState;
