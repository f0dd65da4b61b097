//! Results engine for a weekly NFL survivor pool: scoreboard ingestion, pick
//! resolution with entry elimination, and lock-gated snapshot views.

pub mod blob;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod results;
pub mod store;
pub mod sync;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use coordinator::{Coordinator, RunReport, Stage};
pub use error::{PoolError, PoolResult};
