//! Where is each bus now, and where has it been.
//!
//! Read-only views over an append-only log of vehicle position reports:
//! the current fleet, per-route rosters, single-vehicle lookup and bounded
//! per-vehicle history, plus the axum API that serves them.

pub mod api;
pub mod config;
pub mod dto;
pub mod error;
pub mod freshness;
pub mod log;
pub mod model;
pub mod resolver;
pub mod seed;
pub mod service;

pub use error::QueryError;
pub use freshness::FreshnessPolicy;
pub use log::{LogSnapshot, LogStats, MemoryLog, PositionLog, StorageError};
pub use model::{NewPosition, PositionRecord, RecordId};
pub use service::{HistoryBounds, RouteSummary, TransitService};
