//! # Rowlink Connect
//!
//! The connector task SDK: the record-production core of a pluggable
//! data-ingestion task.
//!
//! A [`SourceTask`] wraps a plugin [`RowSource`] and repeatedly pulls
//! batches of [`SourceRecord`]s from it, filters and validates them against
//! the task's declared column schema and [`CheckRule`], converts accepted
//! records into host-consumable [`WireRecord`]s, and meters throughput in
//! four per-task [`Counter`]s. The host runtime owns scheduling: it calls
//! `start` once, `poll` in a loop, `commit`/`commit_record` as delivery
//! progresses, and `stop` once at the end.
//!
//! # Example
//!
//! ```no_run
//! use rowlink_connect::{CounterRegistry, RowSource, SourceTask, TaskConfig};
//! # async fn run(source: impl RowSource) -> Result<(), rowlink_connect::ConnectorError> {
//! let mut config = TaskConfig::new();
//! config.set("name", "orders-ingest");
//! config.set("check.rule", "ENFORCED");
//!
//! let mut task = SourceTask::new(source, CounterRegistry::new());
//! task.start(&config).await?;
//! while let Some(records) = task.poll().await? {
//!     // hand records to the host producer
//!     let _ = records;
//! }
//! task.stop().await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod record;
pub mod setting;
pub mod source;
pub mod task;

pub use config::TaskConfig;
pub use error::{ConnectorError, ConnectorResult};
pub use metrics::{Counter, CounterRegistry, TaskMetrics};
pub use record::{SourceRecord, WireRecord};
pub use setting::{CheckRule, FilterErrorPolicy, TaskSetting};
pub use source::{OffsetStore, RowSource, SourceTaskContext, StopSignal};
pub use task::{SourceTask, TaskState};

/// SDK build version, the default reported by tasks that do not override
/// [`RowSource::version`].
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
