//! Plugin hook surface.
//!
//! [`RowSource`] is the capability set a source plugin implements; the
//! fixed lifecycle driver owns the call sequence and the bookkeeping, so
//! plugin code cannot skip either. [`SourceTaskContext`] is handed to the
//! plugin at start: it carries the stop signal a blocked poll must honor
//! and read access to host-committed offsets.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::ConnectorError;
use crate::record::{SourceRecord, WireRecord};
use crate::setting::TaskSetting;

/// Read access to offsets the host runtime has committed for this task.
pub trait OffsetStore: Send + Sync {
    /// Returns the last committed offset for an upstream partition, if any.
    fn offset(&self, source_partition: &HashMap<String, String>)
        -> Option<HashMap<String, String>>;
}

/// The task's stop signal.
///
/// `stop()` flips it exactly once; a plugin poll loop that may block on
/// upstream I/O selects on [`StopSignal::stopped`] so the task can exit
/// promptly.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub(crate) fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// Returns `true` once stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once stop has been requested.
    ///
    /// Also resolves if the driver side is gone, which only happens after
    /// the task was dropped.
    pub async fn stopped(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Runtime context handed to the plugin at start.
#[derive(Clone)]
pub struct SourceTaskContext {
    stop: StopSignal,
    offsets: Option<Arc<dyn OffsetStore>>,
}

impl SourceTaskContext {
    pub(crate) fn new(stop_rx: watch::Receiver<bool>, offsets: Option<Arc<dyn OffsetStore>>) -> Self {
        Self {
            stop: StopSignal::new(stop_rx),
            offsets,
        }
    }

    /// Returns a handle on the task's stop signal.
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Looks up the last committed offset for an upstream partition.
    ///
    /// Returns `None` when the host provides no offset store or nothing
    /// was committed yet.
    #[must_use]
    pub fn offset(
        &self,
        source_partition: &HashMap<String, String>,
    ) -> Option<HashMap<String, String>> {
        self.offsets.as_ref()?.offset(source_partition)
    }
}

impl std::fmt::Debug for SourceTaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceTaskContext")
            .field("stopped", &self.stop.is_stopped())
            .field("has_offset_store", &self.offsets.is_some())
            .finish()
    }
}

/// Source-specific plugin behavior behind the fixed lifecycle contract.
///
/// Only [`on_start`](Self::on_start) and [`on_poll`](Self::on_poll) are
/// required; the commit and stop hooks default to no-ops, matching plugins
/// that let the host record offsets automatically.
#[async_trait]
pub trait RowSource: Send {
    /// One-time plugin setup. Runs after configuration parsing and counter
    /// registration, with the parsed, immutable settings.
    async fn on_start(
        &mut self,
        ctx: &SourceTaskContext,
        settings: &TaskSetting,
    ) -> Result<(), ConnectorError>;

    /// Produces the next batch of records. May block awaiting upstream
    /// data; implementations must honor the context's [`StopSignal`] so a
    /// blocked poll exits promptly on stop.
    async fn on_poll(&mut self) -> Result<Vec<SourceRecord>, ConnectorError>;

    /// Flushes any plugin-internal offset bookkeeping. Default no-op.
    async fn on_commit(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }

    /// Acknowledges one record delivered by the host's producer.
    /// Default no-op.
    async fn on_commit_record(&mut self, _record: &WireRecord) -> Result<(), ConnectorError> {
        Ok(())
    }

    /// Plugin teardown. Counters are released whether or not this fails.
    /// Default no-op.
    async fn on_stop(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }

    /// Plugin version string. Defaults to the SDK build version.
    fn version(&self) -> String {
        crate::VERSION.to_string()
    }
}
