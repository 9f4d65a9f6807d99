//! Source task lifecycle driver.
//!
//! [`SourceTask`] wraps a plugin [`RowSource`] and owns the fixed
//! poll-filter-convert-meter pipeline plus the lifecycle state machine.
//! The host runtime drives it: `start` once, `poll` in a loop, `commit` /
//! `commit_record` as delivery progresses, `stop` once at the end.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::TaskConfig;
use crate::error::ConnectorError;
use crate::filter;
use crate::metrics::{CounterRegistry, TaskMetrics};
use crate::record::WireRecord;
use crate::setting::{FilterErrorPolicy, TaskSetting};
use crate::source::{OffsetStore, RowSource, SourceTaskContext};

/// Lifecycle state of a task. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Constructed, not yet started.
    Created,
    /// Started; poll and commit calls are valid.
    Running,
    /// Stopped; no further calls are valid.
    Stopped,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "Created",
            Self::Running => "Running",
            Self::Stopped => "Stopped",
        };
        f.write_str(s)
    }
}

/// The fixed lifecycle around a plugin source.
///
/// The driver owns the call sequence: configuration parsing and counter
/// registration happen before the plugin's start hook, filtering and
/// metering happen on every poll, and counter release runs on every stop
/// path. Plugin code cannot skip any of it.
pub struct SourceTask<S: RowSource> {
    source: S,
    registry: CounterRegistry,
    offsets: Option<Arc<dyn OffsetStore>>,
    settings: Option<TaskSetting>,
    metrics: TaskMetrics,
    state: TaskState,
    stop_tx: Option<watch::Sender<bool>>,
}

impl<S: RowSource> SourceTask<S> {
    /// Creates a task around `source`, registering counters in `registry`.
    #[must_use]
    pub fn new(source: S, registry: CounterRegistry) -> Self {
        Self {
            source,
            registry,
            offsets: None,
            settings: None,
            metrics: TaskMetrics::disabled(),
            state: TaskState::Created,
            stop_tx: None,
        }
    }

    /// Attaches the host's offset store, readable by the plugin at start.
    #[must_use]
    pub fn with_offset_store(mut self, offsets: Arc<dyn OffsetStore>) -> Self {
        self.offsets = Some(offsets);
        self
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Returns the parsed settings once the task has started.
    #[must_use]
    pub fn settings(&self) -> Option<&TaskSetting> {
        self.settings.as_ref()
    }

    /// Returns the task's counters.
    #[must_use]
    pub fn metrics(&self) -> &TaskMetrics {
        &self.metrics
    }

    fn ensure_state(&self, expected: TaskState) -> Result<(), ConnectorError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ConnectorError::InvalidState {
                expected: expected.to_string(),
                actual: self.state.to_string(),
            })
        }
    }

    /// Starts the task.
    ///
    /// Parses the configuration first, so a malformed one fails before any
    /// counter exists; registers the four task counters (unwound again if
    /// the plugin's start hook fails); then transitions to `Running`.
    ///
    /// # Errors
    ///
    /// Configuration, counter-registration, and plugin start-hook errors
    /// propagate; the task stays un-started and leaks nothing.
    pub async fn start(&mut self, config: &TaskConfig) -> Result<(), ConnectorError> {
        self.ensure_state(TaskState::Created)?;

        let settings = TaskSetting::from_config(config)?;

        let metrics = if settings.metrics_enabled() {
            TaskMetrics::register(&self.registry, settings.name())?
        } else {
            TaskMetrics::disabled()
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let ctx = SourceTaskContext::new(stop_rx, self.offsets.clone());

        if let Err(err) = self.source.on_start(&ctx, &settings).await {
            warn!(task = %settings.name(), error = %err, "plugin start hook failed");
            metrics.release();
            return Err(err);
        }

        info!(
            task = %settings.name(),
            check_rule = %settings.check_rule(),
            columns = settings.columns().len(),
            metrics = settings.metrics_enabled(),
            "source task started"
        );
        self.settings = Some(settings);
        self.metrics = metrics;
        self.stop_tx = Some(stop_tx);
        self.state = TaskState::Running;
        Ok(())
    }

    /// Polls the plugin for one batch and runs it through the pipeline.
    ///
    /// Returns `None` when the upstream produced nothing this round (the
    /// no-data sentinel) and `Some(records)` otherwise; `Some` with an
    /// empty vector means the upstream produced records but the filter
    /// rejected them all. Output order is input order.
    ///
    /// # Errors
    ///
    /// Plugin poll errors propagate unchanged. Conversion failures abort
    /// the batch only under [`FilterErrorPolicy::Fail`].
    pub async fn poll(&mut self) -> Result<Option<Vec<WireRecord>>, ConnectorError> {
        self.ensure_state(TaskState::Running)?;

        let batch = self.source.on_poll().await?;
        if batch.is_empty() {
            debug!("poll produced no data");
            return Ok(None);
        }

        let settings = self.settings.as_ref().ok_or_else(|| ConnectorError::InvalidState {
            expected: TaskState::Running.to_string(),
            actual: "Running without settings".to_string(),
        })?;
        let rejected_rows = self.metrics.rejected_rows().map(Arc::as_ref);
        let rejected_bytes = self.metrics.rejected_bytes().map(Arc::as_ref);

        let input_len = batch.len();
        let mut out = Vec::with_capacity(input_len);
        let mut out_bytes: u64 = 0;
        for record in batch {
            let accepted = filter::matches(
                settings.check_rule(),
                &record.row,
                settings.columns(),
                false,
                rejected_rows,
                rejected_bytes,
            );
            if !accepted {
                continue;
            }
            match record.into_wire() {
                Ok(wire) => {
                    out_bytes += wire.byte_size();
                    out.push(wire);
                }
                Err(err) => match settings.filter_error_policy() {
                    FilterErrorPolicy::Fail => return Err(err),
                    FilterErrorPolicy::Reject => {
                        warn!(error = %err, "record conversion failed; rejecting record");
                        if let Some(c) = rejected_rows {
                            c.add(1);
                        }
                        // Raw size is gone with the record; meter zero bytes
                        // rather than invent a wire size that never existed.
                    }
                },
            }
        }

        // One batched increment per counter, after the whole batch.
        self.metrics.record_accepted(out.len() as u64, out_bytes);
        debug!(
            input = input_len,
            accepted = out.len(),
            rejected = input_len - out.len(),
            bytes = out_bytes,
            "poll batch processed"
        );
        Ok(Some(out))
    }

    /// Flushes plugin-internal offset bookkeeping.
    ///
    /// # Errors
    ///
    /// Invalid-state and plugin commit-hook errors propagate.
    pub async fn commit(&mut self) -> Result<(), ConnectorError> {
        self.ensure_state(TaskState::Running)?;
        self.source.on_commit().await
    }

    /// Acknowledges one delivered record to the plugin.
    ///
    /// Hook failures are reported to the host, never swallowed, and do not
    /// alter pipeline state.
    ///
    /// # Errors
    ///
    /// Invalid-state and plugin commit-hook errors propagate.
    pub async fn commit_record(&mut self, record: &WireRecord) -> Result<(), ConnectorError> {
        self.ensure_state(TaskState::Running)?;
        if let Err(err) = self.source.on_commit_record(record).await {
            warn!(error = %err, topic = %record.topic, "record commit hook failed");
            return Err(err);
        }
        Ok(())
    }

    /// Stops the task.
    ///
    /// Signals the stop channel first (interrupting a blocked poll hook),
    /// runs the plugin's stop hook, and releases all four counters on every
    /// exit path. A stop-hook error is surfaced only after cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::StopError`] wrapping a failed stop hook,
    /// or an invalid-state error if the task is not running.
    pub async fn stop(&mut self) -> Result<(), ConnectorError> {
        self.ensure_state(TaskState::Running)?;

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }

        let hook_result = self.source.on_stop().await;

        // Scoped-resource discipline: counters go away on every stop path.
        self.metrics.release();
        self.state = TaskState::Stopped;

        match hook_result {
            Ok(()) => {
                info!("source task stopped");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "plugin stop hook failed; counters released");
                Err(ConnectorError::StopError(err.to_string()))
            }
        }
    }

    /// Returns the plugin's version string.
    #[must_use]
    pub fn version(&self) -> String {
        self.source.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::NAME_KEY;
    use async_trait::async_trait;

    struct IdleSource;

    #[async_trait]
    impl RowSource for IdleSource {
        async fn on_start(
            &mut self,
            _ctx: &SourceTaskContext,
            _settings: &TaskSetting,
        ) -> Result<(), ConnectorError> {
            Ok(())
        }

        async fn on_poll(&mut self) -> Result<Vec<crate::record::SourceRecord>, ConnectorError> {
            Ok(Vec::new())
        }
    }

    fn config() -> TaskConfig {
        let mut config = TaskConfig::new();
        config.set(NAME_KEY, "t1");
        config
    }

    #[tokio::test]
    async fn test_poll_before_start_is_invalid() {
        let mut task = SourceTask::new(IdleSource, CounterRegistry::new());
        let err = task.poll().await.unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_double_start_fails_loudly() {
        let mut task = SourceTask::new(IdleSource, CounterRegistry::new());
        task.start(&config()).await.unwrap();
        let err = task.start(&config()).await.unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidState { .. }));
        assert_eq!(task.state(), TaskState::Running);
    }

    #[tokio::test]
    async fn test_stop_is_terminal() {
        let mut task = SourceTask::new(IdleSource, CounterRegistry::new());
        task.start(&config()).await.unwrap();
        task.stop().await.unwrap();
        assert_eq!(task.state(), TaskState::Stopped);

        assert!(task.stop().await.is_err());
        assert!(task.poll().await.is_err());
        assert!(task.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_bad_config_allocates_nothing() {
        let registry = CounterRegistry::new();
        let mut task = SourceTask::new(IdleSource, registry.clone());
        let err = task.start(&TaskConfig::new()).await.unwrap_err();
        assert!(matches!(err, ConnectorError::MissingConfig(_)));
        assert_eq!(task.state(), TaskState::Created);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_version_defaults_to_build_version() {
        let task = SourceTask::new(IdleSource, CounterRegistry::new());
        assert_eq!(task.version(), crate::VERSION);
    }
}
