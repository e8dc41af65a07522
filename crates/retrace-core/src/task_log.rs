//! Task log sink.
//!
//! Hook scripts report back to operators exclusively through the task log.
//! The sink has three severities and accepts free text; concurrent scripts
//! write to the same sink, so consumers must expect interleaved lines.
//!
//! Two implementations are provided:
//! - [`TracingTaskLog`] forwards to `tracing` under the `retrace::task` target
//! - [`MemoryTaskLog`] keeps entries in memory for inspection

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::ids::TaskId;

/// Severity of a task log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    /// Diagnostic detail.
    Debug,
    /// Normal output, including script stdout.
    Info,
    /// Problems, including script stderr.
    Error,
}

/// Destination for task-level log messages.
pub trait TaskLog: Send + Sync {
    /// Record a debug message.
    fn debug(&self, message: &str);

    /// Record an informational message.
    fn info(&self, message: &str);

    /// Record an error message.
    fn error(&self, message: &str);

    /// Record a message at the given severity.
    fn log(&self, severity: LogSeverity, message: &str) {
        match severity {
            LogSeverity::Debug => self.debug(message),
            LogSeverity::Info => self.info(message),
            LogSeverity::Error => self.error(message),
        }
    }
}

/// Task log that emits `tracing` events on the `retrace::task` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTaskLog {
    task_id: Option<TaskId>,
}

impl TracingTaskLog {
    /// Create a sink that is not tied to a task.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that tags every event with a task id.
    #[must_use]
    pub fn for_task(task_id: TaskId) -> Self {
        Self {
            task_id: Some(task_id),
        }
    }
}

impl TaskLog for TracingTaskLog {
    fn debug(&self, message: &str) {
        match self.task_id {
            Some(id) => tracing::debug!(target: "retrace::task", task_id = %id, "{message}"),
            None => tracing::debug!(target: "retrace::task", "{message}"),
        }
    }

    fn info(&self, message: &str) {
        match self.task_id {
            Some(id) => tracing::info!(target: "retrace::task", task_id = %id, "{message}"),
            None => tracing::info!(target: "retrace::task", "{message}"),
        }
    }

    fn error(&self, message: &str) {
        match self.task_id {
            Some(id) => tracing::error!(target: "retrace::task", task_id = %id, "{message}"),
            None => tracing::error!(target: "retrace::task", "{message}"),
        }
    }
}

/// One recorded line of a [`MemoryTaskLog`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Severity the line was logged at.
    pub severity: LogSeverity,
    /// The message text.
    pub message: String,
}

/// Thread-safe in-memory task log.
///
/// Cloning shares the underlying buffer.
#[derive(Clone, Debug, Default)]
pub struct MemoryTaskLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryTaskLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries, in arrival order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Messages recorded at one severity.
    pub fn messages(&self, severity: LogSeverity) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.severity == severity)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Whether any entry at `severity` contains `needle`.
    pub fn contains(&self, severity: LogSeverity, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.severity == severity && e.message.contains(needle))
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop all recorded entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn push(&self, severity: LogSeverity, message: &str) {
        self.entries.lock().push(LogEntry {
            severity,
            message: message.to_owned(),
        });
    }
}

impl TaskLog for MemoryTaskLog {
    fn debug(&self, message: &str) {
        self.push(LogSeverity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.push(LogSeverity::Info, message);
    }

    fn error(&self, message: &str) {
        self.push(LogSeverity::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::capture_logs;
    use tracing::Level;

    #[test]
    fn test_memory_log_records_in_order() {
        let log = MemoryTaskLog::new();
        log.debug("one");
        log.info("two");
        log.error("three");

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].severity, LogSeverity::Debug);
        assert_eq!(entries[1].message, "two");
        assert_eq!(entries[2].severity, LogSeverity::Error);
    }

    #[test]
    fn test_memory_log_filters_by_severity() {
        let log = MemoryTaskLog::new();
        log.info("stdout line");
        log.error("stderr line");
        log.info("more stdout");

        assert_eq!(log.messages(LogSeverity::Info), vec!["stdout line", "more stdout"]);
        assert!(log.contains(LogSeverity::Error, "stderr"));
        assert!(!log.contains(LogSeverity::Info, "stderr"));
    }

    #[test]
    fn test_memory_log_clones_share_buffer() {
        let log = MemoryTaskLog::new();
        let other = log.clone();
        other.info("shared");
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn test_log_dispatches_on_severity() {
        let log = MemoryTaskLog::new();
        log.log(LogSeverity::Error, "bad");
        assert!(log.contains(LogSeverity::Error, "bad"));
    }

    #[test]
    fn test_tracing_log_emits_on_task_target() {
        let (logs, _guard) = capture_logs();
        let log = TracingTaskLog::for_task(TaskId::new(12));
        log.info("hello from hook");
        log.error("hook stderr");

        assert!(logs.has_event(Level::INFO, "hello from hook"));
        assert!(logs.has_event(Level::ERROR, "hook stderr"));
        let events = logs.for_target("retrace::task");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].field("task_id"), Some("12"));
    }

    #[test]
    fn test_tracing_log_without_task() {
        let (logs, _guard) = capture_logs();
        TracingTaskLog::new().debug("plain");
        assert!(logs.has_event(Level::DEBUG, "plain"));
    }
}
