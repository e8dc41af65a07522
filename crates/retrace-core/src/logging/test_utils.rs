//! In-memory capture of `tracing` events for tests.
//!
//! [`capture_logs`] installs a thread-local subscriber. Async tests should run
//! on the current-thread runtime (the `#[tokio::test]` default) so that
//! spawned tasks report to the same subscriber.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// One recorded event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Event level.
    pub level: Level,
    /// Event target, e.g. `retrace::task`.
    pub target: String,
    /// Rendered message.
    pub message: String,
    /// Structured fields other than the message, rendered as text.
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    /// Rendered value of a structured field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Shared handle to the events recorded by [`capture_logs`].
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// Every event so far, in emission order.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// Whether an event at `level` has a message containing `needle`.
    pub fn has_event(&self, level: Level, needle: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    /// Whether any event has a message containing `needle`.
    pub fn has_message(&self, needle: &str) -> bool {
        self.events.lock().iter().any(|e| e.message.contains(needle))
    }

    /// Events whose target starts with `prefix`.
    pub fn for_target(&self, prefix: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.target.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Events at exactly `level`.
    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl fmt::Debug for CapturedLogs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedLogs")
            .field("events", &self.events.lock().len())
            .finish()
    }
}

#[derive(Default)]
struct EventFields {
    message: String,
    fields: BTreeMap<String, String>,
}

impl EventFields {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            let _ = self.fields.insert(field.name().to_owned(), value);
        }
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

struct CaptureLayer {
    logs: CapturedLogs,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventFields::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.logs.events.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_owned(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Record every event emitted on the current thread until the returned
/// guard is dropped.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let guard = tracing_subscriber::registry()
        .with(CaptureLayer { logs: logs.clone() })
        .with(LevelFilter::TRACE)
        .set_default();
    (logs, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_levels_and_messages() {
        let (logs, _guard) = capture_logs();
        tracing::debug!("scanning hook directory");
        tracing::error!("hook script failed");

        assert!(logs.has_event(Level::DEBUG, "scanning"));
        assert!(logs.has_event(Level::ERROR, "failed"));
        assert!(!logs.has_event(Level::INFO, "failed"));
        assert_eq!(logs.at_level(Level::ERROR).len(), 1);
    }

    #[test]
    fn test_filters_by_target_prefix() {
        let (logs, _guard) = capture_logs();
        tracing::info!(target: "retrace::task", "from a script");
        tracing::info!(target: "retrace_settings::loader", "loaded");

        let task = logs.for_target("retrace::task");
        assert_eq!(task.len(), 1);
        assert_eq!(task[0].message, "from a script");
    }

    #[test]
    fn test_structured_fields_rendered() {
        let (logs, _guard) = capture_logs();
        tracing::warn!(script = "10-notify", exit_code = 3, timeout_secs = 30_u64, "hook script failed");

        let event = &logs.events()[0];
        assert_eq!(event.field("script"), Some("10-notify"));
        assert_eq!(event.field("exit_code"), Some("3"));
        assert_eq!(event.field("timeout_secs"), Some("30"));
        assert_eq!(event.field("missing"), None);
    }

    #[test]
    fn test_clear_forgets_events() {
        let (logs, _guard) = capture_logs();
        tracing::info!("one");
        assert!(logs.has_message("one"));
        logs.clear();
        assert!(logs.events().is_empty());
    }

    #[test]
    fn test_capture_ends_with_guard() {
        let (logs, guard) = capture_logs();
        drop(guard);
        tracing::info!("after");
        assert!(logs.events().is_empty());
    }
}
