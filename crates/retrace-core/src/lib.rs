//! # retrace-core
//!
//! Foundation types shared by the retrace hook crates.
//!
//! - **Task identity**: [`TaskId`] and the read-only [`RetraceTask`] view of a
//!   retrace task (numeric id plus results directory)
//! - **Task log**: the [`TaskLog`] sink that hook output is forwarded to, with
//!   a `tracing`-backed and an in-memory implementation
//! - **Logging**: subscriber setup and test capture helpers

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;
pub mod task;
pub mod task_log;

pub use ids::TaskId;
pub use task::{RetraceTask, TaskInfo};
pub use task_log::{LogEntry, LogSeverity, MemoryTaskLog, TaskLog, TracingTaskLog};
