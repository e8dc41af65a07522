//! # retrace-hooks
//!
//! Lifecycle hook execution for retrace tasks.
//!
//! Operators drop executable scripts into `<hookdir>/<event>/`. When the task
//! reaches that lifecycle point, [`HookRunner::run`](runner::HookRunner::run)
//! discovers the scripts, resolves each one's extra arguments and timeout
//! from configuration, and runs them concurrently on a worker pool sized to
//! the host's CPUs.
//!
//! ## Resolution
//!
//! Most specific wins:
//! - cmdline: `<event>.<script>.cmdline` → `<event>.cmdline` → none
//! - timeout: `<event>.<script>.timeout` → `<event>.timeout` →
//!   `main.timeout` → 300 seconds
//!
//! ## Fail-Open
//!
//! A script that exits non-zero, times out, or cannot be started never fails
//! the event. Its output and status go to the task log and the
//! [`EventReport`](types::EventReport). Only configuration faults and an
//! unreadable hook directory are returned as errors, and those surface
//! before any script is launched.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use retrace_core::{MemoryTaskLog, TaskInfo};
//! use retrace_hooks::runner::HookRunner;
//! use retrace_hooks::types::HookEvent;
//! use retrace_settings::FlatConfig;
//!
//! # async fn demo() -> retrace_hooks::errors::Result<()> {
//! let config = Arc::new(FlatConfig::new().with("main.hookdir", "/srv/hooks"));
//! let task = TaskInfo::new(42, "/srv/tasks/42/results");
//! let runner = HookRunner::new(config, &task, Arc::new(MemoryTaskLog::new()));
//! let report = runner.run_event(HookEvent::PreRetrace).await?;
//! println!("{} scripts ran", report.runs.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod discovery;
pub mod errors;
pub mod executor;
pub mod pool;
pub mod resolver;
pub mod runner;
pub mod template;
pub mod types;

pub use errors::{HookError, Result};
pub use runner::HookRunner;
pub use types::{EventReport, ExecutionOutcome, HookEvent, HookScript, ScriptInvocation};
