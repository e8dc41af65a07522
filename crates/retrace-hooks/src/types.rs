//! Core types for the hook system.
//!
//! Defines the lifecycle event vocabulary, discovered scripts, resolved
//! invocations, per-script outcomes and the per-event report.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle point of a retrace task at which hook scripts run.
///
/// The snake_case name doubles as the hook subdirectory and as the first
/// component of configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// When the task is asked to start.
    PreStart,
    /// When the task type is determined and the main task starts.
    Start,
    /// Before debuginfo packages are prepared.
    PrePrepareDebuginfo,
    /// After debuginfo packages are prepared.
    PostPrepareDebuginfo,
    /// Before the retrace environment is prepared.
    PrePrepareEnvironment,
    /// After the retrace environment is prepared.
    PostPrepareEnvironment,
    /// Before retracing starts.
    PreRetrace,
    /// After retracing is done.
    PostRetrace,
    /// After retracing succeeded.
    Success,
    /// After retracing failed.
    Fail,
    /// Before the task is removed.
    PreRemoveTask,
    /// After the task is removed.
    PostRemoveTask,
    /// Before the task is cleaned.
    PreCleanTask,
    /// After the task is cleaned.
    PostCleanTask,
}

impl HookEvent {
    /// Returns all events in lifecycle order.
    #[must_use]
    pub fn all() -> &'static [HookEvent] {
        &[
            Self::PreStart,
            Self::Start,
            Self::PrePrepareDebuginfo,
            Self::PostPrepareDebuginfo,
            Self::PrePrepareEnvironment,
            Self::PostPrepareEnvironment,
            Self::PreRetrace,
            Self::PostRetrace,
            Self::Success,
            Self::Fail,
            Self::PreRemoveTask,
            Self::PostRemoveTask,
            Self::PreCleanTask,
            Self::PostCleanTask,
        ]
    }

    /// The event name used for directories and configuration keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreStart => "pre_start",
            Self::Start => "start",
            Self::PrePrepareDebuginfo => "pre_prepare_debuginfo",
            Self::PostPrepareDebuginfo => "post_prepare_debuginfo",
            Self::PrePrepareEnvironment => "pre_prepare_environment",
            Self::PostPrepareEnvironment => "post_prepare_environment",
            Self::PreRetrace => "pre_retrace",
            Self::PostRetrace => "post_retrace",
            Self::Success => "success",
            Self::Fail => "fail",
            Self::PreRemoveTask => "pre_remove_task",
            Self::PostRemoveTask => "post_remove_task",
            Self::PreCleanTask => "pre_clean_task",
            Self::PostCleanTask => "post_clean_task",
        }
    }

    /// Human-readable description of when the event fires.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::PreStart => "when the task is asked to start",
            Self::Start => "when the task type is determined and the main task starts",
            Self::PrePrepareDebuginfo => "before the preparation of debuginfo packages",
            Self::PostPrepareDebuginfo => "after the preparation of debuginfo packages",
            Self::PrePrepareEnvironment => "before the preparation of the retrace environment",
            Self::PostPrepareEnvironment => "after the preparation of the retrace environment",
            Self::PreRetrace => "before retracing starts",
            Self::PostRetrace => "after retracing is done",
            Self::Success => "after retracing succeeds",
            Self::Fail => "after retracing fails",
            Self::PreRemoveTask => "before removing the task",
            Self::PostRemoveTask => "after removing the task",
            Self::PreCleanTask => "before cleaning the task",
            Self::PostCleanTask => "after cleaning the task",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for HookEvent {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Error returned when parsing an unrecognized event name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hook event: '{0}'")]
pub struct UnknownHookEvent(pub String);

impl FromStr for HookEvent {
    type Err = UnknownHookEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| UnknownHookEvent(s.to_owned()))
    }
}

/// An executable script found in an event's hook directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookScript {
    /// Base file name; used as the script component of configuration keys.
    pub name: String,
    /// Full path to the script.
    pub path: PathBuf,
}

impl HookScript {
    /// Build a script descriptor from its path.
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }
}

/// Everything resolved from configuration for one script run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptInvocation {
    /// The interpolated cmdline string, if any was configured.
    pub cmdline: Option<String>,
    /// Extra argv elements appended after the script path.
    pub args: Vec<String>,
    /// Hard wall-clock limit in seconds.
    pub timeout_secs: u64,
}

/// Classified result of one script run.
///
/// Output is kept in every variant; a timed-out script keeps whatever it
/// wrote before it was killed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExecutionOutcome {
    /// The script exited with status zero.
    Success {
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
    /// The script exited with a non-zero status.
    #[serde(rename_all = "camelCase")]
    Failure {
        /// Exit status; on unix a signal death is the negated signal number.
        exit_code: i32,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
    /// The script exceeded its timeout and was killed.
    #[serde(rename_all = "camelCase")]
    Timeout {
        /// The timeout that elapsed, in seconds.
        elapsed_secs: u64,
        /// Output captured before the kill.
        stdout: String,
        /// Error output captured before the kill.
        stderr: String,
    },
}

impl ExecutionOutcome {
    /// Captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        match self {
            Self::Success { stdout, .. }
            | Self::Failure { stdout, .. }
            | Self::Timeout { stdout, .. } => stdout,
        }
    }

    /// Captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        match self {
            Self::Success { stderr, .. }
            | Self::Failure { stderr, .. }
            | Self::Timeout { stderr, .. } => stderr,
        }
    }

    /// Whether the script exited zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether the script was killed on timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Exit status of a process that exited; `None` after a timeout.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failure { exit_code, .. } => Some(*exit_code),
            Self::Success { .. } => Some(0),
            Self::Timeout { .. } => None,
        }
    }
}

/// Outcome of one script within an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptRun {
    /// Script base name.
    pub script: String,
    /// How the run ended.
    pub outcome: ExecutionOutcome,
}

/// A script whose process could not be started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchFailure {
    /// Script base name.
    pub script: String,
    /// Rendered launch error.
    pub error: String,
}

/// Aggregate result of running one event.
///
/// Entries are sorted by script name, so the report does not depend on
/// the order in which scripts finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReport {
    /// Event name.
    pub event: String,
    /// One entry per script that ran.
    pub runs: Vec<ScriptRun>,
    /// Scripts that could not be started.
    pub launch_failures: Vec<LaunchFailure>,
}

impl EventReport {
    /// Create an empty report for an event.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            runs: Vec::new(),
            launch_failures: Vec::new(),
        }
    }

    /// Number of scripts observed, launched or not.
    #[must_use]
    pub fn total(&self) -> usize {
        self.runs.len() + self.launch_failures.len()
    }

    /// Whether no scripts were found for the event.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Number of runs that exited zero.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| r.outcome.is_success()).count()
    }

    /// Number of runs that timed out.
    #[must_use]
    pub fn timed_out(&self) -> usize {
        self.runs.iter().filter(|r| r.outcome.is_timeout()).count()
    }

    /// Number of runs that exited non-zero.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.runs.len() - self.succeeded() - self.timed_out()
    }

    /// Look up the outcome of a script by name.
    #[must_use]
    pub fn outcome(&self, script: &str) -> Option<&ExecutionOutcome> {
        self.runs
            .iter()
            .find(|r| r.script == script)
            .map(|r| &r.outcome)
    }

    pub(crate) fn sort(&mut self) {
        self.runs.sort_by(|a, b| a.script.cmp(&b.script));
        self.launch_failures.sort_by(|a, b| a.script.cmp(&b.script));
    }
}
