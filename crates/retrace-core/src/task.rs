//! Read-only view of a retrace task.
//!
//! The hook subsystem never drives the task state machine. It only needs the
//! task number and the results directory, both of which are substituted into
//! hook command-line templates.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ids::TaskId;

/// What the hook subsystem can see of a retrace task.
pub trait RetraceTask: Send + Sync {
    /// Numeric task identifier.
    fn task_id(&self) -> TaskId;

    /// Directory holding the task's results.
    fn results_dir(&self) -> &Path;
}

/// Plain snapshot of a task's identity.
///
/// Hook runners copy this out of the task at construction so they do not
/// hold a borrow of the task while scripts run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    /// Numeric task identifier.
    pub id: TaskId,
    /// Directory holding the task's results.
    pub results_dir: PathBuf,
}

impl TaskInfo {
    /// Create a snapshot from explicit values.
    pub fn new(id: impl Into<TaskId>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            results_dir: results_dir.into(),
        }
    }

    /// Snapshot any [`RetraceTask`].
    pub fn from_task(task: &dyn RetraceTask) -> Self {
        Self {
            id: task.task_id(),
            results_dir: task.results_dir().to_path_buf(),
        }
    }
}

impl RetraceTask for TaskInfo {
    fn task_id(&self) -> TaskId {
        self.id
    }

    fn results_dir(&self) -> &Path {
        &self.results_dir
    }
}
