//! Event-level orchestration.
//!
//! [`HookRunner::run`] is the entry point the task state machine calls at
//! each lifecycle point. It discovers the event's scripts, resolves every
//! invocation up front, then runs them on a per-call [`WorkerPool`] and
//! waits for all of them.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use retrace_core::{RetraceTask, TaskInfo, TaskLog};
use retrace_settings::HooksConfig;
use tracing::{debug, info, warn};

use crate::discovery::discover_executables;
use crate::errors::{HookError, Result};
use crate::executor::ScriptExecutor;
use crate::pool::{WorkerPool, available_parallelism};
use crate::resolver::ConfigResolver;
use crate::types::{EventReport, HookEvent, HookScript, LaunchFailure, ScriptInvocation, ScriptRun};

/// Runs the hook scripts of one task.
#[derive(Clone)]
pub struct HookRunner {
    resolver: ConfigResolver,
    executor: Arc<ScriptExecutor>,
    log: Arc<dyn TaskLog>,
    pool_size: usize,
}

impl HookRunner {
    /// Create a runner for `task`, reading configuration from `config` and
    /// reporting script output to `log`.
    pub fn new(config: Arc<dyn HooksConfig>, task: &dyn RetraceTask, log: Arc<dyn TaskLog>) -> Self {
        Self {
            resolver: ConfigResolver::new(config, TaskInfo::from_task(task)),
            executor: Arc::new(ScriptExecutor::new(Arc::clone(&log))),
            log,
            pool_size: available_parallelism(),
        }
    }

    /// Override the number of scripts allowed to run at once.
    #[must_use]
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size.max(1);
        self
    }

    /// Maximum number of scripts run at once.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// The configuration resolver used for every script.
    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    /// Directory holding the scripts of `event`.
    pub fn event_dir(&self, event: &str) -> Result<PathBuf> {
        validate_event_name(event)?;
        Ok(self.resolver.hook_dir()?.join(event))
    }

    /// Scripts currently installed for `event`, ordered by name.
    pub fn scripts(&self, event: &str) -> Result<Vec<HookScript>> {
        let dir = self.event_dir(event)?;
        Ok(discover_executables(&dir)?.collect())
    }

    /// Run every script of a known lifecycle event.
    pub async fn run_event(&self, event: HookEvent) -> Result<EventReport> {
        self.run(event.as_str()).await
    }

    /// Run every script of `event` and wait for all of them.
    ///
    /// Returns an empty report when the event has no scripts. Script
    /// failures, timeouts and launch failures are recorded in the report.
    /// Only an invalid event name, an unreadable hook directory or a
    /// configuration fault is an error, and those are detected before any
    /// script starts.
    pub async fn run(&self, event: &str) -> Result<EventReport> {
        let event_dir = self.event_dir(event)?;
        let scripts: Vec<HookScript> = discover_executables(&event_dir)?.collect();
        if scripts.is_empty() {
            debug!(event, dir = %event_dir.display(), "no hook scripts to run");
            return Ok(EventReport::new(event));
        }

        let planned = scripts
            .into_iter()
            .map(|script| {
                let invocation = self.resolver.resolve(event, &script.name)?;
                Ok((script, invocation))
            })
            .collect::<Result<Vec<(HookScript, ScriptInvocation)>>>()?;

        let mut pool = WorkerPool::new(self.pool_size);
        debug!(event, scripts = planned.len(), workers = pool.size(), "dispatching hook scripts");
        for (script, invocation) in planned {
            let executor = Arc::clone(&self.executor);
            let event = event.to_owned();
            let dir = event_dir.clone();
            pool.submit(async move {
                let result = executor.execute(&event, &dir, &script, &invocation).await;
                (script, result)
            })
            .await;
        }

        let mut report = EventReport::new(event);
        for (script, result) in pool.join_all().await {
            match result {
                Ok(outcome) => report.runs.push(ScriptRun {
                    script: script.name,
                    outcome,
                }),
                Err(e) => {
                    warn!(event, script = %script.name, error = %e, "hook script could not be launched");
                    self.log.error(&e.to_string());
                    report.launch_failures.push(LaunchFailure {
                        script: script.name,
                        error: e.to_string(),
                    });
                }
            }
        }
        report.sort();

        info!(
            event,
            total = report.total(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            timed_out = report.timed_out(),
            launch_failures = report.launch_failures.len(),
            "hook event finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for HookRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRunner")
            .field("resolver", &self.resolver)
            .field("pool_size", &self.pool_size)
            .finish_non_exhaustive()
    }
}

/// Event names become a directory name under the hook root.
fn validate_event_name(event: &str) -> Result<()> {
    let mut components = Path::new(event).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single_normal && !event.contains('/') && !event.contains('\0') {
        Ok(())
    } else {
        Err(HookError::InvalidEventName {
            name: event.to_owned(),
        })
    }
}
