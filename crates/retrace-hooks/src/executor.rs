//! Single-script execution with a hard timeout.
//!
//! The child runs in its event directory with stdin closed and both output
//! streams piped. Pipes are drained concurrently with the wait so a chatty
//! script cannot block on a full pipe, and the wall-clock limit covers both.
//! A text script without a `#!` line is run by `/bin/sh`.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use retrace_core::TaskLog;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::errors::{HookError, Result};
use crate::types::{ExecutionOutcome, HookScript, ScriptInvocation};

const READ_CHUNK: usize = 8 * 1024;
const SPAWN_ATTEMPTS: u32 = 3;
const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(50);
const SHELL: &str = "/bin/sh";

/// Runs one hook script and classifies how it ended.
#[derive(Clone)]
pub struct ScriptExecutor {
    log: Arc<dyn TaskLog>,
}

impl ScriptExecutor {
    /// Create an executor that reports script output to `log`.
    pub fn new(log: Arc<dyn TaskLog>) -> Self {
        Self { log }
    }

    /// Run `script` from `event_dir` with the resolved `invocation`.
    ///
    /// A non-zero exit or a timeout is an [`ExecutionOutcome`], not an
    /// error. Only a process that cannot be started or waited on is a
    /// [`HookError::Launch`].
    pub async fn execute(
        &self,
        event: &str,
        event_dir: &Path,
        script: &HookScript,
        invocation: &ScriptInvocation,
    ) -> Result<ExecutionOutcome> {
        self.log
            .debug(&format!("Running '{event}' hook - script '{}'", script.name));

        let launch_error = |source| HookError::Launch {
            script: script.name.clone(),
            source,
        };

        let mut child = spawn(event_dir, script, invocation)
            .await
            .map_err(launch_error)?;
        debug!(
            event,
            script = %script.name,
            pid = child.id(),
            timeout_secs = invocation.timeout_secs,
            "hook script started"
        );

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let limit = Duration::from_secs(invocation.timeout_secs);
        let waited = tokio::time::timeout(limit, async {
            let (out, err) = tokio::join!(
                drain(stdout_pipe, &mut stdout),
                drain(stderr_pipe, &mut stderr)
            );
            if let Err(e) = out.and(err) {
                warn!(script = %script.name, error = %e, "failed reading hook script output");
            }
            child.wait().await
        })
        .await;

        let outcome = match waited {
            Ok(status) => {
                let status = status.map_err(launch_error)?;
                classify(status, lossy(stdout), lossy(stderr))
            }
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                warn!(
                    event,
                    script = %script.name,
                    timeout_secs = invocation.timeout_secs,
                    "hook script timed out"
                );
                ExecutionOutcome::Timeout {
                    elapsed_secs: invocation.timeout_secs,
                    stdout: lossy(stdout),
                    stderr: lossy(stderr),
                }
            }
        };

        self.report(&script.name, &outcome);
        Ok(outcome)
    }

    fn report(&self, name: &str, outcome: &ExecutionOutcome) {
        let stdout = outcome.stdout().trim_end();
        if !stdout.is_empty() {
            self.log.info(stdout);
        }
        let stderr = outcome.stderr().trim_end();
        if !stderr.is_empty() {
            self.log.error(stderr);
        }

        match outcome {
            ExecutionOutcome::Success { .. } => {}
            ExecutionOutcome::Failure { exit_code, .. } => self.log.error(&format!(
                "Hook script '{name}' failed with exit status {exit_code}."
            )),
            ExecutionOutcome::Timeout { elapsed_secs, .. } => self.log.error(&format!(
                "Hook script '{name}' timed out in {elapsed_secs} seconds."
            )),
        }
    }
}

impl std::fmt::Debug for ScriptExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptExecutor").finish_non_exhaustive()
    }
}

async fn spawn(
    event_dir: &Path,
    script: &HookScript,
    invocation: &ScriptInvocation,
) -> std::io::Result<Child> {
    let mut cmd = Command::new(&script.path);
    let _ = cmd.args(&invocation.args);

    match spawn_retrying(cmd, event_dir, script).await {
        // Text scripts without a `#!` line are run by the shell.
        Err(e) if is_exec_format_error(&e) => {
            debug!(script = %script.name, "no interpreter line, running with {SHELL}");
            let mut cmd = Command::new(SHELL);
            let _ = cmd.arg(&script.path).args(&invocation.args);
            spawn_retrying(cmd, event_dir, script).await
        }
        result => result,
    }
}

async fn spawn_retrying(
    mut cmd: Command,
    event_dir: &Path,
    script: &HookScript,
) -> std::io::Result<Child> {
    let _ = cmd
        .current_dir(event_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut attempt = 1;
    loop {
        match cmd.spawn() {
            Ok(child) => return Ok(child),
            // A script rewritten moments ago can still be open for writing
            // in a process that forked meanwhile.
            Err(e) if attempt < SPAWN_ATTEMPTS && is_text_busy(&e) => {
                debug!(script = %script.name, attempt, "script busy, retrying spawn");
                attempt += 1;
                tokio::time::sleep(SPAWN_RETRY_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(unix)]
fn is_text_busy(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(rustix::io::Errno::TXTBSY.raw_os_error())
}

#[cfg(unix)]
fn is_exec_format_error(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(rustix::io::Errno::NOEXEC.raw_os_error())
}

#[cfg(not(unix))]
fn is_exec_format_error(_err: &std::io::Error) -> bool {
    false
}

#[cfg(not(unix))]
fn is_text_busy(_err: &std::io::Error) -> bool {
    false
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) -> std::io::Result<()> {
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn classify(status: ExitStatus, stdout: String, stderr: String) -> ExecutionOutcome {
    if status.success() {
        return ExecutionOutcome::Success { stdout, stderr };
    }
    ExecutionOutcome::Failure {
        exit_code: exit_code(status),
        stdout,
        stderr,
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
