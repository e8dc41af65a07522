#![allow(missing_docs, unused_results)]
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use retrace_core::{LogSeverity, MemoryTaskLog, TaskInfo};
use retrace_hooks::{ExecutionOutcome, HookError, HookEvent, HookRunner};
use retrace_settings::FlatConfig;
use tempfile::TempDir;

struct Fixture {
    root: TempDir,
    log: MemoryTaskLog,
}

impl Fixture {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            log: MemoryTaskLog::new(),
        }
    }

    fn script(&self, event: &str, name: &str, body: &str) {
        let dir = self.root.path().join(event);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn config(&self) -> FlatConfig {
        FlatConfig::new().with("main.hookdir", self.root.path().to_string_lossy().into_owned())
    }

    fn runner(&self, config: FlatConfig) -> HookRunner {
        HookRunner::new(
            Arc::new(config),
            &TaskInfo::new(1234, "/var/spool/retrace-server/1234/results"),
            Arc::new(self.log.clone()),
        )
    }

    fn marker(&self, name: &str) -> bool {
        self.root.path().join(name).exists()
    }
}

#[tokio::test]
async fn missing_event_directory_is_a_no_op() {
    let fx = Fixture::new();
    let report = fx.runner(fx.config()).run("pre_start").await.unwrap();

    assert!(report.is_empty());
    assert_eq!(report.event, "pre_start");
    assert!(fx.log.is_empty());
}

#[tokio::test]
async fn only_executables_run_in_name_order() {
    let fx = Fixture::new();
    fx.script("start", "20-second", "echo second");
    fx.script("start", "10-first", "echo first");
    let readme = fx.root.path().join("start/README");
    fs::write(&readme, "not a hook").unwrap();
    fs::set_permissions(&readme, fs::Permissions::from_mode(0o644)).unwrap();

    let report = fx.runner(fx.config()).run_event(HookEvent::Start).await.unwrap();

    let names: Vec<_> = report.runs.iter().map(|r| r.script.as_str()).collect();
    assert_eq!(names, vec!["10-first", "20-second"]);
    assert_eq!(report.succeeded(), 2);
}

#[tokio::test]
async fn cmdline_precedence() {
    let fx = Fixture::new();
    let echo_args = "echo \"$@\"";
    fx.script("post_retrace", "specific", echo_args);
    fx.script("post_retrace", "generic", echo_args);
    fx.script("success", "bare", echo_args);

    let config = fx
        .config()
        .with("post_retrace.specific.cmdline", "--only-me {taskid}")
        .with("post_retrace.cmdline", "--event {hook_name}");
    let runner = fx.runner(config);

    let report = runner.run("post_retrace").await.unwrap();
    assert_eq!(report.outcome("specific").unwrap().stdout(), "--only-me 1234\n");
    assert_eq!(report.outcome("generic").unwrap().stdout(), "--event post_retrace\n");

    let report = runner.run("success").await.unwrap();
    assert_eq!(report.outcome("bare").unwrap().stdout(), "\n");
}

#[tokio::test]
async fn substituted_values_stay_single_arguments() {
    let fx = Fixture::new();
    fx.script("fail", "count", "echo $#");

    let config = fx.config().with("fail.cmdline", "--dir {task_results_dir} \"two words\"");
    let runner = HookRunner::new(
        Arc::new(config),
        &TaskInfo::new(5, "/srv/retrace tasks/5"),
        Arc::new(fx.log.clone()),
    );

    let report = runner.run("fail").await.unwrap();
    assert_eq!(report.outcome("count").unwrap().stdout(), "3\n");
}

#[tokio::test]
async fn script_timeout_beats_event_timeout() {
    let fx = Fixture::new();
    fx.script("pre_retrace", "slow", "exec sleep 5");

    let config = fx
        .config()
        .with("pre_retrace.slow.timeout", 2)
        .with("pre_retrace.timeout", 100);

    let started = Instant::now();
    let report = fx.runner(config).run("pre_retrace").await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_matches!(
        report.outcome("slow"),
        Some(ExecutionOutcome::Timeout { elapsed_secs: 2, .. })
    );
    assert!(fx.log.contains(LogSeverity::Error, "Hook script 'slow' timed out in 2 seconds."));
}

#[tokio::test]
async fn failing_script_is_recorded_and_forwarded() {
    let fx = Fixture::new();
    fx.script("fail", "broken", "echo partial\necho boom >&2\nexit 3");
    fx.script("fail", "fine", "true");

    let report = fx.runner(fx.config()).run("fail").await.unwrap();

    assert_matches!(
        report.outcome("broken"),
        Some(ExecutionOutcome::Failure { exit_code: 3, stdout, stderr })
            if stdout == "partial\n" && stderr == "boom\n"
    );
    assert!(report.outcome("fine").unwrap().is_success());
    assert_eq!(report.failed(), 1);
    assert!(fx.log.contains(LogSeverity::Info, "partial"));
    assert!(fx.log.contains(LogSeverity::Error, "boom"));
    assert!(fx.log.contains(LogSeverity::Error, "Hook script 'broken' failed with exit status 3."));
}

#[tokio::test]
async fn small_pool_runs_every_script() {
    let fx = Fixture::new();
    for i in 0..8 {
        fx.script("post_clean_task", &format!("hook-{i}"), &format!("sleep 0.2\necho {i}"));
    }

    let report = fx
        .runner(fx.config())
        .with_pool_size(2)
        .run("post_clean_task")
        .await
        .unwrap();

    assert_eq!(report.runs.len(), 8);
    assert_eq!(report.succeeded(), 8);
    for i in 0..8 {
        assert_eq!(
            report.outcome(&format!("hook-{i}")).unwrap().stdout(),
            format!("{i}\n")
        );
    }
}

#[tokio::test]
async fn config_fault_surfaces_before_any_launch() {
    let fx = Fixture::new();
    let marker = fx.root.path().join("ran");
    fx.script("start", "a-touch", &format!("touch '{}'", marker.display()));
    fx.script("start", "b-bad", "true");

    let config = fx.config().with("start.b-bad.timeout", "soon");
    let err = fx.runner(config).run("start").await.unwrap_err();

    assert_matches!(err, HookError::Config { key, .. } if key == "start.b-bad.timeout");
    assert!(!fx.marker("ran"));
    assert!(fx.log.is_empty());
}

#[tokio::test]
async fn bad_template_surfaces_before_any_launch() {
    let fx = Fixture::new();
    fx.script("success", "hook", "true");

    let config = fx.config().with("success.cmdline", "--task {task_id}");
    let err = fx.runner(config).run("success").await.unwrap_err();

    assert!(err.is_config_error());
    assert_matches!(err, HookError::Template { .. });
}

#[tokio::test]
async fn invalid_event_name_rejected() {
    let fx = Fixture::new();
    let runner = fx.runner(fx.config());

    assert_matches!(
        runner.run("../etc").await,
        Err(HookError::InvalidEventName { name }) if name == "../etc"
    );
    assert_matches!(runner.run("").await, Err(HookError::InvalidEventName { .. }));
}

#[tokio::test]
async fn scripts_added_between_runs_are_seen() {
    let fx = Fixture::new();
    fx.script("pre_remove_task", "one", "true");
    let runner = fx.runner(fx.config());

    assert_eq!(runner.scripts("pre_remove_task").unwrap().len(), 1);
    fx.script("pre_remove_task", "two", "true");
    assert_eq!(runner.run("pre_remove_task").await.unwrap().runs.len(), 2);
}

#[tokio::test]
async fn scripts_run_in_event_directory() {
    let fx = Fixture::new();
    fx.script("pre_prepare_debuginfo", "where", "pwd -P");

    let report = fx.runner(fx.config()).run("pre_prepare_debuginfo").await.unwrap();

    let expected = fs::canonicalize(fx.root.path().join("pre_prepare_debuginfo")).unwrap();
    assert_eq!(
        Path::new(report.outcome("where").unwrap().stdout().trim_end()),
        expected
    );
}
