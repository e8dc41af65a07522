//! # retrace-hook
//!
//! Runs, lists and describes retrace lifecycle hooks from the command line.
//! Configuration is loaded the same way the server loads it, so operators can
//! try a hook setup against a task before the task state machine does.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use retrace_core::{TaskInfo, TracingTaskLog};
use retrace_hooks::{HookEvent, HookRunner};
use retrace_settings::{FlatConfig, HooksConfig};

/// Retrace lifecycle hook runner.
#[derive(Parser, Debug)]
#[command(name = "retrace-hook", version, about = "Run retrace lifecycle hooks")]
struct Cli {
    /// Configuration file or directory of `*.json` files.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimum log level (overridden by `RUST_LOG`).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every script of an event and print the report as JSON.
    Run {
        /// Event name, e.g. `pre_retrace`.
        event: String,

        /// Task number substituted for `{taskid}`.
        #[arg(long)]
        task_id: u64,

        /// Directory substituted for `{task_results_dir}`.
        #[arg(long)]
        results_dir: PathBuf,

        /// Maximum scripts run at once (defaults to the CPU count).
        #[arg(long)]
        jobs: Option<usize>,
    },

    /// Show the scripts of an event with their resolved arguments and timeout.
    List {
        /// Event name, e.g. `pre_retrace`.
        event: String,

        /// Task number substituted for `{taskid}`.
        #[arg(long, default_value_t = 0)]
        task_id: u64,

        /// Directory substituted for `{task_results_dir}`.
        #[arg(long, default_value = ".")]
        results_dir: PathBuf,
    },

    /// Print the known lifecycle events.
    Events,
}

fn load_config(path: Option<&Path>) -> Result<FlatConfig> {
    let config = match path {
        Some(p) if p.is_dir() => retrace_settings::load_hooks_config_from_dir(p),
        Some(p) => retrace_settings::load_hooks_config_from_path(p),
        None => retrace_settings::load_hooks_config(),
    };
    config.context("Failed to load hook configuration")
}

fn warn_if_unknown(event: &str) {
    if event.parse::<HookEvent>().is_err() {
        tracing::warn!(event, "not a known lifecycle event; running it anyway");
    }
}

async fn run(
    config: Arc<dyn HooksConfig>,
    event: &str,
    task: &TaskInfo,
    jobs: Option<usize>,
) -> Result<()> {
    warn_if_unknown(event);
    let log = Arc::new(TracingTaskLog::for_task(task.id));
    let mut runner = HookRunner::new(config, task, log);
    if let Some(jobs) = jobs {
        runner = runner.with_pool_size(jobs);
    }

    let report = runner
        .run(event)
        .await
        .with_context(|| format!("Failed to run '{event}' hooks"))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to render report")?
    );
    Ok(())
}

fn list(config: Arc<dyn HooksConfig>, event: &str, task: &TaskInfo) -> Result<()> {
    warn_if_unknown(event);
    let runner = HookRunner::new(config, task, Arc::new(TracingTaskLog::for_task(task.id)));
    let dir = runner.event_dir(event)?;
    let scripts = runner
        .scripts(event)
        .with_context(|| format!("Failed to list hooks in {}", dir.display()))?;

    if scripts.is_empty() {
        println!("no hook scripts in {}", dir.display());
        return Ok(());
    }
    for script in scripts {
        let invocation = runner
            .resolver()
            .resolve(event, &script.name)
            .with_context(|| format!("Invalid configuration for script '{}'", script.name))?;
        println!(
            "{}\ttimeout={}s\targs={:?}",
            script.name, invocation.timeout_secs, invocation.args
        );
    }
    Ok(())
}

fn events() {
    for event in HookEvent::all() {
        println!("{:<26}{}", event.as_str(), event.description());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        retrace_core::logging::init_json_subscriber(&cli.log_level);
    } else {
        retrace_core::logging::init_subscriber(&cli.log_level);
    }

    match cli.command {
        Command::Run {
            event,
            task_id,
            results_dir,
            jobs,
        } => {
            let config = Arc::new(load_config(cli.config.as_deref())?);
            run(config, &event, &TaskInfo::new(task_id, results_dir), jobs).await
        }
        Command::List {
            event,
            task_id,
            results_dir,
        } => {
            let config = Arc::new(load_config(cli.config.as_deref())?);
            list(config, &event, &TaskInfo::new(task_id, results_dir))
        }
        Command::Events => {
            events();
            Ok(())
        }
    }
}
