//! Per-script configuration resolution.
//!
//! Resolves the hook root directory, each script's extra arguments and its
//! timeout from a [`HooksConfig`], most specific key first.
//!
//! The two lookups treat empty values differently. A per-script cmdline that
//! is null, `false`, `0`, `""` or `[]` counts as unset and the event-level
//! cmdline is used instead. A timeout key counts as set whenever it exists
//! with a non-null value, so `""` there is a configuration error rather than
//! a fallthrough.

use std::path::PathBuf;
use std::sync::Arc;

use retrace_core::TaskInfo;
use retrace_settings::HooksConfig;
use serde_json::Value;
use tracing::debug;

use crate::errors::{HookError, Result};
use crate::template::{TemplateVars, interpolate};
use crate::types::ScriptInvocation;

/// Hook root used when `main.hookdir` is not configured.
pub const DEFAULT_HOOK_DIR: &str = "/usr/libexec/retrace-server/hooks";

/// Script timeout used when no timeout key is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Resolves hook configuration for one task.
#[derive(Clone)]
pub struct ConfigResolver {
    config: Arc<dyn HooksConfig>,
    task: TaskInfo,
}

impl ConfigResolver {
    /// Create a resolver over `config` for `task`.
    pub fn new(config: Arc<dyn HooksConfig>, task: TaskInfo) -> Self {
        Self { config, task }
    }

    /// The task whose values are substituted into templates.
    pub fn task(&self) -> &TaskInfo {
        &self.task
    }

    /// Root directory holding one subdirectory per event.
    pub fn hook_dir(&self) -> Result<PathBuf> {
        const KEY: &str = "main.hookdir";
        match self.config.get(KEY) {
            None | Some(Value::Null) => Ok(PathBuf::from(DEFAULT_HOOK_DIR)),
            Some(Value::String(dir)) if !dir.is_empty() => Ok(PathBuf::from(dir)),
            Some(other) => Err(HookError::Config {
                key: KEY.to_owned(),
                message: format!("expected a directory path, got {other}"),
            }),
        }
    }

    /// The interpolated extra cmdline for a script, if one is configured.
    pub fn resolve_cmdline(&self, event: &str, script: &str) -> Result<Option<String>> {
        let Some((key, template)) = self.cmdline_template(event, script)? else {
            return Ok(None);
        };
        let vars = self.vars(event);
        interpolate(template, &vars)
            .map(Some)
            .map_err(|e| HookError::Template {
                key,
                message: e.to_string(),
            })
    }

    /// The extra argv elements for a script.
    ///
    /// The raw template is split with POSIX shell rules first and each token
    /// is interpolated on its own, so a substituted value containing spaces
    /// or quotes stays a single argument.
    pub fn resolve_arguments(&self, event: &str, script: &str) -> Result<Vec<String>> {
        let Some((key, template)) = self.cmdline_template(event, script)? else {
            return Ok(Vec::new());
        };

        let tokens = shlex::split(template).ok_or_else(|| HookError::Config {
            key: key.clone(),
            message: "unbalanced quotes or trailing escape".to_owned(),
        })?;

        let vars = self.vars(event);
        tokens
            .iter()
            .map(|token| {
                interpolate(token, &vars).map_err(|e| HookError::Template {
                    key: key.clone(),
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Timeout in seconds for a script.
    pub fn resolve_timeout(&self, event: &str, script: &str) -> Result<u64> {
        let keys = [
            format!("{event}.{script}.timeout"),
            format!("{event}.timeout"),
            "main.timeout".to_owned(),
        ];

        for key in keys {
            match self.config.get(&key) {
                None | Some(Value::Null) => {}
                Some(value) => return parse_timeout(&key, value),
            }
        }
        Ok(DEFAULT_TIMEOUT_SECS)
    }

    /// Resolve everything needed to launch a script.
    pub fn resolve(&self, event: &str, script: &str) -> Result<ScriptInvocation> {
        let invocation = ScriptInvocation {
            cmdline: self.resolve_cmdline(event, script)?,
            args: self.resolve_arguments(event, script)?,
            timeout_secs: self.resolve_timeout(event, script)?,
        };
        debug!(
            event,
            script,
            args = invocation.args.len(),
            timeout_secs = invocation.timeout_secs,
            "resolved hook script invocation"
        );
        Ok(invocation)
    }

    /// The most specific non-empty cmdline template and the key it came from.
    fn cmdline_template(&self, event: &str, script: &str) -> Result<Option<(String, &str)>> {
        for key in [format!("{event}.{script}.cmdline"), format!("{event}.cmdline")] {
            match self.config.get(&key) {
                None => {}
                Some(value) if is_unset(value) => {}
                Some(Value::String(template)) => return Ok(Some((key, template.as_str()))),
                Some(other) => {
                    return Err(HookError::Config {
                        key,
                        message: format!("expected a string, got {other}"),
                    });
                }
            }
        }
        Ok(None)
    }

    fn vars<'a>(&'a self, event: &'a str) -> TemplateVars<'a> {
        TemplateVars {
            hook_name: event,
            taskid: self.task.id,
            task_results_dir: &self.task.results_dir,
        }
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

/// Empty cmdline values that fall through to the next key.
fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => matches!(n.as_f64(), Some(f) if f.abs() < f64::MIN_POSITIVE),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(true) => false,
    }
}

/// Coerce a configured timeout to whole seconds.
///
/// Fractional numbers are truncated toward zero. Strings must hold a
/// non-negative integer.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_timeout(key: &str, value: &Value) -> Result<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && *f < u64::MAX as f64)
                .map(|f| f.trunc() as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| HookError::Config {
        key: key.to_owned(),
        message: format!("expected a non-negative number of seconds, got {value}"),
    })
}
