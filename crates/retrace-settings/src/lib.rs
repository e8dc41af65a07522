//! # retrace-settings
//!
//! Configuration for retrace hooks.
//!
//! The hook subsystem reads configuration as a flat mapping from dotted keys
//! (`main.hookdir`, `pre_retrace.timeout`, `pre_retrace.notify.cmdline`) to
//! JSON-like values through the read-only [`HooksConfig`] trait.
//!
//! [`FlatConfig`] is the in-memory implementation. It is built by flattening
//! nested JSON objects, so `{"pre_retrace": {"timeout": 60}}` and
//! `{"pre_retrace.timeout": 60}` describe the same key.
//!
//! Loading is layered (in priority order):
//! 1. **Files**: every `*.json` file in `/etc/retrace-server/hooks`, merged
//!    in name order (or a single explicit file)
//! 2. **Environment variables**: `RETRACE_HOOKS_<SECTION>__<KEY>` overrides
//!    (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use retrace_settings::{load_hooks_config, HooksConfig};
//!
//! let config = load_hooks_config().unwrap_or_default();
//! println!("hook dir: {:?}", config.get("main.hookdir"));
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod loader;

pub use config::{FlatConfig, HooksConfig, flatten};
pub use errors::{Result, SettingsError};
pub use loader::{
    DEFAULT_CONFIG_DIR, ENV_PREFIX, load_hooks_config, load_hooks_config_from_dir,
    load_hooks_config_from_path,
};
