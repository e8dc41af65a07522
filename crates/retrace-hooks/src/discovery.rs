//! Filesystem hook discovery.
//!
//! An event's scripts are the executable regular files directly inside
//! `<hookdir>/<event>/`. The directory listing is read and sorted when
//! [`discover_executables`] is called; whether each entry is a file and is
//! executable is checked lazily while iterating. Nothing is cached, so every
//! call sees the directory as it is now.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{HookError, Result};
use crate::types::HookScript;

/// Sorted executable entries of a hook directory.
///
/// Produced by [`discover_executables`]; yields [`HookScript`]s in file-name
/// order.
#[derive(Debug)]
pub struct ExecutableEntries {
    entries: std::vec::IntoIter<PathBuf>,
}

impl ExecutableEntries {
    fn empty() -> Self {
        Self {
            entries: Vec::new().into_iter(),
        }
    }
}

impl Iterator for ExecutableEntries {
    type Item = HookScript;

    fn next(&mut self) -> Option<HookScript> {
        self.entries
            .by_ref()
            .find(|path| path.is_file() && is_executable(path))
            .map(HookScript::from_path)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.entries.size_hint().1)
    }
}

/// List the executable scripts in `dir`, ordered by file name.
///
/// A missing directory, or a path that is not a directory, yields no
/// scripts. An existing directory that cannot be listed is a
/// [`HookError::Discovery`].
pub fn discover_executables(dir: &Path) -> Result<ExecutableEntries> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "hook directory not present");
        return Ok(ExecutableEntries::empty());
    }

    let discovery_error = |source| HookError::Discovery {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(discovery_error)? {
        entries.push(entry.map_err(discovery_error)?.path());
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    debug!(dir = %dir.display(), entries = entries.len(), "scanned hook directory");
    Ok(ExecutableEntries {
        entries: entries.into_iter(),
    })
}

/// Whether the running process may execute `path`.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    rustix::fs::access(path, rustix::fs::Access::EXEC_OK).is_ok()
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}
