//! DW-012: Scoped working-directory switch for a document's execution phase.
//!
//! The working directory is process-wide, so the guard also holds a global
//! lock: one document executes at a time.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

static WORKDIR_LOCK: Mutex<()> = Mutex::new(());

/// Restores the previous working directory on drop, on every exit path.
pub struct WorkdirGuard {
    previous: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl WorkdirGuard {
    /// Switch to `dir` until the guard is dropped.
    pub fn enter(dir: &Path) -> std::io::Result<Self> {
        let lock = WORKDIR_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        tracing::debug!(dir = %dir.display(), "entered document directory");
        Ok(Self {
            previous,
            _lock: lock,
        })
    }

    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            tracing::error!(
                dir = %self.previous.display(),
                "cannot restore working directory: {}",
                e
            );
        }
    }
}

/// Directory a document's relative paths resolve against.
pub fn document_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
