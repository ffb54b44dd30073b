//! DW-002: Document- and run-level errors.
//!
//! Fragment faults are not errors: they are recorded in
//! [`ExecutionResult::fault`](super::types::ExecutionResult) and the pass continues.

use std::path::{Path, PathBuf};

pub type WeaveResult<T> = Result<T, WeaveError>;

#[derive(thiserror::Error, Debug)]
pub enum WeaveError {
    #[error("file not found: {}", path.display())]
    Discovery { path: PathBuf },

    #[error("{}: {detail}", path.display())]
    Persistence { path: PathBuf, detail: String },

    #[error("{}: {detail}", path.display())]
    Rewrite { path: PathBuf, detail: String },

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("config error: {0}")]
    Config(String),
}

impl WeaveError {
    pub fn persistence(path: &Path, detail: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }

    pub fn rewrite(path: &Path, detail: impl Into<String>) -> Self {
        Self::Rewrite {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }
}
