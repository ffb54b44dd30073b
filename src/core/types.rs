//! DW-001: Core types — fragments, execution results, reports, configuration.
//!
//! Fragments and results are plain data. Only the rewriter turns them back
//! into document text; only the executor produces reports.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Sentinels
// ============================================================================

/// Opening sentinel of a generated region.
pub const OUTPUT_START: &str = "<!-- AUTO-OUTPUT-START -->";

/// Closing sentinel of a generated region.
pub const OUTPUT_END: &str = "<!-- AUTO-OUTPUT-END -->";

// ============================================================================
// Fragments and results
// ============================================================================

/// A fenced code fragment located in the base text of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFragment {
    /// Byte offset of the opening fence
    pub start: usize,

    /// Byte offset just past the closing fence
    pub end: usize,

    /// Source between the fences
    pub source: String,

    /// 1-based line of the opening fence
    pub line: usize,
}

/// Outcome of executing one fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Trimmed captured output (`None` when nothing was printed)
    pub stdout: Option<String>,

    /// Literal artifact path found in the fragment source
    pub artifact: Option<String>,

    /// Fault description when execution raised
    pub fault: Option<String>,
}

impl ExecutionResult {
    /// True when the fragment produced nothing worth a region.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_none() && self.artifact.is_none() && self.fault.is_none()
    }

    pub fn succeeded(&self) -> bool {
        self.fault.is_none()
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Per-document statistics for one processing pass.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub fragments: usize,
    pub executed: usize,
    pub with_stdout: usize,
    pub with_figures: usize,
    /// Whether the rewritten text differs from what was on disk
    pub changed: bool,
    pub hash_before: String,
    pub hash_after: String,
}

impl DocumentReport {
    pub fn faults(&self) -> usize {
        self.fragments - self.executed
    }
}

// ============================================================================
// Configuration (docweave.yaml)
// ============================================================================

/// Project configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaveConfig {
    /// Root searched in batch mode
    #[serde(default = "default_content_root")]
    pub content_root: PathBuf,

    /// File name matched in batch mode
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Fence tag marking executable fragments
    #[serde(default = "default_language")]
    pub language: String,

    /// Loop iteration budget per fragment (unbounded when unset)
    #[serde(default)]
    pub loop_limit: Option<u64>,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            content_root: default_content_root(),
            file_name: default_file_name(),
            language: default_language(),
            loop_limit: None,
        }
    }
}

fn default_content_root() -> PathBuf {
    PathBuf::from("content/chapters")
}

fn default_file_name() -> String {
    "index.qmd".to_string()
}

fn default_language() -> String {
    "javascript".to_string()
}
