//! DW-008: Executor — per-document pass and batch orchestration.
//!
//! Per document: read → strip → scan → environment → (workdir) execute each
//! fragment → (restore) → splice → write if changed.
//! Documents run one at a time; a failing document never stops the batch.

use super::capture;
use super::error::{WeaveError, WeaveResult};
use super::hasher;
use super::rewriter;
use super::scanner::Scanner;
use super::types::{CodeFragment, DocumentReport, ExecutionResult};
use crate::runtime::workdir::{self, WorkdirGuard};
use crate::runtime::Evaluator;
use std::path::{Path, PathBuf};

/// Settings shared by every document of a run.
pub struct RunConfig<'a, E: Evaluator> {
    pub scanner: &'a Scanner,
    pub evaluator: &'a E,
    /// Persist rewritten text (false for check runs)
    pub write: bool,
}

/// Totals for a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    pub changed: usize,
}

/// Process one document end to end.
pub fn process_document<E: Evaluator>(
    cfg: &RunConfig<'_, E>,
    path: &Path,
) -> WeaveResult<DocumentReport> {
    let original = std::fs::read_to_string(path)
        .map_err(|e| WeaveError::persistence(path, format!("cannot read: {}", e)))?;
    let base = rewriter::strip(&original).map_err(|e| WeaveError::rewrite(path, e))?;

    let fragments = cfg.scanner.scan(&base);
    tracing::debug!(path = %path.display(), fragments = fragments.len(), "scanned document");

    let results = if fragments.is_empty() {
        Vec::new()
    } else {
        execute_all(cfg.evaluator, path, &fragments)?
    };

    let rewritten = rewriter::splice(&base, &fragments, &results);
    let hash_before = hasher::hash_string(&original);
    let hash_after = hasher::hash_string(&rewritten);
    let changed = hash_before != hash_after;

    if changed && cfg.write {
        write_atomic(path, &rewritten)?;
    }

    Ok(DocumentReport {
        path: path.to_path_buf(),
        fragments: fragments.len(),
        executed: results.iter().filter(|r| r.succeeded()).count(),
        with_stdout: results.iter().filter(|r| r.stdout.is_some()).count(),
        with_figures: results.iter().filter(|r| r.artifact.is_some()).count(),
        changed,
        hash_before,
        hash_after,
    })
}

/// Atomic write: temp file next to the document + rename.
fn write_atomic(path: &Path, text: &str) -> WeaveResult<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.docweave.tmp", name));
    std::fs::write(&tmp_path, text).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        WeaveError::persistence(path, format!("cannot write {}: {}", tmp_path.display(), e))
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        WeaveError::persistence(path, format!("cannot rename {}: {}", tmp_path.display(), e))
    })
}

/// Run every fragment in order against one fresh environment, inside the
/// document's directory. The environment is dropped before returning.
fn execute_all<E: Evaluator>(
    evaluator: &E,
    path: &Path,
    fragments: &[CodeFragment],
) -> WeaveResult<Vec<ExecutionResult>> {
    let origin = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let mut env = evaluator.environment()?;
    let _workdir = WorkdirGuard::enter(workdir::document_dir(path)).map_err(|e| {
        WeaveError::persistence(path, format!("cannot enter document directory: {}", e))
    })?;

    let results = fragments
        .iter()
        .map(|fragment| capture::run_fragment(evaluator, &mut env, fragment, &origin))
        .collect();
    Ok(results)
}

/// Find every `file_name` under `root` whose text holds a fragment marker.
///
/// Unreadable candidates are kept so that processing reports them.
pub fn discover(root: &Path, file_name: &str, scanner: &Scanner) -> WeaveResult<Vec<PathBuf>> {
    let root_str = root
        .to_str()
        .ok_or_else(|| WeaveError::Config(format!("content root is not UTF-8: {}", root.display())))?;
    let pattern = format!(
        "{}/**/{}",
        glob::Pattern::escape(root_str.trim_end_matches('/')),
        glob::Pattern::escape(file_name)
    );
    let entries = glob::glob(&pattern)
        .map_err(|e| WeaveError::Config(format!("bad discovery pattern {}: {}", pattern, e)))?;

    let mut found = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("skipping unreadable path during discovery: {}", e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) if scanner.contains_marker(&text) => found.push(path),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), "cannot read candidate: {}", e);
                found.push(path);
            }
        }
    }
    found.sort();
    tracing::debug!(root = %root.display(), documents = found.len(), "discovery complete");
    Ok(found)
}

/// Process documents one at a time. `on_done` sees every outcome in order.
pub fn run_batch<E, F>(cfg: &RunConfig<'_, E>, paths: &[PathBuf], mut on_done: F) -> BatchSummary
where
    E: Evaluator,
    F: FnMut(&Path, &WeaveResult<DocumentReport>),
{
    let mut summary = BatchSummary::default();
    for path in paths {
        let outcome = process_document(cfg, path);
        match &outcome {
            Ok(report) => {
                summary.processed += 1;
                if report.changed {
                    summary.changed += 1;
                }
            }
            Err(e) => {
                summary.failed += 1;
                tracing::debug!(path = %path.display(), "document failed: {}", e);
            }
        }
        on_done(path, &outcome);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::js::JsEvaluator;

    fn js_scanner() -> Scanner {
        Scanner::new("javascript").unwrap()
    }

    fn write_doc(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, body).unwrap();
        path
    }

    fn run(path: &Path) -> WeaveResult<DocumentReport> {
        let scanner = js_scanner();
        let evaluator = JsEvaluator::default();
        let cfg = RunConfig {
            scanner: &scanner,
            evaluator: &evaluator,
            write: true,
        };
        process_document(&cfg, path)
    }

    const CHAINED: &str = "# Doc\n\n```javascript\nx = 2\n```\n\nThen:\n\n```javascript\nprint(x + 3)\n```\n";

    #[test]
    fn test_dw008_state_chains_within_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(dir.path(), "index.qmd", CHAINED);
        let report = run(&path).unwrap();
        assert_eq!(report.fragments, 2);
        assert_eq!(report.executed, 2);
        assert_eq!(report.with_stdout, 1);
        assert!(report.changed);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(
            "```javascript\nprint(x + 3)\n```\n\n<!-- AUTO-OUTPUT-START -->\n```\n5\n```\n<!-- AUTO-OUTPUT-END -->\n"
        ));
    }

    #[test]
    fn test_dw008_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(dir.path(), "index.qmd", CHAINED);
        run(&path).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        let report = run(&path).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
        assert!(!report.changed);
        assert_eq!(second.matches("<!-- AUTO-OUTPUT-START -->").count(), 1);
    }

    #[test]
    fn test_dw008_regions_follow_their_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let body = "```javascript\nprint('one')\n```\nA\n```javascript\nprint('two')\n```\nB\n```javascript\nprint('three')\n```\nC\n";
        let path = write_doc(dir.path(), "index.qmd", body);
        run(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let order: Vec<usize> = ["print('one')", "```\none\n```", "\nA\n", "print('two')", "```\ntwo\n```", "\nB\n", "print('three')", "```\nthree\n```", "\nC\n"]
            .iter()
            .map(|needle| text.find(needle).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn test_dw008_fault_isolation() {
        let dir = tempfile::tempdir().unwrap();
        let body = "```javascript\nprint('first')\n```\n\n```javascript\nprint('partial'); undefinedFn()\n```\n\n```javascript\nprint('third')\n```\n";
        let path = write_doc(dir.path(), "index.qmd", body);
        let report = run(&path).unwrap();
        assert_eq!(report.fragments, 3);
        assert_eq!(report.executed, 2);
        assert_eq!(report.with_stdout, 3);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("```\nfirst\n```"));
        assert!(text.contains("```\nthird\n```"));
        assert!(text.contains("```\npartial\n```\n```\n[Execution Error]\nError executing code block:\n"));
        assert!(text.contains("undefinedFn"));
        assert!(text.contains("at index.qmd:5"));
    }

    #[test]
    fn test_dw008_figure_reference() {
        let dir = tempfile::tempdir().unwrap();
        let body = "```javascript\nplt.show()\nplt.savefig(\"plot.png\")\n```\n";
        let path = write_doc(dir.path(), "index.qmd", body);
        let report = run(&path).unwrap();
        assert_eq!(report.with_figures, 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<!-- AUTO-OUTPUT-START -->\n\n![Plot](plot.png)\n<!-- AUTO-OUTPUT-END -->"));
    }

    #[test]
    fn test_dw008_relative_artifacts_land_next_to_document() {
        let dir = tempfile::tempdir().unwrap();
        let body = "```javascript\nwriteFile('data.txt', 'saved')\n```\n";
        let path = write_doc(dir.path(), "chapter/index.qmd", body);
        run(&path).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("chapter/data.txt")).unwrap(),
            "saved"
        );
    }

    #[test]
    fn test_dw008_zero_fragments_strips_stale_output() {
        let dir = tempfile::tempdir().unwrap();
        let body = "text\n\n<!-- AUTO-OUTPUT-START -->\n```\nold\n```\n<!-- AUTO-OUTPUT-END -->\nmore\n";
        let path = write_doc(dir.path(), "index.qmd", body);
        let report = run(&path).unwrap();
        assert_eq!(report.fragments, 0);
        assert!(report.changed);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "text\nmore\n");
    }

    #[test]
    fn test_dw008_unterminated_region_is_rewrite_error() {
        let dir = tempfile::tempdir().unwrap();
        let body = "```javascript\nprint(1)\n```\n\n<!-- AUTO-OUTPUT-START -->\ndangling\n";
        let path = write_doc(dir.path(), "index.qmd", body);
        let err = run(&path).unwrap_err();
        assert!(matches!(err, WeaveError::Rewrite { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), body);
    }

    #[test]
    fn test_dw008_missing_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&dir.path().join("ghost.qmd")).unwrap_err();
        assert!(matches!(err, WeaveError::Persistence { .. }));
    }

    #[test]
    fn test_dw008_check_mode_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(dir.path(), "index.qmd", CHAINED);
        let scanner = js_scanner();
        let evaluator = JsEvaluator::default();
        let cfg = RunConfig {
            scanner: &scanner,
            evaluator: &evaluator,
            write: false,
        };
        let report = process_document(&cfg, &path).unwrap();
        assert!(report.changed);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), CHAINED);
    }

    #[test]
    fn test_dw008_discover_filters_by_name_and_marker() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_doc(root, "b/index.qmd", "```javascript\nprint(1)\n```\n");
        write_doc(root, "a/index.qmd", "```javascript\nprint(2)\n```\n");
        write_doc(root, "c/index.qmd", "```{javascript}\nlive()\n```\n");
        write_doc(root, "d/notes.qmd", "```javascript\nprint(3)\n```\n");
        let found = discover(root, "index.qmd", &js_scanner()).unwrap();
        assert_eq!(found, vec![root.join("a/index.qmd"), root.join("b/index.qmd")]);
    }

    #[test]
    fn test_dw008_discover_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let found = discover(&dir.path().join("nope"), "index.qmd", &js_scanner()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_dw008_batch_isolates_environments() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let first = write_doc(root, "a/index.qmd", "```javascript\nx = 2\n```\n\n```javascript\nprint(typeof x)\n```\n");
        let second = write_doc(root, "b/index.qmd", "```javascript\nprint(typeof x)\n```\n");
        let paths = discover(root, "index.qmd", &js_scanner()).unwrap();
        assert_eq!(paths, vec![first.clone(), second.clone()]);

        let scanner = js_scanner();
        let evaluator = JsEvaluator::default();
        let cfg = RunConfig {
            scanner: &scanner,
            evaluator: &evaluator,
            write: true,
        };
        let mut seen = Vec::new();
        let summary = run_batch(&cfg, &paths, |path, outcome| {
            seen.push((path.to_path_buf(), outcome.is_ok()));
        });
        assert_eq!(summary, BatchSummary { processed: 2, failed: 0, changed: 2 });
        assert_eq!(seen, vec![(first.clone(), true), (second.clone(), true)]);

        assert!(std::fs::read_to_string(&first).unwrap().contains("```\nnumber\n```"));
        assert!(std::fs::read_to_string(&second).unwrap().contains("```\nundefined\n```"));
    }

    #[test]
    fn test_dw008_batch_continues_after_document_failure() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let broken = write_doc(root, "a/index.qmd", "```javascript\nprint(1)\n```\n<!-- AUTO-OUTPUT-START -->\n");
        let good = write_doc(root, "b/index.qmd", "```javascript\nprint('ok')\n```\n");
        let scanner = js_scanner();
        let evaluator = JsEvaluator::default();
        let cfg = RunConfig {
            scanner: &scanner,
            evaluator: &evaluator,
            write: true,
        };
        let summary = run_batch(&cfg, &[broken, good.clone()], |_, _| {});
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed, 1);
        assert!(std::fs::read_to_string(&good).unwrap().contains("```\nok\n```"));
    }

    #[test]
    fn test_dw008_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(dir.path(), "index.qmd", CHAINED);
        let report = run(&path).unwrap();
        assert!(report.changed);
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["index.qmd".to_string()]);
    }

    #[test]
    fn test_dw008_write_failure_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(dir.path(), "index.qmd", CHAINED);
        // A directory squatting on the temp name makes the write fail
        std::fs::create_dir(dir.path().join(".index.qmd.docweave.tmp")).unwrap();
        let err = run(&path).unwrap_err();
        assert!(matches!(err, WeaveError::Persistence { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), CHAINED);
    }

    #[test]
    fn test_dw008_quoted_sentinels_survive_reruns() {
        let dir = tempfile::tempdir().unwrap();
        let body = "Regions sit between `<!-- AUTO-OUTPUT-START -->` and `<!-- AUTO-OUTPUT-END -->` markers.\n\n```javascript\nprint('hi')\n```\n";
        let path = write_doc(dir.path(), "index.qmd", body);
        run(&path).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        assert!(first.starts_with("Regions sit between `<!-- AUTO-OUTPUT-START -->` and `<!-- AUTO-OUTPUT-END -->` markers."));
        let report = run(&path).unwrap();
        assert!(!report.changed);
    }

    #[test]
    fn test_dw008_fragment_holding_sentinel_string() {
        let dir = tempfile::tempdir().unwrap();
        let body = "```javascript\nconst marker = '<!-- AUTO-OUTPUT-START -->'\nprint(marker.length)\n```\n";
        let path = write_doc(dir.path(), "index.qmd", body);
        let report = run(&path).unwrap();
        assert_eq!(report.executed, 1);
        assert!(std::fs::read_to_string(&path).unwrap().contains("```\n26\n```"));
    }

    #[test]
    fn test_dw008_printed_sentinel_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let body = "```javascript\nprint('<!-- AUTO-OUTPUT-END -->')\n```\ntail\n";
        let path = write_doc(dir.path(), "index.qmd", body);
        run(&path).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        let report = run(&path).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
        assert!(!report.changed);
        assert!(second.ends_with("<!-- AUTO-OUTPUT-END -->\ntail\n"));
    }
}
