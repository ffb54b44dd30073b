//! DW-006: Output capture — run one fragment with stdout redirected.
//!
//! Redirection is a thread-local stack of buffers. [`StdoutCapture`] pushes
//! a buffer and pops it on drop, so a fault or panic inside the evaluator
//! never leaves output redirected. With no capture active, [`emit`] writes
//! to the real stdout.

use super::types::{CodeFragment, ExecutionResult};
use crate::runtime::Evaluator;
use regex::Regex;
use std::cell::RefCell;
use std::io::Write;
use std::sync::OnceLock;

thread_local! {
    static BUFFERS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Active stdout redirection for the current thread.
pub struct StdoutCapture {
    depth: usize,
}

impl StdoutCapture {
    /// Start capturing. Nested captures shadow outer ones until dropped.
    pub fn begin() -> Self {
        let depth = BUFFERS.with(|b| {
            let mut b = b.borrow_mut();
            b.push(String::new());
            b.len()
        });
        Self { depth }
    }

    /// Everything written since [`begin`](Self::begin).
    pub fn contents(&self) -> String {
        BUFFERS.with(|b| b.borrow().get(self.depth - 1).cloned().unwrap_or_default())
    }
}

impl Drop for StdoutCapture {
    fn drop(&mut self) {
        BUFFERS.with(|b| b.borrow_mut().truncate(self.depth - 1));
    }
}

/// Write text to the innermost capture, or to stdout when none is active.
pub fn emit(text: &str) {
    let captured = BUFFERS.with(|b| match b.borrow_mut().last_mut() {
        Some(top) => {
            top.push_str(text);
            true
        }
        None => false,
    });
    if !captured {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
    }
}

pub fn emit_line(line: &str) {
    emit(&format!("{}\n", line));
}

fn savefig_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"plt\.savefig\(['"]([^'"]+)['"]"#).expect("savefig pattern is valid")
    })
}

/// Extract the literal path of the first `plt.savefig('...')` call.
///
/// Lexical heuristic: paths built at runtime are not detected.
pub fn savefig_path(source: &str) -> Option<String> {
    savefig_pattern()
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Execute one fragment and collect its result. Never fails: faults are data.
///
/// `origin` names the document in fault locations.
pub fn run_fragment<E: Evaluator>(
    evaluator: &E,
    env: &mut E::Environment,
    fragment: &CodeFragment,
    origin: &str,
) -> ExecutionResult {
    let capture = StdoutCapture::begin();
    let outcome = evaluator.execute(env, &fragment.source);
    let raw = capture.contents();
    drop(capture);

    let trimmed = raw.trim();
    let stdout = (!trimmed.is_empty()).then(|| trimmed.to_string());

    match outcome {
        Ok(()) => ExecutionResult {
            stdout,
            artifact: savefig_path(&fragment.source),
            fault: None,
        },
        Err(description) => {
            tracing::warn!(
                document = origin,
                line = fragment.line,
                "fragment raised: {}",
                description
            );
            // Source line n sits n lines below the opening fence
            let location = match evaluator.fault_position(&description) {
                Some((line, column)) => format!("{}:{}:{}", origin, fragment.line + line, column),
                None => format!("{}:{}", origin, fragment.line),
            };
            ExecutionResult {
                stdout,
                artifact: None,
                fault: Some(format!(
                    "Error executing code block:\n{}\n    at {}",
                    description, location
                )),
            }
        }
    }
}
