//! DW-005: Document rewriter — strip stale regions, splice fresh ones.
//!
//! A region is inserted as `"\n\n" + START + "\n" + parts + "\n" + END`
//! directly after a fragment's closing fence. Sentinels only count when they
//! fill a whole line, and rendered parts never contain such a line, so
//! strip(splice(base)) == base and repeated runs are byte-identical.

use super::types::{CodeFragment, ExecutionResult, OUTPUT_END, OUTPUT_START};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

fn region_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(
            r"(?ms)(?:\n\n)?^{}\r?$.*?^{}\r?$",
            regex::escape(OUTPUT_START),
            regex::escape(OUTPUT_END)
        );
        Regex::new(&pattern).expect("sentinel pattern is valid")
    })
}

fn start_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(r"(?m)^{}\r?$", regex::escape(OUTPUT_START));
        Regex::new(&pattern).expect("start sentinel pattern is valid")
    })
}

/// Remove every generated region. Fails on a start sentinel with no end.
pub fn strip(text: &str) -> Result<String, String> {
    let stripped = region_pattern().replace_all(text, "").into_owned();
    if let Some(m) = start_line_pattern().find(&stripped) {
        let line = stripped[..m.start()].matches('\n').count() + 1;
        return Err(format!(
            "unterminated generated region: {} on line {} has no {}",
            OUTPUT_START, line, OUTPUT_END
        ));
    }
    Ok(stripped)
}

fn is_sentinel_line(line: &str) -> bool {
    let line = line.strip_suffix('\r').unwrap_or(line);
    line == OUTPUT_START || line == OUTPUT_END
}

/// Indent any line that would read as a sentinel by one space.
fn neutralize_sentinels(text: &str) -> Cow<'_, str> {
    if !text.split('\n').any(is_sentinel_line) {
        return Cow::Borrowed(text);
    }
    let lines: Vec<Cow<'_, str>> = text
        .split('\n')
        .map(|line| {
            if is_sentinel_line(line) {
                Cow::Owned(format!(" {}", line))
            } else {
                Cow::Borrowed(line)
            }
        })
        .collect();
    Cow::Owned(lines.join("\n"))
}

/// Splice one region per non-empty result, last fragment first.
///
/// `fragments` and `results` must be pairwise aligned and in document order;
/// offsets are never re-derived from the growing text.
pub fn splice(base: &str, fragments: &[CodeFragment], results: &[ExecutionResult]) -> String {
    let mut text = base.to_string();
    for (fragment, result) in fragments.iter().zip(results).rev() {
        if let Some(region) = render_region(result) {
            text.insert_str(fragment.end, &region);
        }
    }
    text
}

/// Render the region for one result, or `None` when there is nothing to show.
pub fn render_region(result: &ExecutionResult) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(ref stdout) = result.stdout {
        parts.push(format!("```\n{}\n```", neutralize_sentinels(stdout)));
    }
    if let Some(ref path) = result.artifact {
        parts.push(format!("\n![{}]({})", figure_caption(path), path));
    }
    if let Some(ref fault) = result.fault {
        parts.push(format!(
            "```\n[Execution Error]\n{}\n```",
            neutralize_sentinels(fault)
        ));
    }

    if parts.is_empty() {
        return None;
    }
    Some(format!(
        "\n\n{}\n{}\n{}",
        OUTPUT_START,
        parts.join("\n"),
        OUTPUT_END
    ))
}

/// Caption for a figure: file stem, underscores as spaces, title-cased.
pub fn figure_caption(path: &str) -> String {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let stem = match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    };
    title_case(&stem.replace('_', " "))
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
