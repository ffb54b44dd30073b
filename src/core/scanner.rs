//! DW-004: Fragment scanner.
//!
//! Matches only the plain fence form ```` ```<lang> ```` followed by a newline.
//! The brace-annotated live form ```` ```{<lang>} ```` is left alone.

use super::types::CodeFragment;
use regex::Regex;

/// Fragment scanner for one fence tag.
#[derive(Debug, Clone)]
pub struct Scanner {
    marker: String,
    pattern: Regex,
}

impl Scanner {
    /// Build the scanner for a fence tag such as `javascript`.
    pub fn new(language: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"(?s)```{}\r?\n(.*?)```", regex::escape(language)))?;
        Ok(Self {
            marker: format!("```{}", language),
            pattern,
        })
    }

    /// Find all fragments in document order. Offsets refer to `text`.
    pub fn scan(&self, text: &str) -> Vec<CodeFragment> {
        let mut fragments = Vec::new();
        let mut line = 1;
        let mut counted_to = 0;

        for caps in self.pattern.captures_iter(text) {
            let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            line += text[counted_to..whole.start()].matches('\n').count();
            counted_to = whole.start();
            fragments.push(CodeFragment {
                start: whole.start(),
                end: whole.end(),
                source: body.as_str().to_string(),
                line,
            });
        }

        fragments
    }

    /// True when `text` holds at least one opening marker.
    pub fn contains_marker(&self, text: &str) -> bool {
        text.contains(&self.marker)
    }
}
