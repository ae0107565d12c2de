//! Wildcard course patterns.
//!
//! A pattern is a plain string where `*` stands for any run of characters
//! (including none). Everything else matches itself, case-insensitively.
//! Matching is a substring test: `course/1` also matches `course/10`.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Characters that carry meaning in regex syntax and must be escaped.
const SPECIAL_CHARS: &str = ".+?^${}()|[]\\";

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern '{pattern}' could not be compiled: {source}")]
    Compile {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A wildcard pattern compiled once and matched many times.
#[derive(Debug, Clone)]
pub struct CoursePattern {
    source: String,
    regex: Regex,
}

impl CoursePattern {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(&translate(pattern))
            .case_insensitive(true)
            .build()
            .map_err(|source| PatternError::Compile {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Translate a wildcard pattern into an (unanchored) regular expression.
pub fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    for ch in pattern.chars() {
        if ch == '*' {
            out.push_str(".*");
        } else if SPECIAL_CHARS.contains(ch) {
            out.push('\\');
            out.push(ch);
        } else {
            out.push(ch);
        }
    }
    out
}

/// One-shot match of `url` against a wildcard `pattern`.
///
/// Prefer [`CoursePattern`] when the same pattern is tested repeatedly.
pub fn matches(url: &str, pattern: &str) -> bool {
    match CoursePattern::compile(pattern) {
        Ok(compiled) => compiled.is_match(url),
        Err(_) => false,
    }
}
