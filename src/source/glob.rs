//! Path glob matching for input discovery
//!
//! Only the wildcards the input layout needs are supported: `*` matches any
//! run of characters inside one path segment and `?` matches a single one.

use crate::error::{Error, Result};
use regex::Regex;

/// A compiled `/`-separated glob
#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob such as `song_data/*/*/*/*.json`
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim_matches('/');
        let mut expr = String::with_capacity(pattern.len() * 2 + 2);
        expr.push('^');
        for ch in pattern.chars() {
            match ch {
                '*' => expr.push_str("[^/]*"),
                '?' => expr.push_str("[^/]"),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr)
            .map_err(|e| Error::config(format!("Invalid glob '{pattern}': {e}")))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The glob text
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Leading segments that contain no wildcard, used as a listing prefix
    pub fn literal_prefix(&self) -> String {
        self.pattern
            .split('/')
            .take_while(|segment| !segment.contains(['*', '?']))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Check a relative key against the glob
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}
