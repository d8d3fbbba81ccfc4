//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the pipeline.

pub mod error;
pub mod retry;
pub mod throttle;

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed = Url::parse(url).context("Invalid URL")?;

    parsed
        .host_str()
        .map(|s| s.to_string())
        .context("No host in URL")
}

/// Truncate text to a maximum length, on a char boundary
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// First `n` characters of a string, char-boundary safe
pub fn char_prefix(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}
