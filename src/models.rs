// Core data structures for the kaatru pipeline

use crate::utils::normalize_whitespace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw entry as handed over by the feed/search collaborator
///
/// The pipeline never fetches feeds itself; it consumes this shape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    pub published: Option<String>,
    pub description: String,
    pub source: String,
}

impl RawEntry {
    /// Build an entry from an aggregator-style headline of the form
    /// "Some headline - Publisher", splitting the publisher suffix off
    /// into the source label. Titles without the suffix pass through.
    pub fn from_aggregator_title(
        title: &str,
        link: impl Into<String>,
        published: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        let (title, source) = split_source_suffix(&normalize_whitespace(title));
        Self {
            title,
            link: link.into(),
            published,
            description: description.into(),
            source,
        }
    }
}

/// Split a "Title - Source" aggregator headline into (title, source).
///
/// The suffix after the last " - " is the publisher label; everything
/// before it (including earlier " - " separators) is the title.
pub fn split_source_suffix(title: &str) -> (String, String) {
    match title.rsplit_once(" - ") {
        Some((head, tail)) if !head.is_empty() => (head.to_string(), tail.trim().to_string()),
        _ => (title.to_string(), String::new()),
    }
}

/// Transient result produced by a single extraction strategy attempt
///
/// Never persisted directly; merged into an [`Article`] only when the
/// strategy met the minimum-content threshold.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub title: String,
    pub text: String,
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub top_image: Option<String>,
    pub summary: String,
    pub keywords: Vec<String>,
}

/// Normalized article record, the central entity of the pipeline
///
/// `canonical_url` is the unique identity key the storage collaborator
/// upserts on. `text` is only populated when its length meets the
/// configured minimum; `translated_text` is only set after `text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// URL as seen in the feed entry (may be an indirect link)
    pub source_url: String,

    /// Resolved canonical URL; dedup and storage identity key
    pub canonical_url: String,

    pub title: String,
    pub text: Option<String>,
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub top_image: Option<String>,
    pub summary: String,
    pub keywords: Vec<String>,
    pub source: String,
    pub description: String,

    pub translated_title: Option<String>,
    pub translated_text: Option<String>,

    /// When the pipeline fetched this article
    pub fetched_at: DateTime<Utc>,

    /// SHA-256 of the extracted text, for idempotent storage upserts
    pub content_hash: Option<String>,
}

impl Article {
    /// Create a record from a feed entry. The canonical URL starts out
    /// equal to the source URL until the resolver improves it.
    pub fn from_entry(entry: &RawEntry) -> Self {
        Self {
            source_url: entry.link.clone(),
            canonical_url: entry.link.clone(),
            title: entry.title.clone(),
            text: None,
            authors: Vec::new(),
            published_at: None,
            top_image: None,
            summary: String::new(),
            keywords: Vec::new(),
            source: entry.source.clone(),
            description: entry.description.clone(),
            translated_title: None,
            translated_text: None,
            fetched_at: Utc::now(),
            content_hash: None,
        }
    }

    /// Merge a successful extraction into the record.
    ///
    /// The extracted title only replaces the feed title when it is
    /// strictly longer (longer titles are less likely to be truncated).
    pub fn merge_extracted(&mut self, extracted: Extracted) {
        if !extracted.title.is_empty()
            && extracted.title.chars().count() > self.title.chars().count()
        {
            self.title = extracted.title;
        }

        self.content_hash = Some(content_hash(&extracted.text));
        self.text = Some(extracted.text);

        if !extracted.authors.is_empty() {
            self.authors = extracted.authors;
        }
        if extracted.published_at.is_some() {
            self.published_at = extracted.published_at;
        }
        if extracted.top_image.is_some() {
            self.top_image = extracted.top_image;
        }
        if !extracted.summary.is_empty() {
            self.summary = extracted.summary;
        }
        if !extracted.keywords.is_empty() {
            self.keywords = extracted.keywords;
        }
    }

    /// Whether the record carries extracted text of at least `min_len` chars
    pub fn has_content(&self, min_len: usize) -> bool {
        self.text
            .as_ref()
            .is_some_and(|t| t.chars().count() >= min_len)
    }
}

/// Compute the SHA-256 hex digest of extracted text
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Outcome counters for one pipeline run
///
/// The pipeline reports counts rather than failing on partial loss; the
/// caller can always persist whatever was produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Entries received from the feed collaborator
    pub entries_seen: u64,

    /// Entries skipped because their canonical URL was already claimed
    pub duplicates_skipped: u64,

    /// Items whose extraction chain produced sufficient text
    pub with_content: u64,

    /// Items abandoned by the per-item timeout or batch deadline
    pub abandoned: u64,

    /// Items where every strategy failed or fell short
    pub exhausted: u64,

    /// Articles with a translated title
    pub titles_translated: u64,

    /// Articles with translated text
    pub texts_translated: u64,

    /// Articles with both title and text translated
    pub fully_translated: u64,
}
