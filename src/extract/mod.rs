//! Multi-strategy article text extraction
//!
//! Given a canonical URL, the [`ExtractionChain`] tries parsers in a
//! fixed priority order until one yields text meeting the configured
//! minimum length:
//!
//! 1. [`StructuredStrategy`]: Open Graph / meta / `<article>` markup
//! 2. [`HeuristicStrategy`]: ordered structural selectors plus
//!    paragraph concatenation fallbacks
//! 3. [`DensityStrategy`]: readability-style text-density scoring
//!
//! Each strategy attempt fetches the page through the shared
//! [`PageFetcher`], so every attempt is independently rate-limited and
//! retry-wrapped. A mandatory pause separates successive strategies
//! against the same URL.

pub mod density;
pub mod heuristic;
pub mod sanitize;
pub mod selectors;
pub mod structured;

pub use density::DensityStrategy;
pub use heuristic::HeuristicStrategy;
pub use structured::StructuredStrategy;

use crate::config::Config;
use crate::fetch::PageFetcher;
use crate::models::Extracted;
use crate::utils::error::ExtractError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sanitize::sanitize_text;
use scraper::ElementRef;
use selectors::NOISE_TAGS;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// One heuristic approach to pulling clean article text out of markup
///
/// Implementations are pure parsers; the chain owns fetching. A strategy
/// reports [`ExtractError::Insufficient`] when it found text below the
/// minimum length and [`ExtractError::NoContent`] when it found nothing.
pub trait ExtractStrategy: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Parse fetched markup into an extraction result
    fn extract(&self, base_url: &Url, html: &str) -> Result<Extracted, ExtractError>;
}

/// Progress of one chain invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    NotTried,
    /// Trying the strategy at this index
    Attempting(usize),
    Success,
    /// All strategies failed or fell short
    Exhausted,
}

/// Outcome of running the chain against one URL
#[derive(Debug)]
pub enum ChainOutcome {
    /// A strategy met the minimum-content threshold
    Extracted(Extracted),
    /// Terminal state: the caller keeps the record without text and the
    /// record is filtered out before translation
    Exhausted,
}

/// Ordered fallback chain over extraction strategies
pub struct ExtractionChain {
    fetcher: Arc<PageFetcher>,
    strategies: Vec<Box<dyn ExtractStrategy>>,
    pause: Duration,
}

impl ExtractionChain {
    /// Build the default chain from configuration
    pub fn new(config: &Config, fetcher: Arc<PageFetcher>) -> Self {
        let min_len = config.limits.min_article_length;
        let strategies: Vec<Box<dyn ExtractStrategy>> = vec![
            Box::new(StructuredStrategy::new(min_len)),
            Box::new(HeuristicStrategy::new(min_len)),
            Box::new(DensityStrategy::new(min_len)),
        ];
        Self {
            fetcher,
            strategies,
            pause: Duration::from_millis(config.scraper.strategy_pause_ms),
        }
    }

    /// Build a chain with custom strategies (used by tests)
    pub fn with_strategies(
        fetcher: Arc<PageFetcher>,
        strategies: Vec<Box<dyn ExtractStrategy>>,
        pause: Duration,
    ) -> Self {
        Self {
            fetcher,
            strategies,
            pause,
        }
    }

    /// Run the chain against one URL.
    ///
    /// Moves to the next strategy only when the current one returned no
    /// result or text shorter than the minimum. Never errors: exhaustion
    /// is a normal outcome the caller handles by dropping the record
    /// before translation.
    pub async fn run(&self, url: &str) -> ChainOutcome {
        let base_url = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                warn!(url = %url, error = %e, "Unparseable URL, skipping extraction");
                return ChainOutcome::Exhausted;
            }
        };

        let mut state = ChainState::NotTried;

        for (index, strategy) in self.strategies.iter().enumerate() {
            if !matches!(state, ChainState::NotTried) {
                // Pause between strategy attempts against the same host
                // to avoid tripping anti-scraping defenses.
                tokio::time::sleep(self.pause).await;
            }
            state = ChainState::Attempting(index);
            debug!(url = %url, state = ?state, strategy = strategy.name(), "Attempting extraction");

            let html = match self.fetcher.fetch_page(url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(url = %url, strategy = strategy.name(), error = %e, "Fetch failed");
                    continue;
                }
            };

            match strategy.extract(&base_url, &html) {
                Ok(extracted) => {
                    info!(
                        url = %url,
                        strategy = strategy.name(),
                        chars = extracted.text.chars().count(),
                        "Extraction succeeded"
                    );
                    return ChainOutcome::Extracted(extracted);
                }
                Err(e) => {
                    debug!(url = %url, strategy = strategy.name(), reason = %e, "Strategy fell through");
                }
            }
        }

        warn!(url = %url, "All extraction strategies exhausted");
        ChainOutcome::Exhausted
    }
}

// ============================================================================
// Helpers shared by the strategies
// ============================================================================

/// Whether an element sits inside a non-content subtree (nav, footer, ...)
pub(crate) fn in_noise(el: ElementRef) -> bool {
    el.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| NOISE_TAGS.contains(&e.name()))
    })
}

/// Sanitized text content of an element
pub(crate) fn element_text(el: ElementRef) -> String {
    sanitize_text(&el.text().collect::<String>())
}

/// Sanitized text of every content paragraph under `scope`
pub(crate) fn collect_paragraphs(scope: ElementRef) -> Vec<String> {
    scope
        .select(&selectors::PARAGRAPH)
        .filter(|p| !in_noise(*p))
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Join paragraph texts into the flat article form
pub(crate) fn join_paragraphs(paragraphs: &[String]) -> String {
    paragraphs.join(" ")
}

/// Resolve a possibly-relative image URL against the page URL
pub(crate) fn resolve_image_url(base: &Url, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    base.join(src).ok().map(|u| u.to_string())
}

/// Parse common publish-timestamp formats into UTC
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%d",
    ];
    for format in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }

    None
}

/// Length gate every strategy applies before declaring success
pub(crate) fn check_length(text: &str, min: usize) -> Result<(), ExtractError> {
    let len = text.chars().count();
    if len == 0 {
        Err(ExtractError::NoContent)
    } else if len < min {
        Err(ExtractError::Insufficient { len, min })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_in_noise_detection() {
        let html = Html::parse_document(
            "<html><body><nav><p>menu</p></nav><article><p>story</p></article></body></html>",
        );
        let sel = Selector::parse("p").unwrap();
        let paragraphs: Vec<_> = html.select(&sel).collect();
        assert!(in_noise(paragraphs[0]));
        assert!(!in_noise(paragraphs[1]));
    }

    #[test]
    fn test_collect_paragraphs_skips_noise() {
        let html = Html::parse_document(
            "<html><body><footer><p>copyright</p></footer>\
             <article><p>First.</p><p>Second.</p></article></body></html>",
        );
        let root = html.root_element();
        let paragraphs = collect_paragraphs(root);
        assert_eq!(paragraphs, vec!["First.", "Second."]);
    }

    #[test]
    fn test_resolve_image_url() {
        let base = Url::parse("https://example.com/news/story.html").unwrap();
        assert_eq!(
            resolve_image_url(&base, "/img/top.jpg").unwrap(),
            "https://example.com/img/top.jpg"
        );
        assert_eq!(
            resolve_image_url(&base, "https://cdn.example.com/a.png").unwrap(),
            "https://cdn.example.com/a.png"
        );
        assert!(resolve_image_url(&base, "").is_none());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-12-25T15:45:00+09:00").is_some());
        assert!(parse_timestamp("Wed, 25 Dec 2024 15:45:00 GMT").is_some());
        assert!(parse_timestamp("2024-12-25 15:45:00").is_some());
        assert!(parse_timestamp("2024-12-25").is_some());
        assert!(parse_timestamp("next tuesday").is_none());
    }

    #[test]
    fn test_check_length_gate() {
        assert!(matches!(check_length("", 10), Err(ExtractError::NoContent)));
        assert!(matches!(
            check_length("short", 10),
            Err(ExtractError::Insufficient { len: 5, min: 10 })
        ));
        assert!(check_length("long enough", 10).is_ok());
    }
}
