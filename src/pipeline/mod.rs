//! Run orchestration: entries in, translated articles out
//!
//! The [`Pipeline`] drives one acquisition run over a batch of feed
//! entries. Each entry is resolved to its canonical URL, claimed
//! against the dedup set, and pushed through the extraction chain; the
//! surviving articles are then translated sequentially. Concurrency is
//! bounded, every item carries its own wall-clock budget, and the whole
//! batch runs under a deadline that abandons stragglers rather than
//! discarding finished work.
//!
//! Partial loss is normal here. The run only errors on
//! misconfiguration; everything else is reported as counters in the
//! [`RunReport`].

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{ChainOutcome, ExtractionChain};
use crate::fetch::PageFetcher;
use crate::models::{Article, RawEntry, RunReport};
use crate::resolver::UrlResolver;
use crate::translate::Translator;
use crate::utils::extract_domain;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Thread-safe set of claimed canonical URLs
///
/// Claiming is first-wins: the task that inserts the URL owns the item,
/// concurrent resolvers of the same article lose the claim and skip.
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: Mutex<HashSet<String>>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a URL. Returns true exactly once per distinct URL.
    pub fn claim(&self, url: &str) -> bool {
        match self.seen.lock() {
            Ok(mut seen) => seen.insert(url.to_string()),
            // A poisoned lock means a claimant panicked; treat the URL
            // as taken so we never double-process.
            Err(_) => false,
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.lock().map(|s| s.contains(url)).unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What one scheduled item produced
enum ItemOutcome {
    /// Extraction met the threshold
    Fetched(Box<Article>),
    /// Every strategy failed or fell short
    Exhausted,
    /// Canonical URL was already claimed by another task
    Duplicate,
    /// Per-item wall-clock budget expired
    TimedOut,
}

pub struct Pipeline {
    config: Config,
    resolver: UrlResolver,
    chain: ExtractionChain,
    translator: Translator,
    dedup: DedupSet,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline from configuration.
    ///
    /// The resolver shares the fetcher's throttle, so redirect-following
    /// and page fetches draw from the same global scrape budget.
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        let fetcher = std::sync::Arc::new(PageFetcher::new(&config)?);
        let resolver = UrlResolver::new(&config, fetcher.throttle())?;
        let chain = ExtractionChain::new(&config, fetcher);
        let translator = Translator::new(&config)?;

        Ok(Self {
            config,
            resolver,
            chain,
            translator,
            dedup: DedupSet::new(),
        })
    }

    /// Build a pipeline from pre-built components (used by tests to
    /// point the fetcher and translator at local mock servers)
    pub fn with_components(
        config: Config,
        resolver: UrlResolver,
        chain: ExtractionChain,
        translator: Translator,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            config,
            resolver,
            chain,
            translator,
            dedup: DedupSet::new(),
        })
    }

    /// Process one batch of feed entries.
    ///
    /// Returns the articles that cleared extraction, translated as far
    /// as the translation service allowed, plus the run's counters.
    /// Errors only on invalid configuration; item-level failures are
    /// absorbed into the report.
    pub async fn run(&self, entries: Vec<RawEntry>) -> Result<(Vec<Article>, RunReport)> {
        let mut report = RunReport {
            entries_seen: entries.len() as u64,
            ..Default::default()
        };

        // Cap the batch before any network work happens.
        let mut entries = entries;
        let cap = self.config.limits.max_articles_per_run;
        if entries.len() > cap {
            info!(
                entries = entries.len(),
                cap, "Truncating batch to per-run limit"
            );
            entries.truncate(cap);
        }

        // Claim source links up front so repeated feed entries never
        // reach the network.
        let mut scheduled = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.dedup.claim(&entry.link) {
                scheduled.push(entry);
            } else {
                debug!(url = %entry.link, "Duplicate feed entry skipped");
                report.duplicates_skipped += 1;
            }
        }

        let scheduled_count = scheduled.len();
        info!(items = scheduled_count, "Starting acquisition batch");

        let mut tasks = stream::iter(
            scheduled
                .into_iter()
                .map(|entry| self.process_entry(entry)),
        )
        .buffer_unordered(self.config.scraper.concurrency);

        let deadline = tokio::time::sleep(self.config.batch_deadline());
        tokio::pin!(deadline);

        let mut articles = Vec::new();
        let mut completed = 0usize;
        loop {
            tokio::select! {
                outcome = tasks.next() => match outcome {
                    Some(outcome) => {
                        completed += 1;
                        match outcome {
                            ItemOutcome::Fetched(article) => {
                                report.with_content += 1;
                                articles.push(*article);
                            }
                            ItemOutcome::Exhausted => report.exhausted += 1,
                            ItemOutcome::Duplicate => report.duplicates_skipped += 1,
                            ItemOutcome::TimedOut => report.abandoned += 1,
                        }
                    }
                    None => break,
                },
                _ = &mut deadline => {
                    let remaining = scheduled_count - completed;
                    warn!(remaining, "Batch deadline reached, abandoning unfinished items");
                    report.abandoned += remaining as u64;
                    break;
                }
            }
        }

        info!(
            with_content = report.with_content,
            exhausted = report.exhausted,
            duplicates = report.duplicates_skipped,
            abandoned = report.abandoned,
            "Acquisition complete, starting translation"
        );

        let stats = self.translator.translate_batch(&mut articles).await;
        report.titles_translated = stats.titles_translated;
        report.texts_translated = stats.texts_translated;
        report.fully_translated = stats.fully_translated;

        Ok((articles, report))
    }

    /// Resolve, claim, and extract one entry under its wall-clock budget
    async fn process_entry(&self, entry: RawEntry) -> ItemOutcome {
        match tokio::time::timeout(self.config.per_item_timeout(), self.process_inner(&entry))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(url = %entry.link, "Item timed out, abandoning");
                ItemOutcome::TimedOut
            }
        }
    }

    async fn process_inner(&self, entry: &RawEntry) -> ItemOutcome {
        let canonical = self.resolver.resolve(&entry.link).await;
        debug!(
            domain = %extract_domain(&canonical).unwrap_or_default(),
            "Processing entry"
        );

        // Distinct feed links can resolve to the same article; only the
        // first claimant proceeds. The canonical form may equal the
        // source link we already claimed, which insert() tolerates.
        if canonical != entry.link && !self.dedup.claim(&canonical) {
            debug!(url = %canonical, "Canonical URL already claimed");
            return ItemOutcome::Duplicate;
        }

        let mut article = Article::from_entry(entry);
        article.canonical_url = canonical.clone();

        match self.chain.run(&canonical).await {
            ChainOutcome::Extracted(extracted) => {
                article.merge_extracted(extracted);
                ItemOutcome::Fetched(Box::new(article))
            }
            ChainOutcome::Exhausted => ItemOutcome::Exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_claim_is_first_wins() {
        let dedup = DedupSet::new();
        assert!(dedup.claim("https://example.com/a"));
        assert!(!dedup.claim("https://example.com/a"));
        assert!(dedup.claim("https://example.com/b"));
        assert_eq!(dedup.len(), 2);
        assert!(dedup.contains("https://example.com/a"));
        assert!(!dedup.contains("https://example.com/c"));
    }

    #[test]
    fn test_pipeline_rejects_invalid_config() {
        let mut config = Config::default();
        config.scraper.concurrency = 0;
        let err = Pipeline::new(config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
