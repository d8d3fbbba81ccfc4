//! Rate-limited, cached machine translation
//!
//! Talks to the unauthenticated `gtx` web endpoint, which tolerates
//! modest request rates but throttles and eventually blocks aggressive
//! clients. Every call therefore goes through a shared [`Throttle`],
//! transient failures are retried with backoff, and an in-memory cache
//! keyed by a text prefix short-circuits repeats within a run.
//!
//! Texts over the single-call ceiling are split on sentence boundaries
//! into chunks under the configured chunk size and translated
//! sequentially; a failed chunk is dropped rather than failing the
//! whole text.

use crate::config::Config;
use crate::models::Article;
use crate::utils::error::TranslateError;
use crate::utils::retry::{with_backoff, BackoffMode, RetryClass, RetryConfig};
use crate::utils::throttle::Throttle;
use crate::utils::{char_prefix, truncate_text};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default public endpoint; overridable for tests
const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com";

/// Cache keys use only the leading characters of the input, trading a
/// small collision risk for cheap keys on long articles.
const CACHE_KEY_PREFIX_CHARS: usize = 100;

/// Sentence fragments shorter than this after splitting are punctuation
/// debris, not sentences.
const MIN_SENTENCE_CHARS: usize = 10;

lazy_static! {
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?]+").expect("sentence regex");
}

/// Counters for one batch of translations
#[derive(Debug, Default, Clone, Copy)]
pub struct TranslationStats {
    pub titles_translated: u64,
    pub texts_translated: u64,
    pub fully_translated: u64,
    pub failed: u64,
    pub cache_hits: u64,
}

pub struct Translator {
    client: reqwest::Client,
    endpoint: String,
    source_lang: String,
    target_lang: String,
    throttle: Throttle,
    retry: RetryConfig,
    delay: Duration,
    chunk_size: usize,
    max_single_call: usize,
    cache: Mutex<HashMap<String, String>>,
}

impl Translator {
    pub fn new(config: &Config) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.translator.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            source_lang: config.translator.source_language.clone(),
            target_lang: config.translator.target_language.clone(),
            throttle: Throttle::per_minute(config.translator.calls_per_minute),
            // Retry waits grow in proportion to the attempt number; the
            // endpoint punishes rapid doubling bursts more than steady
            // pacing.
            retry: RetryConfig {
                max_attempts: config.translator.max_retry_attempts,
                base_delay: config.translation_delay(),
                mode: BackoffMode::Linear,
                max_delay: config.translation_delay() * 16,
                throttle_cooldown: config.translation_delay() * 2,
            },
            delay: config.translation_delay(),
            chunk_size: config.limits.chunk_size,
            max_single_call: config.limits.max_single_call_length,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Point the translator at a different host (used by tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Number of cached translations held
    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn cache_key(text: &str) -> String {
        char_prefix(text.trim(), CACHE_KEY_PREFIX_CHARS)
    }

    fn cache_get(&self, key: &str) -> Option<String> {
        self.cache.lock().ok().and_then(|c| c.get(key).cloned())
    }

    fn cache_put(&self, key: String, value: String) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, value);
        }
    }

    /// Translate one text, consulting the cache and chunking as needed
    pub async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        let key = Self::cache_key(trimmed);
        if let Some(hit) = self.cache_get(&key) {
            debug!(chars = trimmed.chars().count(), "Translation cache hit");
            return Ok(hit);
        }

        let result = if trimmed.chars().count() > self.max_single_call {
            self.translate_chunked(trimmed).await?
        } else {
            self.translate_call(trimmed).await?
        };

        self.cache_put(key, result.clone());
        Ok(result)
    }

    /// Split into sentence-packed chunks and translate them in order.
    ///
    /// A chunk that fails after retries is logged and omitted; the
    /// remaining chunks still produce a usable partial translation.
    async fn translate_chunked(&self, text: &str) -> Result<String, TranslateError> {
        let chunks = self.split_into_chunks(text);
        info!(chunks = chunks.len(), "Translating long text in chunks");

        let mut translated = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay * 2).await;
            }
            match self.translate_call(chunk).await {
                Ok(t) => translated.push(t),
                Err(TranslateError::QuotaExceeded) => return Err(TranslateError::QuotaExceeded),
                Err(e) => {
                    warn!(chunk = i, error = %e, "Chunk translation failed, omitting");
                }
            }
        }

        if translated.is_empty() {
            return Err(TranslateError::EmptyResult);
        }
        Ok(translated.join(" "))
    }

    /// Greedily pack sentences into chunks no larger than `chunk_size`
    fn split_into_chunks(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in split_into_sentences(text) {
            let sentence = if sentence.chars().count() > self.max_single_call {
                truncate_text(&sentence, self.max_single_call)
            } else {
                sentence
            };

            let needed = sentence.chars().count() + if current.is_empty() { 0 } else { 1 };
            if !current.is_empty() && current.chars().count() + needed > self.chunk_size {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// One throttled, retry-wrapped call against the endpoint
    async fn translate_call(&self, text: &str) -> Result<String, TranslateError> {
        with_backoff(
            &self.retry,
            || async {
                self.throttle.acquire().await;
                self.request_once(text).await
            },
            classify,
        )
        .await
    }

    async fn request_once(&self, text: &str) -> Result<String, TranslateError> {
        let url = format!("{}/translate_a/single", self.endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_lang.as_str()),
                ("tl", self.target_lang.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        match response.status().as_u16() {
            429 => return Err(TranslateError::RateLimited),
            403 => return Err(TranslateError::QuotaExceeded),
            s if s >= 500 => return Err(TranslateError::ServiceUnavailable),
            _ => {}
        }

        let body: Value = response.json().await?;
        parse_gtx_response(&body)
    }

    /// Translate the title and body of an article in place.
    ///
    /// The two fields fail independently: a failed body translation
    /// still leaves a translated title on the record, and vice versa.
    pub async fn translate_article(
        &self,
        article: &mut Article,
        stats: &mut TranslationStats,
    ) -> Result<(), TranslateError> {
        match self.translate(&article.title).await {
            Ok(t) => {
                article.translated_title = Some(t);
                stats.titles_translated += 1;
            }
            Err(TranslateError::QuotaExceeded) => return Err(TranslateError::QuotaExceeded),
            Err(e) => {
                warn!(url = %article.canonical_url, error = %e, "Title translation failed");
            }
        }

        if let Some(text) = article.text.clone() {
            tokio::time::sleep(self.delay).await;
            match self.translate(&text).await {
                Ok(t) => {
                    article.translated_text = Some(t);
                    stats.texts_translated += 1;
                }
                Err(TranslateError::QuotaExceeded) => return Err(TranslateError::QuotaExceeded),
                Err(e) => {
                    warn!(url = %article.canonical_url, error = %e, "Text translation failed");
                }
            }
        }

        if article.translated_title.is_some() && article.translated_text.is_some() {
            stats.fully_translated += 1;
        } else if article.translated_title.is_none() && article.translated_text.is_none() {
            stats.failed += 1;
        }
        Ok(())
    }

    /// Translate a batch sequentially.
    ///
    /// Sequential on purpose: the endpoint blocks parallel clients far
    /// sooner than spaced-out ones. Stops early only on a quota error,
    /// which no amount of waiting inside this run will clear.
    pub async fn translate_batch(&self, articles: &mut [Article]) -> TranslationStats {
        let mut stats = TranslationStats::default();

        for (i, article) in articles.iter_mut().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay * 2).await;
            }
            match self.translate_article(article, &mut stats).await {
                Ok(()) => {}
                Err(TranslateError::QuotaExceeded) => {
                    warn!(
                        translated = i,
                        remaining = articles.len() - i,
                        "Translation quota exceeded, abandoning batch"
                    );
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Article translation failed");
                    stats.failed += 1;
                }
            }
        }

        info!(
            titles = stats.titles_translated,
            texts = stats.texts_translated,
            full = stats.fully_translated,
            failed = stats.failed,
            "Translation batch complete"
        );
        stats
    }
}

/// Retry classification for translation errors: quota failures end the
/// run, rate limiting earns an extra cooldown, service hiccups retry.
fn classify(error: &TranslateError) -> RetryClass {
    if matches!(error, TranslateError::RateLimited) {
        RetryClass::Throttled
    } else if error.is_transient() {
        RetryClass::Transient
    } else {
        RetryClass::Fatal
    }
}

/// Split text on terminal punctuation, discarding debris fragments
fn split_into_sentences(text: &str) -> Vec<String> {
    SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
        .map(|s| format!("{}.", s))
        .collect()
}

/// The gtx response is a nested array: element 0 holds segments, each
/// segment's element 0 is the translated text.
fn parse_gtx_response(body: &Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::MalformedResponse("missing segment array".to_string()))?;

    let mut out = String::new();
    for segment in segments {
        if let Some(piece) = segment.get(0).and_then(Value::as_str) {
            out.push_str(piece);
        }
    }

    if out.trim().is_empty() {
        return Err(TranslateError::EmptyResult);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_gtx_response_concatenates_segments() {
        let body = json!([
            [
                ["முதல் பகுதி ", "first part ", null],
                ["இரண்டாம் பகுதி", "second part", null]
            ],
            null,
            "en"
        ]);
        assert_eq!(
            parse_gtx_response(&body).unwrap(),
            "முதல் பகுதி இரண்டாம் பகுதி"
        );
    }

    #[test]
    fn test_parse_gtx_response_malformed() {
        assert!(matches!(
            parse_gtx_response(&json!({"error": "nope"})),
            Err(TranslateError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_gtx_response(&json!([[["   ", "x", null]]])),
            Err(TranslateError::EmptyResult)
        ));
    }

    #[test]
    fn test_split_into_sentences_discards_fragments() {
        let sentences =
            split_into_sentences("This is the first sentence. Ok. And here is the second one!");
        assert_eq!(
            sentences,
            vec![
                "This is the first sentence.".to_string(),
                "And here is the second one.".to_string()
            ]
        );
    }

    #[test]
    fn test_chunking_respects_size() {
        let config = Config::default();
        let mut translator_cfg = config.clone();
        translator_cfg.limits.chunk_size = 60;
        let translator = Translator::new(&translator_cfg).unwrap();

        let text = "Sentence number one is right here. Sentence number two is right here. \
                    Sentence number three is right here.";
        let chunks = translator.split_into_chunks(text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 60, "oversize chunk: {chunk}");
        }
        let rejoined = chunks.join(" ");
        assert!(rejoined.contains("Sentence number one"));
        assert!(rejoined.contains("Sentence number three"));
    }

    #[test]
    fn test_cache_key_is_prefix() {
        let long = "x".repeat(500);
        assert_eq!(Translator::cache_key(&long).chars().count(), 100);
        assert_eq!(Translator::cache_key("  short  "), "short");
    }

    proptest::proptest! {
        #[test]
        fn prop_chunks_never_exceed_size(
            sentences in proptest::collection::vec("[a-z]{10,40}( [a-z]{3,12}){0,8}", 1..30)
        ) {
            let mut config = Config::default();
            config.limits.chunk_size = 200;
            let translator = Translator::new(&config).unwrap();

            let text = sentences.join(". ") + ".";
            for chunk in translator.split_into_chunks(&text) {
                proptest::prop_assert!(chunk.chars().count() <= 200);
            }
        }
    }

    #[test]
    fn test_classify_errors() {
        assert_eq!(classify(&TranslateError::QuotaExceeded), RetryClass::Fatal);
        assert_eq!(classify(&TranslateError::RateLimited), RetryClass::Throttled);
        assert_eq!(
            classify(&TranslateError::ServiceUnavailable),
            RetryClass::Transient
        );
        assert_eq!(classify(&TranslateError::EmptyInput), RetryClass::Fatal);
    }
}
