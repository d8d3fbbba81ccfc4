//! HTTP page fetcher with rate limiting and retry
//!
//! All article-page traffic funnels through [`PageFetcher`], which layers
//! the cross-cutting policy explicitly at the call site: every attempt
//! first waits on the shared [`Throttle`], then runs under the
//! classification-driven retry executor. Features:
//! - User-Agent rotation (or a fixed configured agent)
//! - global rate limiting shared across all concurrent fetch tasks
//! - exponential backoff with an extra cooldown on HTTP 429
//! - charset detection and conversion for non-UTF-8 pages

use crate::config::Config;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_backoff, BackoffMode, RetryClass, RetryConfig};
use crate::utils::throttle::Throttle;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    Client, Response, StatusCode,
};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::debug;

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Shared HTTP fetcher for article pages
pub struct PageFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter shared with every caller of the scrape target class
    throttle: Arc<Throttle>,

    /// Retry policy for transient failures
    retry: RetryConfig,

    /// Fixed User-Agent; empty selects rotation from the pool
    user_agent: String,

    /// Optional base URL override for testing with mock servers
    base_url: Option<String>,
}

impl PageFetcher {
    /// Create a fetcher from pipeline configuration
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let retry = RetryConfig {
            max_attempts: config.scraper.max_retry_attempts,
            base_delay: Duration::from_millis(config.scraper.backoff_base_ms),
            mode: BackoffMode::Exponential,
            max_delay: Duration::from_millis(config.scraper.backoff_max_ms),
            // 429 cooldown: double the standard inter-request delay
            throttle_cooldown: config.request_delay() * 2,
        };

        Ok(Self {
            client,
            throttle: Arc::new(Throttle::per_minute(config.scraper.requests_per_minute)),
            retry,
            user_agent: config.scraper.user_agent.clone(),
            base_url: None,
        })
    }

    /// Create a fetcher pointed at a mock server, for tests
    pub fn with_base_url(config: &Config, base_url: &str) -> Result<Self, FetchError> {
        let mut fetcher = Self::new(config)?;
        fetcher.base_url = Some(base_url.to_string());
        Ok(fetcher)
    }

    /// The throttle guarding the scrape target, for sharers
    pub fn throttle(&self) -> Arc<Throttle> {
        Arc::clone(&self.throttle)
    }

    /// Fetch a page body with rate limiting and retry.
    ///
    /// Each attempt (including retries) acquires the shared throttle, so
    /// retries cannot exceed the configured request rate either.
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let full_url = match &self.base_url {
            Some(base) => format!("{base}{url}"),
            None => url.to_string(),
        };

        with_backoff(
            &self.retry,
            || async {
                self.throttle.acquire().await;
                self.fetch_once(&full_url).await
            },
            |e: &FetchError| match e {
                FetchError::RateLimited => RetryClass::Throttled,
                e if e.is_transient() => RetryClass::Transient,
                _ => RetryClass::Fatal,
            },
        )
        .await
    }

    /// One fetch attempt without policy
    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(url)
            .headers(self.build_headers())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        decode_response(response).await
    }

    /// Build browser-like request headers
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if self.user_agent.is_empty() {
            headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
        } else if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }

        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        headers
    }
}

/// Get a random user agent from the pool
fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
}

/// Decode a response body handling non-UTF-8 charsets
async fn decode_response(response: Response) -> Result<String, FetchError> {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_default();

    let bytes = response.bytes().await?;
    decode_bytes(&bytes, &content_type)
}

/// Decode bytes to a UTF-8 string with charset detection
///
/// Strategies, in order:
/// 1. charset from the Content-Type header
/// 2. charset from an HTML `<meta>` tag in the first kilobyte
/// 3. UTF-8
/// 4. Windows-1252 as a legacy fallback
pub fn decode_bytes(bytes: &[u8], content_type: &str) -> Result<String, FetchError> {
    if let Some(encoding) = charset_from_label(content_type) {
        return decode_with(encoding, bytes);
    }

    if let Some(encoding) = sniff_meta_charset(bytes) {
        return decode_with(encoding, bytes);
    }

    if let Ok(text) = decode_with(UTF_8, bytes) {
        return Ok(text);
    }

    decode_with(WINDOWS_1252, bytes)
}

fn charset_from_label(content_type: &str) -> Option<&'static Encoding> {
    static CHARSET_RE: OnceLock<Regex> = OnceLock::new();
    let re = CHARSET_RE
        .get_or_init(|| Regex::new(r#"(?i)charset=["']?([a-zA-Z0-9_\-]+)"#).expect("valid regex"));

    let label = re.captures(content_type)?.get(1)?.as_str();
    Encoding::for_label(label.as_bytes())
}

/// Look for a meta charset declaration in the first kilobyte
fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(1024)];
    let head = String::from_utf8_lossy(head);
    let encoding = charset_from_label(&head)?;
    // UTF-8 is the default path anyway
    if encoding == UTF_8 {
        None
    } else {
        Some(encoding)
    }
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, FetchError> {
    let (cow, _encoding, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(FetchError::Decode(format!(
            "{} decoding errors",
            encoding.name()
        )));
    }
    Ok(cow.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_rotation() {
        let mut agents = std::collections::HashSet::new();
        for _ in 0..100 {
            let agent = random_user_agent();
            assert!(USER_AGENTS.contains(&agent));
            agents.insert(agent);
        }
        assert!(agents.len() > 1, "User agents should rotate");
    }

    #[test]
    fn test_decode_utf8() {
        let text = "Hello, World! தமிழ்";
        let decoded = decode_bytes(text.as_bytes(), "text/html; charset=utf-8");
        assert_eq!(decoded.unwrap(), text);
    }

    #[test]
    fn test_decode_latin1_from_header() {
        // "café" in ISO-8859-1
        let bytes: &[u8] = &[0x63, 0x61, 0x66, 0xE9];
        let decoded = decode_bytes(bytes, "text/html; charset=iso-8859-1");
        assert_eq!(decoded.unwrap(), "café");
    }

    #[test]
    fn test_decode_meta_charset_sniff() {
        let mut bytes = b"<html><head><meta charset=\"windows-1252\"></head><body>".to_vec();
        bytes.push(0x93); // curly left quote in 1252
        bytes.extend_from_slice(b"quoted");
        bytes.push(0x94);
        bytes.extend_from_slice(b"</body></html>");

        let decoded = decode_bytes(&bytes, "text/html");
        let text = decoded.unwrap();
        assert!(text.contains('\u{201C}'));
        assert!(text.contains('\u{201D}'));
    }

    #[test]
    fn test_decode_falls_back_to_windows_1252() {
        // Invalid UTF-8, no charset declared anywhere
        let bytes: &[u8] = b"r\xE9sum\xE9";
        let decoded = decode_bytes(bytes, "text/html");
        assert_eq!(decoded.unwrap(), "résumé");
    }

    #[test]
    fn test_charset_label_parsing() {
        assert_eq!(
            charset_from_label("text/html; charset=UTF-8").map(|e| e.name()),
            Some("UTF-8")
        );
        assert_eq!(
            charset_from_label("text/html; charset='euc-kr'").map(|e| e.name()),
            Some("EUC-KR")
        );
        assert!(charset_from_label("text/html").is_none());
    }

    #[test]
    fn test_fetcher_creation() {
        let config = Config::default();
        assert!(PageFetcher::new(&config).is_ok());
    }
}
