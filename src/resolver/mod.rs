//! Canonical URL resolution for wrapped feed links
//!
//! Aggregator feeds hand out tracking/redirect wrappers instead of the
//! real article URL. The resolver follows the redirect chain to the
//! final location and strips tracking query parameters, yielding the
//! canonical URL the pipeline dedups and stores by. Resolution failure
//! is never fatal: the original URL is returned unchanged and the
//! pipeline continues.

use crate::config::Config;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_backoff, BackoffMode, RetryClass, RetryConfig};
use crate::utils::throttle::Throttle;
use reqwest::{redirect, Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Redirector hosts whose links want de-indirection
const WRAPPER_HOSTS: &[&str] = &[
    "news.google.com",
    "www.google.com",
    "t.co",
    "feedproxy.google.com",
    "feeds.feedburner.com",
    "lnkd.in",
];

/// Query parameters that never affect article identity
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "igshid", "mc_cid", "mc_eid", "ref", "cmpid"];

/// Best-effort canonicalizer for source-provided article links
pub struct UrlResolver {
    /// Client following redirect chains up to a bounded depth
    client: Client,

    /// Shared scrape throttle; resolution is a network call
    throttle: Arc<Throttle>,

    retry: RetryConfig,

    /// Hosts treated as redirect wrappers
    wrapper_hosts: Vec<String>,
}

impl UrlResolver {
    /// Create a resolver sharing the scrape throttle
    pub fn new(config: &Config, throttle: Arc<Throttle>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .redirect(redirect::Policy::limited(10))
            .gzip(true)
            .build()?;

        let retry = RetryConfig {
            max_attempts: config.scraper.max_retry_attempts,
            base_delay: Duration::from_millis(config.scraper.backoff_base_ms),
            mode: BackoffMode::Exponential,
            max_delay: Duration::from_millis(config.scraper.backoff_max_ms),
            throttle_cooldown: config.request_delay() * 2,
        };

        Ok(Self {
            client,
            throttle,
            retry,
            wrapper_hosts: WRAPPER_HOSTS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Register an additional host to treat as a redirect wrapper
    /// (used by tests pointing at a mock server)
    pub fn add_wrapper_host(&mut self, host: impl Into<String>) {
        self.wrapper_hosts.push(host.into());
    }

    /// Resolve a source link to its canonical article URL.
    ///
    /// Wrapped links are de-indirected over the network; everything else
    /// only gets its tracking parameters stripped. Always returns a URL;
    /// on any failure the input comes back unchanged.
    pub async fn resolve(&self, url: &str) -> String {
        let Ok(parsed) = Url::parse(url) else {
            return url.to_string();
        };

        let resolved = if self.is_wrapped(&parsed) {
            match self.follow_redirects(url).await {
                Ok(target) => target,
                Err(e) => {
                    warn!(url = %url, error = %e, "URL resolution failed, keeping original");
                    parsed
                }
            }
        } else {
            parsed
        };

        strip_tracking_params(resolved).to_string()
    }

    fn is_wrapped(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| self.wrapper_hosts.iter().any(|w| w == host))
    }

    /// Follow the wrapper's redirect chain to the final article URL
    async fn follow_redirects(&self, url: &str) -> Result<Url, FetchError> {
        with_backoff(
            &self.retry,
            || async {
                self.throttle.acquire().await;
                debug!(url = %url, "Resolving wrapped URL");

                let response = self.client.get(url).send().await.map_err(|e| {
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

                Ok(response.url().clone())
            },
            |e: &FetchError| match e {
                FetchError::RateLimited => RetryClass::Throttled,
                e if e.is_transient() => RetryClass::Transient,
                _ => RetryClass::Fatal,
            },
        )
        .await
    }
}

/// Drop tracking query parameters (`utm_*` and known click identifiers)
pub fn strip_tracking_params(mut url: Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept).finish();
    }
    url
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_utm_params() {
        let url = Url::parse("https://example.com/story?utm_source=feed&utm_medium=rss&id=7")
            .unwrap();
        let cleaned = strip_tracking_params(url);
        assert_eq!(cleaned.as_str(), "https://example.com/story?id=7");
    }

    #[test]
    fn test_strip_all_params_clears_query() {
        let url = Url::parse("https://example.com/story?utm_source=feed&fbclid=abc").unwrap();
        let cleaned = strip_tracking_params(url);
        assert_eq!(cleaned.as_str(), "https://example.com/story");
    }

    #[test]
    fn test_meaningful_params_survive() {
        let url = Url::parse("https://example.com/story?page=2&ref=home").unwrap();
        let cleaned = strip_tracking_params(url);
        assert_eq!(cleaned.as_str(), "https://example.com/story?page=2");
    }

    #[tokio::test]
    async fn test_unwrapped_url_needs_no_network() {
        let config = Config::default();
        let resolver = UrlResolver::new(&config, Arc::new(Throttle::per_minute(60))).unwrap();
        let resolved = resolver
            .resolve("https://example.com/story?utm_campaign=x")
            .await;
        assert_eq!(resolved, "https://example.com/story");
    }

    #[tokio::test]
    async fn test_unparseable_url_passes_through() {
        let config = Config::default();
        let resolver = UrlResolver::new(&config, Arc::new(Throttle::per_minute(60))).unwrap();
        let resolved = resolver.resolve("not a url at all").await;
        assert_eq!(resolved, "not a url at all");
    }
}
