//! kaatru: news acquisition and translation pipeline
//!
//! Turns a batch of feed entries into normalized, translated article
//! records. The stages, in order:
//!
//! 1. **Resolve** ([`resolver`]): unwrap aggregator redirect links to
//!    the publisher's canonical URL and strip tracking parameters.
//! 2. **Deduplicate** ([`pipeline::DedupSet`]): first claim on a
//!    canonical URL wins; repeats are skipped before any network work.
//! 3. **Extract** ([`extract`]): an ordered chain of parsing strategies
//!    pulls clean article text from the page, falling through until one
//!    meets the minimum-content threshold.
//! 4. **Translate** ([`translate`]): titles and bodies are translated
//!    through a throttled, cached client, chunking long texts on
//!    sentence boundaries.
//!
//! The [`pipeline::Pipeline`] orchestrates a run with bounded
//! concurrency, per-item timeouts, and a batch deadline. Feed parsing,
//! storage, and delivery are collaborators outside this crate: callers
//! hand in [`models::RawEntry`] values and receive [`models::Article`]
//! records plus a [`models::RunReport`].
//!
//! # Example
//!
//! ```no_run
//! use kaatru::config::Config;
//! use kaatru::models::RawEntry;
//! use kaatru::pipeline::Pipeline;
//!
//! # async fn run() -> kaatru::error::Result<()> {
//! let config = Config::from_env()?;
//! let pipeline = Pipeline::new(config)?;
//!
//! let entries = vec![RawEntry::from_aggregator_title(
//!     "Markets rally on rate cut - Example Wire",
//!     "https://news.example.com/articles/rally",
//!     Some("2026-08-29T06:00:00Z".to_string()),
//!     "Stocks climbed after the decision.",
//! )];
//!
//! let (articles, report) = pipeline.run(entries).await?;
//! println!("{} articles, {} translated", articles.len(), report.fully_translated);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod translate;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result};
pub use models::{Article, RawEntry, RunReport};
pub use pipeline::Pipeline;
