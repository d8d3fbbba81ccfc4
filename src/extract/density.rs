//! Text-density extraction strategy
//!
//! Last resort in the chain, for pages whose markup matches none of the
//! selector tables. Scores every plausible block container by how much
//! paragraph text it holds relative to link text, then takes the
//! highest-scoring block as the article body. Readability-style, tuned
//! for recall over precision.

use super::selectors;
use super::structured::{content_image, meta_image};
use super::{check_length, collect_paragraphs, element_text, in_noise, join_paragraphs, ExtractStrategy};
use crate::models::Extracted;
use crate::utils::error::ExtractError;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use url::Url;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a").expect("anchor selector");
}

/// Blocks whose text is mostly links are navigation, not prose
const MAX_LINK_DENSITY: f64 = 0.5;

pub struct DensityStrategy {
    min_len: usize,
}

#[derive(Debug)]
struct Candidate<'a> {
    element: ElementRef<'a>,
    score: f64,
}

impl DensityStrategy {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    /// Non-link text mass of a block.
    ///
    /// Counts all text rather than just paragraph tags so the strategy
    /// still works on pages that mark up their prose with bare divs or
    /// spans, which is exactly when the earlier strategies have failed.
    fn score(el: ElementRef) -> f64 {
        let text_len = element_text(el).chars().count();
        if text_len == 0 {
            return 0.0;
        }
        let link_len: usize = el
            .select(&ANCHOR)
            .map(|a| element_text(a).chars().count())
            .sum();
        let link_density = (link_len as f64 / text_len as f64).min(1.0);
        if link_density > MAX_LINK_DENSITY {
            return 0.0;
        }
        (text_len - link_len.min(text_len)) as f64
    }

    fn best_block<'a>(&self, doc: &'a Html) -> Option<Candidate<'a>> {
        doc.select(&selectors::DENSITY_CANDIDATES)
            .filter(|el| !in_noise(*el))
            .map(|element| Candidate {
                score: Self::score(element),
                element,
            })
            // Strictly-greater keeps the outermost of equally-scored
            // nested blocks, which preserves full paragraph order.
            .fold(None, |best: Option<Candidate>, cand| match best {
                Some(b) if b.score >= cand.score => Some(b),
                _ if cand.score > 0.0 => Some(cand),
                other => other,
            })
    }
}

impl ExtractStrategy for DensityStrategy {
    fn name(&self) -> &'static str {
        "density"
    }

    fn extract(&self, base_url: &Url, html: &str) -> Result<Extracted, ExtractError> {
        let doc = Html::parse_document(html);

        let best = self.best_block(&doc).ok_or(ExtractError::NoContent)?;
        let paragraphs = collect_paragraphs(best.element);
        let text = if paragraphs.is_empty() {
            element_text(best.element)
        } else {
            join_paragraphs(&paragraphs)
        };
        check_length(&text, self.min_len)?;

        let title = doc
            .select(&selectors::OG_TITLE)
            .filter_map(|m| m.value().attr("content"))
            .map(super::sanitize::sanitize_text)
            .find(|t| !t.is_empty())
            .or_else(|| {
                selectors::TITLE_SELECTORS
                    .iter()
                    .flat_map(|sel| doc.select(sel))
                    .filter(|el| !in_noise(*el))
                    .map(element_text)
                    .find(|t| !t.is_empty())
            })
            .unwrap_or_default();

        let top_image = meta_image(&doc, base_url).or_else(|| content_image(&doc, base_url));

        Ok(Extracted {
            title,
            text,
            authors: Vec::new(),
            published_at: None,
            top_image,
            summary: String::new(),
            keywords: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://news.example.com/story/3").unwrap()
    }

    #[test]
    fn test_picks_densest_block() {
        let html = r#"<html><body>
            <div id="menu">
            <p><a href="/">Home</a> <a href="/world">World</a> <a href="/sport">Sport</a></p>
            </div>
            <div id="story">
            <p>Negotiators reached a provisional agreement late on Friday after three days of talks that had repeatedly stalled over pension provisions.</p>
            <p>Union members will vote on the deal next week, with leadership recommending acceptance.</p>
            </div>
            </body></html>"#;

        let strategy = DensityStrategy::new(100);
        let extracted = strategy.extract(&base(), html).unwrap();
        assert!(extracted.text.starts_with("Negotiators reached"));
        assert!(!extracted.text.contains("Home"));
    }

    #[test]
    fn test_link_heavy_block_rejected() {
        // The only block is all links, so nothing scores above zero.
        let html = r#"<html><body><div>
            <p><a href="/a">Read more about the first story here</a></p>
            <p><a href="/b">Read more about the second story here</a></p>
            </div></body></html>"#;

        let strategy = DensityStrategy::new(10);
        assert!(matches!(
            strategy.extract(&base(), html),
            Err(ExtractError::NoContent)
        ));
    }

    #[test]
    fn test_short_best_block_is_insufficient() {
        let html = r#"<html><body><div><p>Just a few words.</p></div></body></html>"#;
        let strategy = DensityStrategy::new(100);
        assert!(matches!(
            strategy.extract(&base(), html),
            Err(ExtractError::Insufficient { .. })
        ));
    }

    #[test]
    fn test_paragraphless_markup_still_extracts() {
        let html = r#"<html><body><div>
            <span>Prose marked up without paragraph tags at all, long enough to clear the minimum threshold set for this particular test case.</span>
            </div></body></html>"#;
        let strategy = DensityStrategy::new(100);
        let extracted = strategy.extract(&base(), html).unwrap();
        assert!(extracted.text.contains("without paragraph tags"));
    }

    #[test]
    fn test_outermost_of_nested_blocks_wins() {
        let html = r#"<html><body>
            <main>
            <section><p>Opening paragraph of the report, long enough to contribute a meaningful amount of text to the score.</p></section>
            <section><p>Closing paragraph of the report, also long enough to contribute a meaningful amount of text.</p></section>
            </main>
            </body></html>"#;

        let strategy = DensityStrategy::new(100);
        let extracted = strategy.extract(&base(), html).unwrap();
        assert!(extracted.text.contains("Opening paragraph"));
        assert!(extracted.text.contains("Closing paragraph"));
    }
}
