//! Structured-markup extraction strategy
//!
//! First in the chain: trusts the publisher's own machine-readable
//! annotations. Title comes from `og:title` (falling back to `<h1>` and
//! `<title>`), body text from paragraphs under `<article>` or an
//! `role="article"` region, and the rich fields (authors, publish
//! timestamp, lead image, summary, keywords) from the usual meta tags.

use super::sanitize::sanitize_text;
use super::selectors;
use super::{
    check_length, collect_paragraphs, element_text, in_noise, join_paragraphs, parse_timestamp,
    resolve_image_url, ExtractStrategy,
};
use crate::models::Extracted;
use crate::utils::error::ExtractError;
use scraper::Html;
use url::Url;

pub struct StructuredStrategy {
    min_len: usize,
}

impl StructuredStrategy {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    fn find_title(&self, doc: &Html) -> String {
        if let Some(meta) = doc.select(&selectors::OG_TITLE).next() {
            if let Some(content) = meta.value().attr("content") {
                let title = sanitize_text(content);
                if !title.is_empty() {
                    return title;
                }
            }
        }
        for sel in selectors::TITLE_SELECTORS.iter() {
            if let Some(el) = doc.select(sel).next() {
                if in_noise(el) {
                    continue;
                }
                let title = element_text(el);
                if !title.is_empty() {
                    return title;
                }
            }
        }
        String::new()
    }

    fn find_body(&self, doc: &Html) -> Vec<String> {
        if let Some(article) = doc.select(&selectors::ARTICLE_REGION).next() {
            let paragraphs = collect_paragraphs(article);
            if !paragraphs.is_empty() {
                return paragraphs;
            }
            // Some sites put bare text nodes straight under <article>.
            let text = element_text(article);
            if !text.is_empty() {
                return vec![text];
            }
        }
        Vec::new()
    }

    fn find_authors(&self, doc: &Html) -> Vec<String> {
        selectors::META_AUTHOR
            .iter()
            .flat_map(|sel| doc.select(sel))
            .filter_map(|m| m.value().attr("content"))
            .map(sanitize_text)
            .filter(|a| !a.is_empty())
            .collect()
    }

    fn find_published(&self, doc: &Html) -> Option<chrono::DateTime<chrono::Utc>> {
        selectors::META_PUBLISHED
            .iter()
            .flat_map(|sel| doc.select(sel))
            .filter_map(|m| m.value().attr("content"))
            .find_map(parse_timestamp)
            .or_else(|| {
                doc.select(&selectors::TIME_DATETIME)
                    .filter_map(|t| t.value().attr("datetime"))
                    .find_map(parse_timestamp)
            })
    }

    fn find_image(&self, doc: &Html, base: &Url) -> Option<String> {
        meta_image(doc, base)
    }

    fn find_summary(&self, doc: &Html) -> String {
        selectors::OG_DESCRIPTION
            .iter()
            .flat_map(|sel| doc.select(sel))
            .filter_map(|m| m.value().attr("content"))
            .map(sanitize_text)
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }

    fn find_keywords(&self, doc: &Html) -> Vec<String> {
        selectors::META_KEYWORDS
            .iter()
            .flat_map(|sel| doc.select(sel))
            .filter_map(|m| m.value().attr("content"))
            .flat_map(|c| c.split(','))
            .map(sanitize_text)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

impl ExtractStrategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn extract(&self, base_url: &Url, html: &str) -> Result<Extracted, ExtractError> {
        let doc = Html::parse_document(html);

        let paragraphs = self.find_body(&doc);
        let text = join_paragraphs(&paragraphs);
        check_length(&text, self.min_len)?;

        Ok(Extracted {
            title: self.find_title(&doc),
            text,
            authors: self.find_authors(&doc),
            published_at: self.find_published(&doc),
            top_image: self.find_image(&doc, base_url),
            summary: self.find_summary(&doc),
            keywords: self.find_keywords(&doc),
        })
    }
}

/// Lead image from `og:image` / `twitter:image`, resolved against the page URL
pub(crate) fn meta_image(doc: &Html, base: &Url) -> Option<String> {
    for sel in selectors::META_IMAGE_SELECTORS.iter() {
        if let Some(src) = doc
            .select(sel)
            .next()
            .and_then(|m| m.value().attr("content"))
        {
            if let Some(resolved) = resolve_image_url(base, src) {
                return Some(resolved);
            }
        }
    }
    None
}

/// First in-content image, used when no meta image exists
pub(crate) fn content_image(doc: &Html, base: &Url) -> Option<String> {
    for sel in selectors::CONTENT_IMAGE_SELECTORS.iter() {
        for img in doc.select(sel) {
            if in_noise(img) {
                continue;
            }
            if let Some(resolved) = img
                .value()
                .attr("src")
                .and_then(|src| resolve_image_url(base, src))
            {
                return Some(resolved);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://news.example.com/story/1").unwrap()
    }

    const FULL_PAGE: &str = r#"<html><head>
        <title>Fallback Title | Site</title>
        <meta property="og:title" content="Monsoon Rains Flood Coastal Districts">
        <meta property="og:description" content="Heavy rains displaced thousands.">
        <meta property="og:image" content="/images/flood.jpg">
        <meta property="article:published_time" content="2024-11-02T08:30:00+05:30">
        <meta name="author" content="R. Kumar">
        <meta name="keywords" content="weather, monsoon, floods">
        </head><body>
        <nav><p>Home | World | Sports</p></nav>
        <article>
        <p>Torrential rain battered the coastal districts overnight, flooding low-lying neighbourhoods and cutting power to thousands of homes.</p>
        <p>Relief camps opened in schools as the river crossed the danger mark for the first time this season.</p>
        </article>
        </body></html>"#;

    #[test]
    fn test_full_structured_page() {
        let strategy = StructuredStrategy::new(100);
        let extracted = strategy.extract(&base(), FULL_PAGE).unwrap();

        assert_eq!(extracted.title, "Monsoon Rains Flood Coastal Districts");
        assert!(extracted.text.starts_with("Torrential rain"));
        assert!(extracted.text.contains("Relief camps"));
        assert!(!extracted.text.contains("Home | World"));
        assert_eq!(extracted.authors, vec!["R. Kumar"]);
        assert!(extracted.published_at.is_some());
        assert_eq!(
            extracted.top_image.as_deref(),
            Some("https://news.example.com/images/flood.jpg")
        );
        assert_eq!(extracted.summary, "Heavy rains displaced thousands.");
        assert_eq!(extracted.keywords, vec!["weather", "monsoon", "floods"]);
    }

    #[test]
    fn test_title_falls_back_to_h1() {
        let html = r#"<html><body><h1>Headline From H1</h1><article><p>AAAA BBBB CCCC DDDD</p></article></body></html>"#;
        let strategy = StructuredStrategy::new(5);
        let extracted = strategy.extract(&base(), html).unwrap();
        assert_eq!(extracted.title, "Headline From H1");
    }

    #[test]
    fn test_no_article_element_is_no_content() {
        let html = "<html><body><div><p>Plenty of text but no article markup here at all, just divs.</p></div></body></html>";
        let strategy = StructuredStrategy::new(10);
        assert!(matches!(
            strategy.extract(&base(), html),
            Err(ExtractError::NoContent)
        ));
    }

    #[test]
    fn test_short_article_is_insufficient() {
        let html = "<html><body><article><p>Too short.</p></article></body></html>";
        let strategy = StructuredStrategy::new(100);
        assert!(matches!(
            strategy.extract(&base(), html),
            Err(ExtractError::Insufficient { .. })
        ));
    }
}
