//! Selector-table extraction strategy
//!
//! Second in the chain. Walks an ordered table of container selectors
//! covering common CMS layouts, taking the first region that holds a
//! real cluster of paragraphs. When no region matches it falls back to
//! concatenating every content paragraph on the page, which trades
//! precision for recall on unstructured sites.

use super::sanitize::sanitize_text;
use super::selectors;
use super::structured::{content_image, meta_image};
use super::{
    check_length, collect_paragraphs, element_text, in_noise, join_paragraphs, ExtractStrategy,
};
use crate::models::Extracted;
use crate::utils::error::ExtractError;
use scraper::Html;
use url::Url;

/// A matched region must look like a genuine article body, not a teaser
/// block: more than this many paragraphs and text above the minimum.
const MIN_REGION_PARAGRAPHS: usize = 2;

/// Title candidates shorter than this are treated as section labels
const MIN_TITLE_CHARS: usize = 10;

pub struct HeuristicStrategy {
    min_len: usize,
}

impl HeuristicStrategy {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    /// First selector-table region that holds a paragraph cluster
    fn find_body(&self, doc: &Html) -> Vec<String> {
        for sel in selectors::CONTENT_SELECTORS.iter() {
            for region in doc.select(sel) {
                if in_noise(region) {
                    continue;
                }
                let paragraphs = collect_paragraphs(region);
                let total: usize = paragraphs.iter().map(|p| p.chars().count()).sum();
                if paragraphs.len() > MIN_REGION_PARAGRAPHS && total >= self.min_len {
                    return paragraphs;
                }
            }
        }
        // Last resort: every content paragraph on the page.
        collect_paragraphs(doc.root_element())
    }

    fn find_title(&self, doc: &Html) -> String {
        for sel in selectors::TITLE_SELECTORS.iter() {
            for el in doc.select(sel) {
                if in_noise(el) {
                    continue;
                }
                let title = element_text(el);
                if title.chars().count() >= MIN_TITLE_CHARS {
                    return title;
                }
            }
        }
        String::new()
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
}

impl ExtractStrategy for HeuristicStrategy {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn extract(&self, base_url: &Url, html: &str) -> Result<Extracted, ExtractError> {
        let doc = Html::parse_document(html);

        let paragraphs = self.find_body(&doc);
        let text = join_paragraphs(&paragraphs);
        check_length(&text, self.min_len)?;

        let top_image = meta_image(&doc, base_url).or_else(|| content_image(&doc, base_url));

        Ok(Extracted {
            title: self.find_title(&doc),
            text,
            authors: Vec::new(),
            published_at: None,
            top_image,
            summary: self.find_summary(&doc),
            keywords: Vec::new(),
        })
    }
}
