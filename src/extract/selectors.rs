//! CSS selectors shared by the extraction strategies
//!
//! Pre-parsed once; the selector strings are compile-time constants so a
//! parse failure is a programming error.

use lazy_static::lazy_static;
use scraper::Selector;

// Helper macro to parse selectors safely
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

/// Element names whose subtrees never contain article text
pub const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "noscript",
];

lazy_static! {
    /// Structural selectors for the main content region, in priority order
    pub static ref CONTENT_SELECTORS: Vec<Selector> = vec![
        parse_selector!("article"),
        parse_selector!(".article-content"),
        parse_selector!(".post-content"),
        parse_selector!(".entry-content"),
        parse_selector!(".article-body"),
        parse_selector!(".story-body"),
        parse_selector!(".content"),
        parse_selector!("main"),
    ];

    /// Title selectors, in priority order
    pub static ref TITLE_SELECTORS: Vec<Selector> = vec![
        parse_selector!("h1"),
        parse_selector!(".article-title"),
        parse_selector!(".post-title"),
        parse_selector!(".entry-title"),
        parse_selector!(".headline"),
        parse_selector!("title"),
    ];

    /// Meta-tag image selectors; preferred over in-content images
    pub static ref META_IMAGE_SELECTORS: Vec<Selector> = vec![
        parse_selector!(r#"meta[property="og:image"]"#),
        parse_selector!(r#"meta[name="twitter:image"]"#),
    ];

    /// In-content image selectors
    pub static ref CONTENT_IMAGE_SELECTORS: Vec<Selector> = vec![
        parse_selector!(".article-image img"),
        parse_selector!(".featured-image img"),
        parse_selector!("article img"),
    ];

    /// Paragraph-level text units
    pub static ref PARAGRAPH: Selector = parse_selector!("p");

    // Structured-metadata selectors

    pub static ref OG_TITLE: Selector = parse_selector!(r#"meta[property="og:title"]"#);
    pub static ref OG_DESCRIPTION: Vec<Selector> = vec![
        parse_selector!(r#"meta[property="og:description"]"#),
        parse_selector!(r#"meta[name="description"]"#),
    ];
    pub static ref META_AUTHOR: Vec<Selector> = vec![
        parse_selector!(r#"meta[name="author"]"#),
        parse_selector!(r#"meta[property="article:author"]"#),
    ];
    pub static ref META_PUBLISHED: Vec<Selector> = vec![
        parse_selector!(r#"meta[property="article:published_time"]"#),
        parse_selector!(r#"meta[name="pubdate"]"#),
    ];
    pub static ref TIME_DATETIME: Selector = parse_selector!("time[datetime]");
    pub static ref META_KEYWORDS: Vec<Selector> = vec![
        parse_selector!(r#"meta[name="news_keywords"]"#),
        parse_selector!(r#"meta[name="keywords"]"#),
    ];
    pub static ref ARTICLE_REGION: Selector = parse_selector!("article");

    /// Density candidates: block containers that can host the main text
    pub static ref DENSITY_CANDIDATES: Selector =
        parse_selector!("article, main, section, div, td");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_selector_tables_parse() {
        // lazy_static panics on first touch if a selector is bad
        assert_eq!(CONTENT_SELECTORS.len(), 8);
        assert_eq!(TITLE_SELECTORS.len(), 6);
        assert_eq!(META_IMAGE_SELECTORS.len(), 2);
        assert_eq!(CONTENT_IMAGE_SELECTORS.len(), 3);
        let _ = &*OG_TITLE;
        let _ = &*TIME_DATETIME;
        let _ = &*DENSITY_CANDIDATES;
    }
}
