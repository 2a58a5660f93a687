//! Page feature extraction from raw HTML.
//!
//! Uses the `scraper` crate, which tolerates malformed markup: missing
//! elements produce empty strings and zero counts, never errors.

use scraper::{Html, Selector};

use crate::fetcher::ResponseMeta;
use crate::types::PageFeatures;

/// Extract page features from a fetched body.
///
/// Pages obtained through the HTTP fallback only yield the title and link
/// count; the other content fields stay `None`.
pub fn extract_features(html: &str, meta: &ResponseMeta) -> PageFeatures {
    let document = Html::parse_document(html);

    let mut features = PageFeatures {
        title: first_text(&document, "title"),
        link_count: count(&document, "a"),
        content_length: meta.content_length,
        has_ssl: meta.has_ssl,
        status_code: meta.status,
        ..Default::default()
    };

    if !meta.fallback {
        features.meta_description = Some(meta_description(&document));
        features.h1_count = Some(count(&document, "h1"));
        features.h2_count = Some(count(&document, "h2"));
        features.image_count = Some(count(&document, "img"));
    }

    features
}

// ── Selector helpers ────────────────────────────────────────────────────────

fn count(document: &Html, css: &str) -> u32 {
    Selector::parse(css)
        .map(|sel| document.select(&sel).count() as u32)
        .unwrap_or(0)
}

fn first_text(document: &Html, css: &str) -> String {
    let Ok(sel) = Selector::parse(css) else {
        return String::new();
    };
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn meta_description(document: &Html) -> String {
    let Ok(sel) = Selector::parse(r#"meta[name="description"]"#) else {
        return String::new();
    };
    document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn https_meta(len: u64) -> ResponseMeta {
        ResponseMeta {
            status: 200,
            content_length: len,
            has_ssl: true,
            fallback: false,
        }
    }

    #[test]
    fn test_extract_full_page() {
        let html = r#"
        <html><head>
        <title>  Example Domain Home  </title>
        <meta name="description" content="An example page used for documentation" />
        </head><body>
        <h1>Welcome</h1>
        <h2>One</h2><h2>Two</h2>
        <img src="a.png"><img src="b.png"><img src="c.png">
        <a href="/a">A</a><a href="/b">B</a>
        </body></html>
        "#;

        let features = extract_features(html, &https_meta(html.len() as u64));
        assert_eq!(features.title, "Example Domain Home");
        assert_eq!(
            features.meta_description.as_deref(),
            Some("An example page used for documentation")
        );
        assert_eq!(features.h1_count, Some(1));
        assert_eq!(features.h2_count, Some(2));
        assert_eq!(features.image_count, Some(3));
        assert_eq!(features.link_count, 2);
        assert_eq!(features.content_length, html.len() as u64);
        assert!(features.has_ssl);
        assert_eq!(features.status_code, 200);
    }

    #[test]
    fn test_missing_elements_default_to_empty() {
        let features = extract_features("<html><body><p>hi</p></body></html>", &https_meta(35));
        assert_eq!(features.title, "");
        assert_eq!(features.meta_description.as_deref(), Some(""));
        assert_eq!(features.h1_count, Some(0));
        assert_eq!(features.link_count, 0);
    }

    #[test]
    fn test_meta_name_is_case_sensitive() {
        let html = r#"<head><meta name="Description" content="upper"></head>"#;
        let features = extract_features(html, &https_meta(10));
        assert_eq!(features.meta_description.as_deref(), Some(""));
    }

    #[test]
    fn test_first_title_only() {
        let html = "<title>First</title><title>Second</title>";
        let features = extract_features(html, &https_meta(10));
        assert_eq!(features.title, "First");
    }

    #[test]
    fn test_malformed_markup_does_not_panic() {
        let html = "<html><head><title>Broken<h1><a href='x'>unclosed <img <<>> </div></span>";
        let features = extract_features(html, &https_meta(html.len() as u64));
        assert_eq!(features.image_count.map(|_| ()), Some(()));
    }

    #[test]
    fn test_fallback_page_leaves_content_fields_absent() {
        let html = r#"<title>Plain HTTP site</title><h1>x</h1><a href="/">home</a>"#;
        let meta = ResponseMeta {
            status: 200,
            content_length: html.len() as u64,
            has_ssl: false,
            fallback: true,
        };
        let features = extract_features(html, &meta);
        assert_eq!(features.title, "Plain HTTP site");
        assert_eq!(features.link_count, 1);
        assert!(!features.has_ssl);
        assert_eq!(features.meta_description, None);
        assert_eq!(features.h1_count, None);
        assert_eq!(features.h2_count, None);
        assert_eq!(features.image_count, None);
    }
}
