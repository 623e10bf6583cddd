//! Detail link discovery for search result pages
//!
//! Links are resolved against the page's own final URL, so mirrors and
//! redirected hosts keep working. Each qualifying URL is normalized and
//! checked against the run's seen-set; only novel URLs are returned, and
//! they are marked seen in the same step.

use crate::extract::Page;
use crate::state::SeenUrls;
use crate::url::{is_detail_url, normalize};
use url::Url;

/// Returns the unseen detail URLs on a search result page, in page order
///
/// # Arguments
///
/// * `page` - The parsed search result page
/// * `seen` - The run's seen-set; returned URLs are added to it
///
/// # Example
///
/// ```
/// use autotrawl::crawler::discover_links;
/// use autotrawl::extract::Page;
/// use autotrawl::state::SeenUrls;
/// use url::Url;
///
/// let html = r#"<a href="/a/honda/civic/toronto/ontario/5_1_a/">Civic</a><a href="/about">About</a>"#;
/// let page = Page::parse(html, Url::parse("https://example.com/cars/honda/").unwrap());
/// let mut seen = SeenUrls::new();
///
/// let links = discover_links(&page, &mut seen);
/// assert_eq!(links.len(), 1);
/// assert!(discover_links(&page, &mut seen).is_empty());
/// ```
pub fn discover_links(page: &Page, seen: &mut SeenUrls) -> Vec<Url> {
    let mut links = Vec::new();

    for element in page.select_all("a[href]") {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, page.url()))
        else {
            continue;
        };

        if is_detail_url(&url) && seen.insert(&url) {
            links.push(url);
        }
    }

    tracing::trace!("Found {} new detail links on {}", links.len(), page.url());
    links
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    // Skip empty hrefs
    if href.is_empty() {
        return None;
    }

    // Skip special schemes
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    // Skip fragment-only links (same page anchors)
    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(normalize(absolute_url))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> Page {
        Page::parse(html, Url::parse("https://mirror.example.com/cars/honda/civic/?rcp=15&rcs=0").unwrap())
    }

    const LIST_PAGE: &str = r##"<html><body>
        <a href="/a/honda/civic/toronto/ontario/5_1_a/">One</a>
        <a href="https://mirror.example.com/a/honda/civic/toronto/ontario/5_2_b/#photos">Two</a>
        <a href="/a/honda/civic/toronto/ontario/5_1_a/">One again</a>
        <a href="/a/honda/civic/ottawa/ontario/5_3_c/?utm_source=list">Three</a>
        <a href="/cars/honda/civic/?rcs=15">Next</a>
        <a href="mailto:sales@example.com">Mail</a>
        <a href="#top">Top</a>
        <a href="/a/brochure.pdf" download>Brochure</a>
    </body></html>"##;

    #[test]
    fn test_relative_links_resolve_against_page() {
        let mut seen = SeenUrls::new();
        let links = discover_links(&page(LIST_PAGE), &mut seen);

        let urls: Vec<&str> = links.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://mirror.example.com/a/honda/civic/toronto/ontario/5_1_a/",
                "https://mirror.example.com/a/honda/civic/toronto/ontario/5_2_b/",
                "https://mirror.example.com/a/honda/civic/ottawa/ontario/5_3_c/",
            ]
        );
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_second_call_yields_nothing_new() {
        let page = page(LIST_PAGE);
        let mut seen = SeenUrls::new();

        let first = discover_links(&page, &mut seen);
        let second = discover_links(&page, &mut seen);

        assert_eq!(first.len(), 3);
        assert!(second.is_empty());
    }

    #[test]
    fn test_already_seen_urls_are_skipped() {
        let mut seen = SeenUrls::new();
        seen.insert(&Url::parse("https://mirror.example.com/a/honda/civic/toronto/ontario/5_1_a/").unwrap());

        let links = discover_links(&page(LIST_PAGE), &mut seen);
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|url| !url.path().ends_with("5_1_a/")));
    }

    #[test]
    fn test_resolve_link_exclusions() {
        let base = Url::parse("https://example.com/cars/").unwrap();
        assert!(resolve_link("javascript:void(0)", &base).is_none());
        assert!(resolve_link("tel:5550100", &base).is_none());
        assert!(resolve_link("  ", &base).is_none());
        assert!(resolve_link("ftp://example.com/a/x", &base).is_none());
        assert_eq!(
            resolve_link("../a/kia/soul/1", &base).map(String::from),
            Some("https://example.com/a/kia/soul/1".to_string())
        );
    }
}
