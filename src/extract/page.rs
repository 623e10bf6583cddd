//! Parsed page handle
//!
//! Wraps a parsed HTML document together with the URL it was served from.
//! All lookups are failure-tolerant: an invalid selector or a missing
//! element reads as "absent".

use crate::extract::normalize::clean_text;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A fetched page ready for link discovery or extraction
pub struct Page {
    url: Url,
    document: Html,
}

impl Page {
    /// Parses HTML served from `url`
    ///
    /// `url` should be the final URL after redirects so relative links
    /// resolve against the page that actually answered.
    pub fn parse(html: &str, url: Url) -> Self {
        Self {
            url,
            document: Html::parse_document(html),
        }
    }

    /// The URL the page was served from
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The underlying parsed document
    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Returns all elements matching `selector`, or nothing if it does not parse
    pub fn select_all(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(selector) {
            Ok(sel) => self.document.select(&sel).collect(),
            Err(_) => {
                tracing::trace!("Ignoring unparseable selector: {}", selector);
                Vec::new()
            }
        }
    }

    /// Tries each selector in order and returns the first non-empty text
    pub fn first_text(&self, selectors: &[&str]) -> Option<String> {
        selectors.iter().find_map(|selector| {
            self.select_all(selector)
                .into_iter()
                .find_map(|element| element_text(&element))
        })
    }

    /// Returns true if any element matches `selector`
    pub fn exists(&self, selector: &str) -> bool {
        !self.select_all(selector).is_empty()
    }

    /// Raw contents of every `<script>` element, in document order
    pub fn scripts(&self) -> Vec<String> {
        self.select_all("script")
            .into_iter()
            .map(|element| element.text().collect::<String>())
            .collect()
    }

    /// Raw contents of `<script type="...">` elements of the given type
    pub fn scripts_of_type(&self, content_type: &str) -> Vec<String> {
        self.select_all("script[type]")
            .into_iter()
            .filter(|element| {
                element
                    .value()
                    .attr("type")
                    .is_some_and(|t| t.trim().eq_ignore_ascii_case(content_type))
            })
            .map(|element| element.text().collect::<String>())
            .collect()
    }

    /// Raw contents of the `<script>` element with the given id
    pub fn script_by_id(&self, id: &str) -> Option<String> {
        self.select_all("script[id]")
            .into_iter()
            .find(|element| element.value().attr("id") == Some(id))
            .map(|element| element.text().collect::<String>())
    }

    /// Resolves an href or src against the page URL
    pub fn resolve(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with("data:") || href.starts_with("javascript:") {
            return None;
        }
        self.url.join(href).ok()
    }
}

/// Whitespace-normalized text content of an element
pub fn element_text(element: &ElementRef<'_>) -> Option<String> {
    clean_text(&element.text().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> Page {
        Page::parse(html, Url::parse("https://example.com/a/honda/civic/1").unwrap())
    }

    #[test]
    fn test_first_text_skips_empty_candidates() {
        let page = page(
            r#"<html><body>
            <span class="price"></span>
            <div class="hero-price"> $24,995 </div>
            </body></html>"#,
        );
        let text = page.first_text(&[".price", ".hero-price"]);
        assert_eq!(text, Some("$24,995".to_string()));
    }

    #[test]
    fn test_invalid_selector_is_absent() {
        let page = page("<html><body><p>hi</p></body></html>");
        assert_eq!(page.first_text(&["p[", "p"]), Some("hi".to_string()));
        assert!(!page.exists("p["));
    }

    #[test]
    fn test_scripts_of_type() {
        let page = page(
            r#"<html><head>
            <script>var a = 1;</script>
            <script type="application/ld+json">{"@type":"Car"}</script>
            </head></html>"#,
        );
        assert_eq!(page.scripts().len(), 2);
        assert_eq!(
            page.scripts_of_type("application/ld+json"),
            vec![r#"{"@type":"Car"}"#.to_string()]
        );
    }

    #[test]
    fn test_script_by_id() {
        let page = page(r#"<html><body><script id="__NEXT_DATA__">{"a":1}</script></body></html>"#);
        assert_eq!(page.script_by_id("__NEXT_DATA__"), Some(r#"{"a":1}"#.to_string()));
        assert_eq!(page.script_by_id("missing"), None);
    }

    #[test]
    fn test_resolve_relative() {
        let page = page("<html></html>");
        assert_eq!(
            page.resolve("/img/1.jpg").unwrap().as_str(),
            "https://example.com/img/1.jpg"
        );
        assert!(page.resolve("javascript:void(0)").is_none());
        assert!(page.resolve("  ").is_none());
    }
}
