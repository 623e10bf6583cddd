//! Detail-page extraction
//!
//! Three independent extractors each read a [`Page`] and produce a
//! [`PartialVehicle`] or nothing. They run in priority order and the
//! [`merge`] reducer combines their output into one [`VehicleRecord`].

pub mod dom;
pub mod json_walk;
pub mod linked_data;
pub mod merge;
pub mod normalize;
pub mod page;
pub mod structured;

use crate::record::{PartialVehicle, Source, VehicleRecord};

pub use dom::DomExtractor;
pub use linked_data::LinkedDataExtractor;
pub use merge::merge;
pub use normalize::{format_mileage, format_price, parse_mileage, parse_price};
pub use page::Page;
pub use structured::StructuredModelExtractor;

/// A source of partial vehicle data
///
/// Implementations must not panic or surface errors: anything they cannot
/// read is simply absent from the partial record.
pub trait Extractor: Send + Sync {
    /// Which source this extractor reads, and therefore its merge priority
    fn source(&self) -> Source;

    /// Extracts what it can from the page
    fn extract(&self, page: &Page) -> Option<PartialVehicle>;
}

/// The extractors in priority order
pub fn default_extractors() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(StructuredModelExtractor),
        Box::new(LinkedDataExtractor),
        Box::new(DomExtractor),
    ]
}

/// Runs every extractor over the page, highest priority first
pub fn run_pipeline(extractors: &[Box<dyn Extractor>], page: &Page) -> Vec<PartialVehicle> {
    let mut partials: Vec<PartialVehicle> = extractors
        .iter()
        .filter_map(|extractor| {
            let partial = extractor.extract(page);
            if partial.is_none() {
                tracing::trace!("{} extractor found nothing on {}", extractor.source(), page.url());
            }
            partial
        })
        .collect();

    partials.sort_by_key(PartialVehicle::rank);
    partials
}

/// Extracts and merges a detail page into a record, or `None` if rejected
pub fn extract_vehicle(extractors: &[Box<dyn Extractor>], page: &Page) -> Option<VehicleRecord> {
    let partials = run_pipeline(extractors, page);
    merge(&partials, page.url().as_str())
}

/// Drops the query string and fragment from an image URL
///
/// Returns `None` for blank input.
pub fn strip_image_query(src: &str) -> Option<String> {
    let src = src.trim();
    let end = src.find(['?', '#']).unwrap_or(src.len());
    let stripped = &src[..end];

    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_strip_image_query() {
        assert_eq!(
            strip_image_query(" https://img.example.com/1.jpg?w=640#top "),
            Some("https://img.example.com/1.jpg".to_string())
        );
        assert_eq!(strip_image_query("?w=1"), None);
        assert_eq!(strip_image_query(""), None);
    }

    #[test]
    fn test_pipeline_orders_by_priority() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type": "Car", "brand": "Mazda", "model": "3"}</script>
            <script>window['ngVdpModel'] = {"make": "Mazda", "model": "Mazda3", "price": 19990};</script>
            </head><body><h1>2018 Mazda 3 GS</h1></body></html>"#;
        let page = Page::parse(html, Url::parse("https://example.com/a/mazda/3/x/y/7_1_2/").unwrap());
        let partials = run_pipeline(&default_extractors(), &page);

        let sources: Vec<Source> = partials.iter().map(|p| p.source).collect();
        assert_eq!(sources, vec![Source::StructuredModel, Source::LinkedData, Source::Dom]);

        let record = extract_vehicle(&default_extractors(), &page).unwrap();
        assert_eq!(record.model.as_deref(), Some("Mazda3"));
        assert_eq!(record.year, Some(2018));
        assert_eq!(record.price_formatted.as_deref(), Some("$19,990"));
    }

    #[test]
    fn test_pipeline_without_structured_sources() {
        let page = Page::parse("<html><body></body></html>", Url::parse("https://example.com/a/x").unwrap());
        let partials = run_pipeline(&default_extractors(), &page);

        assert_eq!(partials.len(), 1);
        assert_eq!(partials[0].source, Source::Dom);
        assert!(extract_vehicle(&default_extractors(), &page).is_none());
    }
}
