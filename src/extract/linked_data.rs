//! JSON-LD extractor
//!
//! Reads `<script type="application/ld+json">` blocks and maps the first
//! entity whose `@type` is on the allow-list onto a partial record.

use crate::extract::json_walk::{as_text, as_u64};
use crate::extract::normalize::{normalize_status, parse_mileage, parse_price, parse_small_int};
use crate::extract::{strip_image_query, Extractor, Page};
use crate::record::{PartialVehicle, Source};
use serde_json::Value;

/// Script content type carrying linked data
const LD_JSON: &str = "application/ld+json";

/// Entity types that describe a listing
const ACCEPTED_TYPES: &[&str] = &["Vehicle", "Car", "MotorVehicle", "Product", "Offer"];

/// Extracts from schema.org linked data
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkedDataExtractor;

impl Extractor for LinkedDataExtractor {
    fn source(&self) -> Source {
        Source::LinkedData
    }

    fn extract(&self, page: &Page) -> Option<PartialVehicle> {
        let entity = page
            .scripts_of_type(LD_JSON)
            .iter()
            .filter_map(|block| match serde_json::from_str::<Value>(block.trim()) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!("Skipping malformed JSON-LD block on {}: {}", page.url(), e);
                    None
                }
            })
            .find_map(first_accepted_entity)?;

        tracing::trace!("Found JSON-LD entity on {}", page.url());
        Some(map_entity(&entity, page))
    }
}

/// Returns the first accepted entity in a block (object, array or `@graph`)
fn first_accepted_entity(block: Value) -> Option<Value> {
    let candidates = match block {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("@graph") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                map.insert("@graph".to_string(), other);
                vec![Value::Object(map)]
            }
            None => vec![Value::Object(map)],
        },
        _ => return None,
    };

    candidates.into_iter().find(is_accepted_type)
}

fn is_accepted_type(entity: &Value) -> bool {
    match entity.get("@type") {
        Some(Value::String(t)) => ACCEPTED_TYPES.contains(&t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| ACCEPTED_TYPES.contains(&t)),
        _ => false,
    }
}

fn map_entity(entity: &Value, page: &Page) -> PartialVehicle {
    let field = |key: &str| entity.get(key).and_then(as_text);
    let offer = first_offer(entity);

    let mut partial = PartialVehicle::empty(Source::LinkedData);

    partial.make = entity
        .get("brand")
        .and_then(as_text)
        .or_else(|| entity.get("manufacturer").and_then(as_text));
    partial.model = field("model").or_else(|| {
        // "2019 Honda Civic EX" style names: drop the leading token
        field("name").and_then(|name| {
            let rest = name.split_whitespace().skip(1).collect::<Vec<_>>().join(" ");
            (!rest.is_empty()).then_some(rest)
        })
    });
    partial.year = ["vehicleModelDate", "modelDate", "productionDate"]
        .iter()
        .find_map(|key| entity.get(*key).and_then(|v| as_u64(v, parse_price)))
        .and_then(|y| u32::try_from(y).ok())
        .filter(|y| (1900..=2100).contains(y));
    partial.price = offer.and_then(|o| o.get("price")).and_then(|v| as_u64(v, parse_price));
    partial.mileage = entity
        .get("mileageFromOdometer")
        .and_then(|v| as_u64(v, parse_mileage));
    partial.transmission = field("vehicleTransmission");
    partial.drivetrain = field("driveWheelConfiguration");
    partial.body_type = field("bodyType");
    partial.exterior_color = field("color");
    partial.interior_color = field("vehicleInteriorColor");
    partial.fuel_type = field("fuelType");
    partial.engine = entity.get("vehicleEngine").and_then(engine_text);
    partial.doors = field("numberOfDoors").as_deref().and_then(parse_small_int);
    partial.seats = field("seatingCapacity");
    partial.seller_name = offer
        .and_then(|o| o.get("seller"))
        .and_then(as_text);
    partial.description = field("description");
    partial.images = entity.get("image").map(image_urls).unwrap_or_default();
    partial.vehicle_status = field("itemCondition")
        .or_else(|| offer.and_then(|o| o.get("itemCondition")).and_then(as_text))
        .as_deref()
        .and_then(normalize_status);
    partial.vin = field("vehicleIdentificationNumber");
    partial.stock_number = field("sku");

    if partial.images.is_empty() {
        tracing::trace!("JSON-LD entity on {} carries no images", page.url());
    }

    partial
}

/// `offers` may be a single object or an array; the first object wins
fn first_offer(entity: &Value) -> Option<&Value> {
    match entity.get("offers")? {
        Value::Array(items) => items.iter().find(|item| item.is_object()),
        offer @ Value::Object(_) => Some(offer),
        _ => None,
    }
}

fn engine_text(engine: &Value) -> Option<String> {
    match engine {
        Value::Object(map) => ["name", "engineType", "description"]
            .iter()
            .find_map(|key| map.get(*key).and_then(as_text)),
        other => as_text(other),
    }
}

/// `image` may be a URL, an `ImageObject`, or an array of either
fn image_urls(value: &Value) -> Vec<String> {
    match value {
        Value::String(url) => strip_image_query(url).into_iter().collect(),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(Value::as_str)
            .and_then(strip_image_query)
            .into_iter()
            .collect(),
        Value::Array(items) => items.iter().flat_map(image_urls).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn page(body: &str) -> Page {
        Page::parse(body, Url::parse("https://example.com/a/kia/soul/1").unwrap())
    }

    #[test]
    fn test_vehicle_entity() {
        let html = r#"<script type="application/ld+json">
        {
            "@context": "https://schema.org",
            "@type": "Car",
            "name": "2020 Kia Soul EX",
            "brand": {"@type": "Brand", "name": "Kia"},
            "vehicleModelDate": "2020",
            "mileageFromOdometer": {"@type": "QuantitativeValue", "value": "45,000", "unitCode": "KMT"},
            "vehicleIdentificationNumber": "KNDJ23AU5L7000001",
            "numberOfDoors": 4,
            "vehicleEngine": {"@type": "EngineSpecification", "name": "2.0L I4"},
            "itemCondition": "https://schema.org/UsedCondition",
            "image": ["https://img.example.com/a.jpg?x=1", {"url": "https://img.example.com/b.jpg"}],
            "offers": {"@type": "Offer", "price": 21500, "priceCurrency": "CAD", "seller": {"name": "Soul Shop"}}
        }
        </script>"#;
        let partial = LinkedDataExtractor.extract(&page(html)).unwrap();

        assert_eq!(partial.source, Source::LinkedData);
        assert_eq!(partial.make.as_deref(), Some("Kia"));
        assert_eq!(partial.model.as_deref(), Some("Kia Soul EX"));
        assert_eq!(partial.year, Some(2020));
        assert_eq!(partial.mileage, Some(45000));
        assert_eq!(partial.price, Some(21500));
        assert_eq!(partial.vin.as_deref(), Some("KNDJ23AU5L7000001"));
        assert_eq!(partial.doors, Some(4));
        assert_eq!(partial.engine.as_deref(), Some("2.0L I4"));
        assert_eq!(partial.vehicle_status.as_deref(), Some("Used"));
        assert_eq!(partial.seller_name.as_deref(), Some("Soul Shop"));
        assert_eq!(
            partial.images,
            vec!["https://img.example.com/a.jpg", "https://img.example.com/b.jpg"]
        );
    }

    #[test]
    fn test_skips_unaccepted_types_and_bad_blocks() {
        let html = r#"
        <script type="application/ld+json">{ not json </script>
        <script type="application/ld+json">{"@type": "BreadcrumbList", "name": "crumbs"}</script>
        <script type="application/ld+json">[
            {"@type": "Organization", "name": "Site"},
            {"@type": ["Product", "Car"], "model": "Corolla", "manufacturer": "Toyota",
             "offers": [{"price": "$18,250"}]}
        ]</script>"#;
        let partial = LinkedDataExtractor.extract(&page(html)).unwrap();

        assert_eq!(partial.make.as_deref(), Some("Toyota"));
        assert_eq!(partial.model.as_deref(), Some("Corolla"));
        assert_eq!(partial.price, Some(18250));
    }

    #[test]
    fn test_graph_container() {
        let html = r#"<script type="application/ld+json">
            {"@context": "https://schema.org", "@graph": [
                {"@type": "WebPage"},
                {"@type": "Vehicle", "brand": "Ford", "model": "F-150"}
            ]}
        </script>"#;
        let partial = LinkedDataExtractor.extract(&page(html)).unwrap();
        assert_eq!(partial.make.as_deref(), Some("Ford"));
    }

    #[test]
    fn test_no_matching_entity() {
        let html = r#"<script type="application/ld+json">{"@type": "Organization"}</script>"#;
        assert!(LinkedDataExtractor.extract(&page(html)).is_none());
        assert!(LinkedDataExtractor.extract(&page("<html></html>")).is_none());
    }
}
