//! Embedded data-model extractor
//!
//! Listing pages ship their full data model as JSON assigned to a page-global
//! variable. This extractor finds the payload, then looks up every field
//! with [`json_walk`](crate::extract::json_walk) under the key aliases used by
//! the different site revisions.

use crate::extract::json_walk::{
    as_bool, as_text, as_text_list, as_u64, find_map, find_object, find_text, DEFAULT_MAX_DEPTH,
};
use crate::extract::normalize::{normalize_status, parse_mileage, parse_price};
use crate::extract::{strip_image_query, Extractor, Page};
use crate::record::{PartialVehicle, Source};
use crate::url::ad_id_from_url;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// `window['ngVdpModel'] = {...}` and `window.ngVdpModel = {...}`
static MODEL_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"window(?:\[\s*['"]ngVdpModel['"]\s*\]|\.ngVdpModel)\s*=\s*"#)
        .expect("model assignment pattern is valid")
});

/// Script id used by server-rendered revisions of the site
const NEXT_DATA_ID: &str = "__NEXT_DATA__";

/// Depth budget inside the seller sub-object
const SELLER_DEPTH: usize = 3;

/// Extracts from the embedded page model
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredModelExtractor;

impl Extractor for StructuredModelExtractor {
    fn source(&self) -> Source {
        Source::StructuredModel
    }

    fn extract(&self, page: &Page) -> Option<PartialVehicle> {
        let model = locate_payload(page)?;
        tracing::trace!("Found embedded page model on {}", page.url());
        Some(map_model(&model, page))
    }
}

/// Finds and parses the embedded model, trying each known pattern
fn locate_payload(page: &Page) -> Option<Value> {
    for script in page.scripts() {
        if let Some(found) = MODEL_ASSIGNMENT.find(&script) {
            if let Some(value) = parse_leading_object(&script[found.end()..]) {
                return Some(value);
            }
        }
    }

    page.script_by_id(NEXT_DATA_ID)
        .and_then(|content| parse_leading_object(&content))
}

/// Parses the first JSON value in `text`, ignoring whatever follows it
fn parse_leading_object(text: &str) -> Option<Value> {
    let mut values = serde_json::Deserializer::from_str(text.trim_start()).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) if value.is_object() => Some(value),
        Some(Err(e)) => {
            tracing::debug!("Embedded page model is not valid JSON: {}", e);
            None
        }
        _ => None,
    }
}

fn map_model(model: &Value, page: &Page) -> PartialVehicle {
    let depth = DEFAULT_MAX_DEPTH;
    let text = |keys: &[&str]| find_text(model, keys, depth);
    let seller = find_object(model, &["seller", "dealer", "dealerInfo"], depth);
    let seller_text = |keys: &[&str]| seller.and_then(|s| find_text(s, keys, SELLER_DEPTH));

    let mut partial = PartialVehicle::empty(Source::StructuredModel);

    partial.ad_id = text(&["adId", "adID", "listingId"]).or_else(|| ad_id_from_url(page.url()));
    partial.make = text(&["make", "makeName"]);
    partial.model = text(&["model", "modelName"]);
    partial.year = find_map(model, &["year", "modelYear"], depth, |v| {
        as_u64(v, parse_price).and_then(plausible_year)
    });
    partial.trim = text(&["trim", "trimName"]);
    partial.price = find_map(model, &["price", "listPrice", "amount"], depth, |v| {
        as_u64(v, parse_price)
    });
    partial.price_formatted = text(&["displayPrice", "formattedPrice"]);
    partial.mileage = find_map(model, &["mileage", "odometer", "kilometres"], depth, |v| {
        as_u64(v, parse_mileage)
    });
    partial.mileage_formatted = text(&["displayMileage", "formattedMileage"]);
    partial.transmission = text(&["transmission"]);
    partial.drivetrain = text(&["drivetrain", "driveTrain", "driveType"]);
    partial.body_type = text(&["bodyType", "bodyStyle", "body"]);
    partial.exterior_color = text(&["exteriorColour", "exteriorColor", "colour", "color"]);
    partial.interior_color = text(&["interiorColour", "interiorColor"]);
    partial.fuel_type = text(&["fuelType", "fuel"]);
    partial.engine = text(&["engine", "engineDescription"]);
    partial.doors = find_map(model, &["doors", "numberOfDoors"], depth, |v| {
        as_u64(v, parse_price).and_then(|n| u32::try_from(n).ok())
    });
    partial.seats = text(&["seatingCapacity", "seats", "passengers"]);

    partial.city = seller_text(&["city"]).or_else(|| text(&["city"]));
    partial.province = seller_text(&["province", "state"]).or_else(|| text(&["province"]));
    partial.seller_name = seller_text(&["name", "dealerName", "sellerName"])
        .or_else(|| text(&["dealerName", "sellerName"]));
    let private_keys = ["isPrivate", "privateSeller", "isPrivateSeller"];
    partial.is_private_seller = seller
        .and_then(|s| find_map(s, &private_keys, SELLER_DEPTH, as_bool))
        .or_else(|| find_map(model, &private_keys, depth, as_bool));
    partial.dealer_id = seller_text(&["dealerId", "id"]).or_else(|| text(&["dealerId"]));

    partial.description = text(&["description"]);
    partial.images = find_map(model, &["images", "gallery", "photos"], depth, image_list)
        .unwrap_or_default();
    partial.vehicle_status = find_map(model, &["status", "vehicleStatus", "condition"], depth, |v| {
        as_text(v).as_deref().and_then(normalize_status)
    });
    partial.vin = text(&["vin", "VIN"]);
    partial.stock_number = text(&["stockNumber", "stock"]);
    partial.features = find_map(model, &["features"], depth, as_text_list).unwrap_or_default();

    partial
}

fn plausible_year(year: u64) -> Option<u32> {
    (1900..=2100).contains(&year).then_some(year as u32)
}

/// Reads an image list: strings, or objects with `url`, `src` or `href`
fn image_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    let images: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => ["url", "src", "href"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str)),
            _ => None,
        })
        .filter_map(strip_image_query)
        .collect();

    if images.is_empty() {
        None
    } else {
        Some(images)
    }
}
