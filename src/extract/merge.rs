//! Merge engine
//!
//! Reduces the partial records of one detail page into a single
//! [`VehicleRecord`]. Scalar fields take the first present, non-empty value
//! in priority order; image and feature lists are unioned in priority order.

use crate::extract::normalize::{format_mileage, format_price};
use crate::record::{PartialVehicle, VehicleRecord};

/// Merges partial records for the page at `url`
///
/// # Arguments
///
/// * `partials` - Extractor output for one page, in any order
/// * `url` - Source URL stored on the record
///
/// # Returns
///
/// The merged record, or `None` if no source supplied make, model or price.
pub fn merge(partials: &[PartialVehicle], url: &str) -> Option<VehicleRecord> {
    let mut ordered: Vec<&PartialVehicle> = partials.iter().collect();
    ordered.sort_by_key(|p| p.rank());

    let mut record = VehicleRecord {
        ad_id: first_text(&ordered, |p| p.ad_id.as_deref()),
        make: first_text(&ordered, |p| p.make.as_deref()),
        model: first_text(&ordered, |p| p.model.as_deref()),
        year: first_value(&ordered, |p| p.year),
        trim: first_text(&ordered, |p| p.trim.as_deref()),
        price: first_value(&ordered, |p| p.price),
        price_formatted: first_text(&ordered, |p| p.price_formatted.as_deref()),
        mileage: first_value(&ordered, |p| p.mileage),
        mileage_formatted: first_text(&ordered, |p| p.mileage_formatted.as_deref()),
        transmission: first_text(&ordered, |p| p.transmission.as_deref()),
        drivetrain: first_text(&ordered, |p| p.drivetrain.as_deref()),
        body_type: first_text(&ordered, |p| p.body_type.as_deref()),
        exterior_color: first_text(&ordered, |p| p.exterior_color.as_deref()),
        interior_color: first_text(&ordered, |p| p.interior_color.as_deref()),
        fuel_type: first_text(&ordered, |p| p.fuel_type.as_deref()),
        engine: first_text(&ordered, |p| p.engine.as_deref()),
        doors: first_value(&ordered, |p| p.doors),
        seats: first_text(&ordered, |p| p.seats.as_deref()),
        city: first_text(&ordered, |p| p.city.as_deref()),
        province: first_text(&ordered, |p| p.province.as_deref()),
        seller_name: first_text(&ordered, |p| p.seller_name.as_deref()),
        is_private_seller: first_value(&ordered, |p| p.is_private_seller),
        dealer_id: first_text(&ordered, |p| p.dealer_id.as_deref()),
        description: first_text(&ordered, |p| p.description.as_deref()),
        images: union(&ordered, |p| &p.images),
        vehicle_status: first_text(&ordered, |p| p.vehicle_status.as_deref()),
        vin: first_text(&ordered, |p| p.vin.as_deref()),
        stock_number: first_text(&ordered, |p| p.stock_number.as_deref()),
        features: union(&ordered, |p| &p.features),
        url: url.to_string(),
    };

    if record.price_formatted.is_none() {
        record.price_formatted = record.price.map(format_price);
    }
    if record.mileage_formatted.is_none() {
        record.mileage_formatted = record.mileage.map(format_mileage);
    }

    if !record.has_anchor() {
        tracing::debug!("Rejecting {}: no make, model or price", url);
        return None;
    }

    Some(record)
}

fn first_text(ordered: &[&PartialVehicle], field: fn(&PartialVehicle) -> Option<&str>) -> Option<String> {
    ordered
        .iter()
        .filter_map(|p| field(p))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_value<T>(ordered: &[&PartialVehicle], field: fn(&PartialVehicle) -> Option<T>) -> Option<T> {
    ordered.iter().find_map(|p| field(p))
}

/// Order-preserving union with duplicates and blanks dropped
fn union(ordered: &[&PartialVehicle], field: fn(&PartialVehicle) -> &Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for item in ordered.iter().flat_map(|p| field(p)) {
        let item = item.trim();
        if !item.is_empty() && !merged.iter().any(|m| m == item) {
            merged.push(item.to_string());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Source;

    const URL: &str = "https://example.com/a/honda/civic/1";

    fn partial(source: Source) -> PartialVehicle {
        PartialVehicle::empty(source)
    }

    #[test]
    fn test_higher_priority_wins() {
        let mut p1 = partial(Source::StructuredModel);
        p1.make = Some("A".to_string());
        let mut p2 = partial(Source::LinkedData);
        p2.make = Some("B".to_string());

        let record = merge(&[p1.clone(), p2.clone()], URL).unwrap();
        assert_eq!(record.make.as_deref(), Some("A"));

        // Input order does not matter, rank does
        let record = merge(&[p2, p1], URL).unwrap();
        assert_eq!(record.make.as_deref(), Some("A"));
    }

    #[test]
    fn test_absent_or_empty_falls_through() {
        let mut p1 = partial(Source::StructuredModel);
        p1.model = Some("  ".to_string());
        let mut p2 = partial(Source::LinkedData);
        p2.make = Some("B".to_string());
        p2.model = Some("Civic".to_string());

        let record = merge(&[p1, p2], URL).unwrap();
        assert_eq!(record.make.as_deref(), Some("B"));
        assert_eq!(record.model.as_deref(), Some("Civic"));
    }

    #[test]
    fn test_lists_are_unioned_in_priority_order() {
        let mut p1 = partial(Source::StructuredModel);
        p1.make = Some("Honda".to_string());
        p1.images = vec!["https://img/1.jpg".to_string(), "https://img/2.jpg".to_string()];
        p1.features = vec!["Sunroof".to_string()];
        let mut p3 = partial(Source::Dom);
        p3.images = vec!["https://img/2.jpg".to_string(), "https://img/3.jpg".to_string()];
        p3.features = vec!["Sunroof".to_string(), "".to_string(), "Heated Seats".to_string()];

        let record = merge(&[p3, p1], URL).unwrap();
        assert_eq!(record.images, vec!["https://img/1.jpg", "https://img/2.jpg", "https://img/3.jpg"]);
        assert_eq!(record.features, vec!["Sunroof", "Heated Seats"]);
    }

    #[test]
    fn test_display_strings_are_back_filled() {
        let mut p1 = partial(Source::StructuredModel);
        p1.make = Some("Honda".to_string());
        p1.price = Some(24995);
        let dom = partial(Source::Dom);

        let record = merge(&[p1, dom], URL).unwrap();
        assert_eq!(record.price_formatted.as_deref(), Some("$24,995"));
        assert_eq!(record.mileage_formatted, None);

        let mut p1 = partial(Source::StructuredModel);
        p1.price = Some(24995);
        p1.price_formatted = Some("$24,995 + tax".to_string());
        p1.mileage = Some(112340);
        let record = merge(&[p1], URL).unwrap();
        assert_eq!(record.price_formatted.as_deref(), Some("$24,995 + tax"));
        assert_eq!(record.mileage_formatted.as_deref(), Some("112,340 km"));
    }

    #[test]
    fn test_structured_only_record_keeps_other_fields_null() {
        let mut p1 = partial(Source::StructuredModel);
        p1.make = Some("Honda".to_string());
        p1.price = Some(24995);

        let record = merge(&[p1, partial(Source::Dom)], URL).unwrap();
        let expected = VehicleRecord {
            make: Some("Honda".to_string()),
            price: Some(24995),
            price_formatted: Some("$24,995".to_string()),
            url: URL.to_string(),
            ..Default::default()
        };
        assert_eq!(record, expected);
    }

    #[test]
    fn test_rejects_without_anchor() {
        let mut p1 = partial(Source::StructuredModel);
        p1.year = Some(2019);
        p1.images = vec!["https://img/1.jpg".to_string()];

        assert!(merge(&[p1, partial(Source::Dom)], URL).is_none());
        assert!(merge(&[], URL).is_none());
    }
}
