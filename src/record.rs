//! Vehicle record types
//!
//! `VehicleRecord` is the accepted, merged output for one listing page.
//! `PartialVehicle` is what a single extractor managed to recover from a page;
//! every field may be missing.

use serde::Serialize;
use std::fmt;

/// The extractor that produced a partial record, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// JSON data model assigned to a page-global variable
    StructuredModel,
    /// `application/ld+json` markup
    LinkedData,
    /// Selector heuristics over the visible markup
    Dom,
}

impl Source {
    /// Priority rank; 1 is consulted first during a merge
    pub fn rank(&self) -> u8 {
        match self {
            Self::StructuredModel => 1,
            Self::LinkedData => 2,
            Self::Dom => 3,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StructuredModel => "structured-model",
            Self::LinkedData => "linked-data",
            Self::Dom => "dom",
        };
        write!(f, "{}", name)
    }
}

/// A normalized vehicle listing
///
/// Field order is the serialized column order. Absent values serialize as
/// `null`; the list fields serialize as (possibly empty) arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleRecord {
    pub ad_id: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<u32>,
    pub trim: Option<String>,
    pub price: Option<u64>,
    pub price_formatted: Option<String>,
    pub mileage: Option<u64>,
    pub mileage_formatted: Option<String>,
    pub transmission: Option<String>,
    pub drivetrain: Option<String>,
    pub body_type: Option<String>,
    pub exterior_color: Option<String>,
    pub interior_color: Option<String>,
    pub fuel_type: Option<String>,
    pub engine: Option<String>,
    pub doors: Option<u32>,
    pub seats: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub seller_name: Option<String>,
    pub is_private_seller: Option<bool>,
    pub dealer_id: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub vehicle_status: Option<String>,
    pub vin: Option<String>,
    pub stock_number: Option<String>,
    pub features: Vec<String>,
    pub url: String,
}

impl VehicleRecord {
    /// Returns true if at least one of make, model or price is present
    pub fn has_anchor(&self) -> bool {
        self.make.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.model.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.price.is_some()
    }

    /// Short human label used in log lines
    pub fn label(&self) -> String {
        let parts: Vec<String> = [
            self.year.map(|y| y.to_string()),
            self.make.clone(),
            self.model.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            self.url.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// One extractor's view of a listing page
#[derive(Debug, Clone, PartialEq)]
pub struct PartialVehicle {
    pub source: Source,
    pub ad_id: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<u32>,
    pub trim: Option<String>,
    pub price: Option<u64>,
    pub price_formatted: Option<String>,
    pub mileage: Option<u64>,
    pub mileage_formatted: Option<String>,
    pub transmission: Option<String>,
    pub drivetrain: Option<String>,
    pub body_type: Option<String>,
    pub exterior_color: Option<String>,
    pub interior_color: Option<String>,
    pub fuel_type: Option<String>,
    pub engine: Option<String>,
    pub doors: Option<u32>,
    pub seats: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub seller_name: Option<String>,
    pub is_private_seller: Option<bool>,
    pub dealer_id: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub vehicle_status: Option<String>,
    pub vin: Option<String>,
    pub stock_number: Option<String>,
    pub features: Vec<String>,
}

impl PartialVehicle {
    /// Creates an empty partial record tagged with its producer
    pub fn empty(source: Source) -> Self {
        Self {
            source,
            ad_id: None,
            make: None,
            model: None,
            year: None,
            trim: None,
            price: None,
            price_formatted: None,
            mileage: None,
            mileage_formatted: None,
            transmission: None,
            drivetrain: None,
            body_type: None,
            exterior_color: None,
            interior_color: None,
            fuel_type: None,
            engine: None,
            doors: None,
            seats: None,
            city: None,
            province: None,
            seller_name: None,
            is_private_seller: None,
            dealer_id: None,
            description: None,
            images: Vec::new(),
            vehicle_status: None,
            vin: None,
            stock_number: None,
            features: Vec::new(),
        }
    }

    /// Priority rank of the producing extractor
    pub fn rank(&self) -> u8 {
        self.source.rank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_ranks_are_ordered() {
        assert!(Source::StructuredModel.rank() < Source::LinkedData.rank());
        assert!(Source::LinkedData.rank() < Source::Dom.rank());
    }

    #[test]
    fn test_anchor_requires_make_model_or_price() {
        let mut record = VehicleRecord {
            url: "https://example.com/a/1".to_string(),
            ..Default::default()
        };
        assert!(!record.has_anchor());

        record.make = Some("   ".to_string());
        assert!(!record.has_anchor());

        record.price = Some(18_500);
        assert!(record.has_anchor());
    }

    #[test]
    fn test_serialized_field_order_and_nulls() {
        let record = VehicleRecord {
            make: Some("Honda".to_string()),
            url: "https://example.com/a/1".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.starts_with(r#"{"ad_id":null,"make":"Honda","model":null"#));
        assert!(json.ends_with(r#""features":[],"url":"https://example.com/a/1"}"#));
    }

    #[test]
    fn test_label_falls_back_to_url() {
        let record = VehicleRecord {
            url: "https://example.com/a/1".to_string(),
            ..Default::default()
        };
        assert_eq!(record.label(), "https://example.com/a/1");

        let record = VehicleRecord {
            year: Some(2019),
            make: Some("Honda".to_string()),
            model: Some("Civic".to_string()),
            ..record
        };
        assert_eq!(record.label(), "2019 Honda Civic");
    }
}
