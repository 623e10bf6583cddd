//! Heuristic markup extractor
//!
//! Tries ordered selector candidates per field over the visible markup. It
//! always yields a partial record, even an empty one, and is the only
//! source of gallery images on pages without structured data.

use crate::extract::normalize::{normalize_status, parse_mileage, parse_price, parse_small_int};
use crate::extract::page::element_text;
use crate::extract::{strip_image_query, Extractor, Page};
use crate::record::{PartialVehicle, Source};
use crate::url::ad_id_from_url;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

/// `"2019 Honda Civic EX Sedan"`
static HEADLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})\s+(\S+)\s+(.+)$").expect("headline pattern is valid"));

static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("td selector is valid"));
static VALUE_CLASS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[class*="value"]"#).expect("value selector is valid"));

const PRICE_SELECTORS: &[&str] = &[
    r#"[data-testid="hero-price"]"#,
    ".hero-price",
    r#"[class*="price-amount"]"#,
    r#"[class*="listing-price"]"#,
    ".price-container",
    r#"[class*="Price"]"#,
    r#"span[class*="price"]"#,
];

const MILEAGE_SELECTORS: &[&str] = &[
    r#"[data-testid="mileage"]"#,
    r#"[class*="mileage"]"#,
    r#"[class*="odometer"]"#,
    r#"[class*="kilometres"]"#,
];

const LOCATION_SELECTORS: &[&str] = &[
    r#"[class*="location"]"#,
    r#"[data-testid="location"]"#,
    r#"[class*="dealer-location"]"#,
];

const SELLER_SELECTORS: &[&str] = &[
    r#"[class*="dealer-name"]"#,
    r#"[class*="seller-name"]"#,
    r#"[data-testid="dealer-name"]"#,
    r#"[class*="dealership"]"#,
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"[class*="description"]"#,
    r#"[data-testid="description"]"#,
    ".vehicle-description",
];

const IMAGE_SELECTORS: &[&str] = &[
    r#"img[src*="images.autotrader.ca"]"#,
    r#"[class*="gallery"] img"#,
    r#"[class*="carousel"] img"#,
    r#"[class*="photo"] img"#,
];

const PRIVATE_SELLER_SELECTOR: &str = r#"[class*="private"]"#;
const FEATURE_SELECTOR: &str = r#"[class*="features"] li"#;

/// Extracts from page markup
#[derive(Debug, Default, Clone, Copy)]
pub struct DomExtractor;

impl Extractor for DomExtractor {
    fn source(&self) -> Source {
        Source::Dom
    }

    fn extract(&self, page: &Page) -> Option<PartialVehicle> {
        let mut partial = PartialVehicle::empty(Source::Dom);

        if let Some(headline) = page.first_text(&["h1"]) {
            apply_headline(&mut partial, &headline);
        }

        if let Some(text) = first_matching(page, PRICE_SELECTORS, |t| t.contains('$')) {
            partial.price = parse_price(&text);
            partial.price_formatted = partial.price.map(|_| text);
        }
        if let Some(text) = first_matching(page, MILEAGE_SELECTORS, |t| t.chars().any(|c| c.is_ascii_digit())) {
            partial.mileage = parse_mileage(&text);
            partial.mileage_formatted = partial.mileage.map(|_| text);
        }

        partial.transmission = spec_value(page, &["Transmission", "Trans"]);
        partial.drivetrain = spec_value(page, &["Drivetrain", "Drive Train", "Drive Type"]);
        partial.body_type = spec_value(page, &["Body Type", "Body Style", "Body"]);
        partial.exterior_color = spec_value(page, &["Exterior Colour", "Exterior Color", "Colour", "Color"]);
        partial.interior_color = spec_value(page, &["Interior Colour", "Interior Color"]);
        partial.fuel_type = spec_value(page, &["Fuel Type", "Fuel"]);
        partial.engine = spec_value(page, &["Engine", "Engine Type"]);
        partial.doors = spec_value(page, &["Doors", "Number of Doors"]).as_deref().and_then(parse_small_int);
        partial.seats = spec_value(page, &["Seats", "Seating Capacity", "Passengers"]);
        partial.vin = spec_value(page, &["VIN", "Vehicle Identification Number"]);
        partial.stock_number = spec_value(page, &["Stock Number", "Stock #", "Stock"]);
        partial.vehicle_status = spec_value(page, &["Condition", "Status"])
            .as_deref()
            .and_then(normalize_status);

        if let Some(location) = page.first_text(LOCATION_SELECTORS) {
            let mut parts = location.split(',').map(str::trim).filter(|p| !p.is_empty());
            partial.city = parts.next().map(str::to_string);
            partial.province = parts.next().map(str::to_string);
        }

        partial.seller_name = page.first_text(SELLER_SELECTORS);
        if page.exists(PRIVATE_SELLER_SELECTOR) {
            partial.is_private_seller = Some(true);
        }
        partial.description = page.first_text(DESCRIPTION_SELECTORS);
        partial.images = gallery_images(page);
        partial.features = features(page);
        partial.ad_id = ad_id_from_url(page.url());

        Some(partial)
    }
}

/// Splits `"<year> <make> <model> <trim...>"` into its parts
fn apply_headline(partial: &mut PartialVehicle, headline: &str) {
    let Some(caps) = HEADLINE.captures(headline) else {
        tracing::trace!("Headline does not look like a vehicle title: {}", headline);
        return;
    };

    partial.year = caps[1].parse().ok();
    partial.make = Some(caps[2].to_string());

    let mut rest = caps[3].split_whitespace();
    partial.model = rest.next().map(str::to_string);
    let trim = rest.collect::<Vec<_>>().join(" ");
    partial.trim = (!trim.is_empty()).then_some(trim);
}

/// First text over the selector list that satisfies `preferred`,
/// falling back to the first text found at all
fn first_matching<F>(page: &Page, selectors: &[&str], preferred: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    let mut fallback = None;

    for selector in selectors {
        let Some(text) = page.first_text(&[*selector]) else {
            continue;
        };
        if preferred(&text) {
            return Some(text);
        }
        fallback.get_or_insert(text);
    }

    fallback
}

/// Looks a value up in the vehicle details table by its label
///
/// Understands `<dt>/<dd>` lists, table rows, and label/value class pairs.
/// Labels compare case-insensitively with a trailing colon ignored.
fn spec_value(page: &Page, labels: &[&str]) -> Option<String> {
    labels.iter().find_map(|label| {
        let matches = |element: &ElementRef<'_>| {
            element_text(element).is_some_and(|text| {
                text.trim_end_matches(':').trim().eq_ignore_ascii_case(label)
            })
        };

        let from_definition = page
            .select_all("dt")
            .into_iter()
            .filter(|dt| matches(dt))
            .find_map(|dt| next_element(&dt).filter(|el| el.value().name() == "dd"))
            .and_then(|dd| element_text(&dd));

        from_definition
            .or_else(|| {
                page.select_all("th, td")
                    .into_iter()
                    .filter(|cell| matches(cell))
                    .find_map(|cell| {
                        next_element(&cell)
                            .filter(|el| el.value().name() == "td")
                            .and_then(|td| element_text(&td))
                            .or_else(|| {
                                parent_element(&cell)
                                    .and_then(|row| row.select(&TD).last())
                                    .filter(|td| td.id() != cell.id())
                                    .and_then(|td| element_text(&td))
                            })
                    })
            })
            .or_else(|| {
                page.select_all(r#"[class*="label"]"#)
                    .into_iter()
                    .filter(|el| matches(el))
                    .find_map(|el| {
                        next_element(&el)
                            .and_then(|next| element_text(&next))
                            .or_else(|| {
                                parent_element(&el)
                                    .and_then(|parent| parent.select(&VALUE_CLASS).next())
                                    .and_then(|value| element_text(&value))
                            })
                    })
            })
    })
}

fn next_element<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

fn parent_element<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.parent().and_then(ElementRef::wrap)
}

/// Gallery image URLs, absolute, query-free and deduplicated
fn gallery_images(page: &Page) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();

    for selector in IMAGE_SELECTORS {
        for img in page.select_all(selector) {
            let attrs = img.value();
            let Some(src) = attrs.attr("src").or_else(|| attrs.attr("data-src")) else {
                continue;
            };
            if src.contains("placeholder") || src.contains("logo") {
                continue;
            }
            let Some(url) = page.resolve(src).and_then(|u| strip_image_query(u.as_str())) else {
                continue;
            };
            if !images.contains(&url) {
                images.push(url);
            }
        }
    }

    images
}

fn features(page: &Page) -> Vec<String> {
    let mut features: Vec<String> = Vec::new();
    for item in page.select_all(FEATURE_SELECTOR) {
        if let Some(text) = element_text(&item) {
            if !features.contains(&text) {
                features.push(text);
            }
        }
    }
    features
}
