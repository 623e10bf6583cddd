//! Field normalizers
//!
//! Total functions that turn display text into typed values. Missing or
//! unparseable input yields `None`, never a panic or an error.

/// Characters dropped before looking for digits
const SEPARATORS: &[char] = &[',', '$', '€', '£', '\u{a0}', '\u{202f}'];

/// Parses a price such as `"$24,995"` or `"24,995.00 CAD"`
///
/// # Examples
///
/// ```
/// use autotrawl::extract::parse_price;
///
/// assert_eq!(parse_price("$24,995"), Some(24995));
/// assert_eq!(parse_price(""), None);
/// ```
pub fn parse_price(text: &str) -> Option<u64> {
    first_digit_run(text)
}

/// Parses an odometer reading such as `"112,340 km"`
///
/// # Examples
///
/// ```
/// use autotrawl::extract::parse_mileage;
///
/// assert_eq!(parse_mileage("112,340 km"), Some(112340));
/// ```
pub fn parse_mileage(text: &str) -> Option<u64> {
    first_digit_run(text)
}

/// Parses the first integer in a short label such as `"4 doors"`
pub fn parse_small_int(text: &str) -> Option<u32> {
    first_digit_run(text).and_then(|n| u32::try_from(n).ok())
}

/// Strips separators and currency symbols, then parses the first
/// contiguous run of ASCII digits
fn first_digit_run(text: &str) -> Option<u64> {
    let stripped: String = text.chars().filter(|c| !SEPARATORS.contains(c)).collect();

    let digits: String = stripped
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return None;
    }

    digits.parse().ok()
}

/// Collapses whitespace runs and trims; empty results become `None`
pub fn clean_text(text: &str) -> Option<String> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Formats an integer with comma thousands separators
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

/// Display string for a price, e.g. `$24,995`
pub fn format_price(value: u64) -> String {
    format!("${}", format_thousands(value))
}

/// Display string for an odometer reading, e.g. `112,340 km`
pub fn format_mileage(value: u64) -> String {
    format!("{} km", format_thousands(value))
}

/// Maps free-form condition text onto `New` or `Used`
///
/// Certified pre-owned listings are `Used`. Schema.org condition URLs
/// (`https://schema.org/UsedCondition`) are understood too. Anything else is
/// treated as absent.
pub fn normalize_status(text: &str) -> Option<String> {
    let lowered = text.trim().to_ascii_lowercase();
    let tail = lowered.rsplit('/').next().unwrap_or(&lowered);

    let status = if tail.contains("certified")
        || tail == "cpo"
        || tail.starts_with("used")
        || tail.contains("pre-owned")
        || tail.contains("preowned")
    {
        "Used"
    } else if tail.starts_with("new") {
        "New"
    } else {
        return None;
    };

    Some(status.to_string())
}
