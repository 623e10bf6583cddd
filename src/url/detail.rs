//! Listing-detail URL rules
//!
//! Detail pages live under `/a/<make>/<model>/<city>/<province>/<id>_<token>`.
//! Only the `/a/<slug>` prefix is required to qualify as a detail link; the
//! trailing id segment is optional and only used to recover an ad id.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static DETAIL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/a/[A-Za-z0-9\-]+").expect("detail path pattern is valid"));

static AD_ID_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+_[A-Za-z0-9\-_]+$").expect("ad id pattern is valid"));

/// Returns true if the URL path points at a listing-detail page
pub fn is_detail_url(url: &Url) -> bool {
    (url.scheme() == "http" || url.scheme() == "https") && DETAIL_PATH.is_match(url.path())
}

/// Recovers the ad identifier (`<digits>_<token>`) from a detail URL
///
/// # Examples
///
/// ```
/// use autotrawl::url::ad_id_from_url;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/a/honda/civic/toronto/ontario/5_12345_abc/").unwrap();
/// assert_eq!(ad_id_from_url(&url), Some("5_12345_abc".to_string()));
/// ```
pub fn ad_id_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .find(|segment| AD_ID_SEGMENT.is_match(segment))
        .map(|segment| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_detail_paths() {
        assert!(is_detail_url(&url("https://example.com/a/honda/civic/1")));
        assert!(is_detail_url(&url("https://mirror.example.org/a/x-y-z")));
        assert!(!is_detail_url(&url("https://example.com/cars/honda/")));
        assert!(!is_detail_url(&url("https://example.com/a/")));
        assert!(!is_detail_url(&url("https://example.com/about/a/honda")));
    }

    #[test]
    fn test_ad_id_missing() {
        assert_eq!(ad_id_from_url(&url("https://example.com/a/honda/civic/")), None);
    }

    #[test]
    fn test_ad_id_ignores_query() {
        assert_eq!(
            ad_id_from_url(&url("https://example.com/a/honda/civic/19_1234?showcpo=1")),
            Some("19_1234".to_string())
        );
    }
}
