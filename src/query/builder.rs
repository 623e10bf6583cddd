use crate::query::SearchQuery;
use url::Url;

/// Number of results per LIST page requested from the site
pub const PAGE_SIZE: u32 = 15;

/// Query parameters that carry pagination state
const PAGINATION_PARAMS: &[&str] = &["rcp", "rcs"];

/// Builds the canonical LIST page URL for a query and result offset
///
/// Path segments (make, model, province, city) are lower-cased and
/// percent-encoded in that order and only appended when present. The
/// home-delivery filter pair and the page-size parameter are always
/// present. Ranges are encoded as `"<min>,<max>"`.
///
/// Building is pure: identical inputs always produce identical URLs.
///
/// # Examples
///
/// ```
/// use autotrawl::query::{build_url, SearchQuery};
/// use url::Url;
///
/// let origin = Url::parse("https://www.autotrader.ca").unwrap();
/// let query = SearchQuery { make: Some("Honda".into()), ..Default::default() };
/// let url = build_url(&origin, &query, 15);
/// assert_eq!(
///     url.as_str(),
///     "https://www.autotrader.ca/cars/honda/?hprc=True&wcp=True&rcp=15&rcs=15"
/// );
/// ```
pub fn build_url(origin: &Url, query: &SearchQuery, offset: u32) -> Url {
    let mut path = String::from("/cars/");
    for segment in [&query.make, &query.model, &query.province, &query.city]
        .into_iter()
        .flatten()
    {
        let segment = segment.trim().to_lowercase();
        if segment.is_empty() {
            continue;
        }
        path.push_str(&urlencoding::encode(&segment));
        path.push('/');
    }

    let mut url = origin.clone();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    {
        let mut pairs = url.query_pairs_mut();

        // Home delivery filter
        pairs.append_pair("hprc", "True");
        pairs.append_pair("wcp", "True");

        // Pagination
        pairs.append_pair("rcp", &PAGE_SIZE.to_string());
        pairs.append_pair("rcs", &offset.to_string());

        for (key, range) in [("yRng", &query.year), ("pRng", &query.price), ("oRng", &query.mileage)] {
            if let Some(encoded) = range.encode() {
                pairs.append_pair(key, &encoded);
            }
        }

        for (key, filter) in [
            ("body", &query.body_type),
            ("fuel", &query.fuel_type),
            ("trans", &query.transmission),
        ] {
            if let Some(value) = filter {
                pairs.append_pair(key, value);
            }
        }
    }

    url
}

/// Removes pagination parameters from a LIST page URL, keeping everything else
pub fn strip_pagination(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !PAGINATION_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut stripped = url.clone();
    stripped.set_fragment(None);
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    stripped
}

/// Derives the LIST page URL at `offset` from a canonical base URL
pub fn page_url(base: &Url, offset: u32) -> Url {
    let mut url = strip_pagination(base);
    url.query_pairs_mut()
        .append_pair("rcp", &PAGE_SIZE.to_string())
        .append_pair("rcs", &offset.to_string());
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Range;

    fn origin() -> Url {
        Url::parse("https://www.autotrader.ca").unwrap()
    }

    #[test]
    fn test_empty_query_has_fixed_params() {
        let url = build_url(&origin(), &SearchQuery::default(), 0);
        assert_eq!(
            url.as_str(),
            "https://www.autotrader.ca/cars/?hprc=True&wcp=True&rcp=15&rcs=0"
        );
    }

    #[test]
    fn test_full_query() {
        let query = SearchQuery {
            make: Some("Land Rover".to_string()),
            model: Some("Range Rover".to_string()),
            province: Some("Ontario".to_string()),
            city: Some("Toronto".to_string()),
            year: Range::new(Some(2015), Some(2020)),
            price: Range::new(None, Some(30000)),
            mileage: Range::new(Some(1000), None),
            body_type: Some("SUV".to_string()),
            ..Default::default()
        };
        let url = build_url(&origin(), &query, 30);

        assert_eq!(url.path(), "/cars/land%20rover/range%20rover/ontario/toronto/");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("hprc".to_string(), "True".to_string()),
                ("wcp".to_string(), "True".to_string()),
                ("rcp".to_string(), "15".to_string()),
                ("rcs".to_string(), "30".to_string()),
                ("yRng".to_string(), "2015,2020".to_string()),
                ("pRng".to_string(), ",30000".to_string()),
                ("oRng".to_string(), "1000,".to_string()),
                ("body".to_string(), "SUV".to_string()),
            ]
        );
    }

    #[test]
    fn test_segments_skip_missing_parts() {
        let query = SearchQuery {
            make: Some("honda".to_string()),
            city: Some("Montréal".to_string()),
            ..Default::default()
        };
        let url = build_url(&origin(), &query, 0);
        assert_eq!(url.path(), "/cars/honda/montr%C3%A9al/");
    }

    #[test]
    fn test_build_is_deterministic() {
        let query = SearchQuery {
            make: Some("honda".to_string()),
            model: Some("civic".to_string()),
            price: Range::new(Some(5000), None),
            ..Default::default()
        };
        assert_eq!(build_url(&origin(), &query, 45), build_url(&origin(), &query, 45));
    }

    #[test]
    fn test_strip_pagination() {
        let url = Url::parse("https://example.com/cars/honda/?hprc=True&rcp=15&rcs=30#x").unwrap();
        assert_eq!(
            strip_pagination(&url).as_str(),
            "https://example.com/cars/honda/?hprc=True"
        );

        let url = Url::parse("https://example.com/cars/?rcs=30").unwrap();
        assert_eq!(strip_pagination(&url).as_str(), "https://example.com/cars/");
    }

    #[test]
    fn test_page_url_does_not_compound_params() {
        let base = Url::parse("https://example.com/cars/honda/?hprc=True&rcp=15&rcs=0").unwrap();
        let second = page_url(&base, 15);
        let third = page_url(&second, 30);
        assert_eq!(
            third.as_str(),
            "https://example.com/cars/honda/?hprc=True&rcp=15&rcs=30"
        );
    }
}
