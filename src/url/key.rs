use url::Url;

/// Tracking parameters dropped from request keys
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Computes the key the request queue deduplicates on
///
/// # Normalization Steps
///
/// 1. Host is lowercased (the `url` crate already does this on parse)
/// 2. Fragment is removed
/// 3. Trailing slash is removed (except for root `/`)
/// 4. Tracking query parameters are removed
/// 5. Remaining query parameters are sorted by key
/// 6. An empty query string is dropped
///
/// The scheme is kept as-is: the catalog is served over plain HTTP.
///
/// # Examples
///
/// ```
/// use irbis_harvest::url::unique_key;
/// use url::Url;
///
/// let url = Url::parse("http://Example.com/shop/?b=2&a=1#top").unwrap();
/// assert_eq!(unique_key(&url), "http://example.com/shop?a=1&b=2");
/// ```
pub fn unique_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);

    let path = key.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        key.set_path(path.trim_end_matches('/'));
        if key.path().is_empty() {
            key.set_path("/");
        }
    }

    if key.query().is_some() {
        let params = filter_and_sort_query_params(&key);
        if params.is_empty() {
            key.set_query(None);
        } else {
            let query_string = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            key.set_query(Some(&query_string));
        }
    }

    key.to_string()
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
