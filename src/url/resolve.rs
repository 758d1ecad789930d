use url::Url;

/// Resolves a link href against the site origin
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// # Example
///
/// ```
/// use irbis_harvest::url::resolve_href;
/// use url::Url;
///
/// let origin = Url::parse("http://irbis-miniatures.com").unwrap();
/// let url = resolve_href(&origin, "/p/1").unwrap();
/// assert_eq!(url.as_str(), "http://irbis-miniatures.com/p/1");
/// ```
pub fn resolve_href(origin: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match origin.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url)
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Returns the final non-empty path segment of a URL
///
/// Image filenames are derived from this; query and fragment are ignored.
pub fn file_name_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| segment.to_string())
}
