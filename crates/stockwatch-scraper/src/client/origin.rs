/// Extracts the host from a URL for error messages and log fields.
///
/// Falls back to the raw input when it does not parse.
pub(crate) fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

/// Returns `true` when `candidate` is on the same host as `origin`.
///
/// Product links found on collection pages and in search results are only
/// followed when they point back at the storefront being scanned.
pub(crate) fn same_host(origin: &str, candidate: &str) -> bool {
    match (reqwest::Url::parse(origin), reqwest::Url::parse(candidate)) {
        (Ok(a), Ok(b)) => a.host_str() == b.host_str(),
        _ => false,
    }
}
