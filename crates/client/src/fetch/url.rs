//! URL canonicalization for consistent cache keys.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string for consistent caching.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a manifest path against the origin.
///
/// Absolute URLs are kept as they are; paths are joined onto the origin.
pub fn resolve(origin: &url::Url, path: &str) -> Result<url::Url, UrlError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let joined = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    canonicalize(joined.as_str())
}

/// Resolve a URL a page asked for into the form cache keys use.
///
/// Absolute URLs are canonicalized. A scheme-less URL naming the origin's own
/// host (`localhost:8080/index.html`) takes the origin's scheme. Anything else
/// is a path relative to the origin.
pub fn resolve_request(origin: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }
    if trimmed.contains("://") {
        return canonicalize(trimmed);
    }

    let authority = trimmed.split(['/', '?']).next().unwrap_or_default();
    if names_origin(origin, authority) {
        return canonicalize(&format!("{}://{trimmed}", origin.scheme()));
    }

    if trimmed.starts_with(['/', '.', '?']) {
        resolve(origin, trimmed)
    } else {
        // "host:port/x" would otherwise parse as a URL with scheme "host"
        resolve(origin, &format!("./{trimmed}"))
    }
}

fn names_origin(origin: &url::Url, authority: &str) -> bool {
    let Some(host) = origin.host_str() else {
        return false;
    };
    let authority = authority.to_ascii_lowercase();
    match origin.port() {
        Some(port) => authority == format!("{host}:{port}"),
        None => authority == host,
    }
}
