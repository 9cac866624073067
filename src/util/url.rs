use sha2::{Digest, Sha256};
use url::{Url, form_urlencoded};

/// Query keys dropped during canonicalization (matched case-insensitively).
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_name",
    "gclid",
    "fbclid",
];

/// Hex length of a stable id.
pub const STABLE_ID_LEN: usize = 12;

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.iter().any(|p| key.eq_ignore_ascii_case(p))
}

// Normalize a URL for dedup and display:
// lower-case scheme/host/path, drop tracking params and fragment,
// strip trailing '/', sort remaining query pairs by (key, value).
// Unparseable input comes back unchanged.
pub fn canonicalize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    let Ok(mut url) = Url::parse(raw.trim()) else { return raw.to_string() };

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    url.set_fragment(None);
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        url.set_query(Some(&query));
    }

    if !url.cannot_be_a_base() {
        let lowered = url.path().to_lowercase();
        let trimmed = lowered.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/" } else { trimmed };
        url.set_path(path);
    }

    url.to_string()
}

/// Dedup key: truncated SHA-256 hex digest of the canonical URL.
pub fn stable_id(raw: &str) -> String {
    let canonical = canonicalize(raw);
    let digest = Sha256::digest(canonical.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(STABLE_ID_LEN);
    id
}

/// `scheme://host[:port]` of a URL, if it has one.
pub fn origin_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}
