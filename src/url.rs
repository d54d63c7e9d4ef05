//! Joining encoded payloads onto base URLs and extracting them back out.

use ::url::Url;

use crate::error::TrackingError;

/// Join a base tracking URL and an encoded segment using standard relative
/// resolution (the segment replaces the base's path tail), then append a
/// trailing slash if asked.
pub fn build_url(base: &str, segment: &str, append_slash: bool) -> Result<String, TrackingError> {
    let base_url = Url::parse(base).map_err(|e| TrackingError::InvalidBaseUrl(e.to_string()))?;
    let joined = base_url
        .join(segment)
        .map_err(|e| TrackingError::InvalidBaseUrl(e.to_string()))?;
    let mut result = joined.to_string();
    if append_slash {
        result.push('/');
    }
    Ok(result)
}

/// Pull the encoded segment out of an inbound path or full URL.
///
/// Deliberately permissive: a full URL is recognized by a byte-for-byte
/// prefix match against `base`, a bare path by a single leading slash, and
/// anything else is returned unchanged.
pub fn extract_encoded_segment<'a>(input: &'a str, base: Option<&str>) -> &'a str {
    let stripped = match base {
        Some(base) if !base.is_empty() => input.strip_prefix(base).unwrap_or(input),
        _ => input,
    };
    stripped.strip_prefix('/').unwrap_or(stripped)
}
