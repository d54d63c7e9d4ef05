//! Payload <-> encoded-string codec.
//!
//! A payload is serialized to JSON and then either encrypted into an
//! authenticated token (when a key is configured) or base64url-encoded with
//! padding (NOT confidential). Both representations contain only
//! URL-path-safe characters.

use base64ct::{Base64Url, Encoding};
use serde_json::Value;

use crate::error::TrackingError;
use crate::key::TrackingKey;
use crate::types::Payload;

/// Text encoding applied to the serialized payload bytes.
///
/// JSON interchange is UTF-8; `Ascii` additionally rejects payloads whose
/// serialized form contains non-ASCII bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Ascii,
}

impl TextEncoding {
    fn check(self, bytes: &[u8]) -> Result<(), TrackingError> {
        match self {
            TextEncoding::Utf8 => Ok(()),
            TextEncoding::Ascii if bytes.is_ascii() => Ok(()),
            TextEncoding::Ascii => Err(TrackingError::NonAsciiPayload),
        }
    }
}

/// Encode a payload into a URL-path-safe string.
pub fn encode(
    payload: &Payload,
    key: Option<&TrackingKey>,
    encoding: TextEncoding,
) -> Result<String, TrackingError> {
    let bytes = serde_json::to_vec(payload)?;
    encoding.check(&bytes)?;
    match key {
        Some(key) => key.encrypt(&bytes),
        None => Ok(Base64Url::encode_string(&bytes)),
    }
}

/// Decode an encoded segment back into a payload.
///
/// The key (or its absence) must match what was used to encode; a mismatch
/// fails deterministically rather than producing garbage data.
pub fn decode(
    encoded: &str,
    key: Option<&TrackingKey>,
    encoding: TextEncoding,
) -> Result<Payload, TrackingError> {
    let bytes = match key {
        Some(key) => key.decrypt(encoded)?,
        None => Base64Url::decode_vec(encoded).map_err(|_| TrackingError::InvalidBase64)?,
    };
    encoding.check(&bytes)?;

    let value: Value = serde_json::from_slice(&bytes)?;
    if !value.is_object() {
        return Err(TrackingError::NotAJsonObject);
    }
    Ok(serde_json::from_value(value)?)
}
