use thiserror::Error;

/// Coarse error classes for callers that branch on the failure category
/// rather than the specific variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed configuration (bad key material, missing/unparseable base URL).
    Configuration,
    /// Malformed encoded data (bad base64, truncated or unversioned token).
    Decode,
    /// Authentication failure on an encrypted token, or TTL expiry.
    Integrity,
    /// Structurally valid bytes that do not form an acceptable payload.
    Format,
}

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Invalid key material: not valid base64url")]
    InvalidKeyEncoding,

    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("No base {purpose} tracking URL configured")]
    MissingBaseUrl { purpose: &'static str },

    #[error("Invalid base tracking URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Random number generation failed: {0}")]
    RngFailed(String),

    #[error("Invalid base64 in encoded payload")]
    InvalidBase64,

    #[error("Encrypted token too short")]
    TokenTooShort,

    #[error("Unsupported token version: {0}")]
    UnsupportedTokenVersion(u8),

    #[error("Token authentication failed")]
    AuthenticationFailed,

    #[error("Token expired: age {age}s exceeds ttl {ttl}s")]
    TokenExpired { age: i64, ttl: i64 },

    #[error("Invalid payload JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Decoded payload is not a JSON object")]
    NotAJsonObject,

    #[error("Payload contains non-ASCII bytes but the configured encoding is ASCII")]
    NonAsciiPayload,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
}

impl TrackingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackingError::InvalidKeyEncoding
            | TrackingError::InvalidKeyLength { .. }
            | TrackingError::MissingBaseUrl { .. }
            | TrackingError::InvalidBaseUrl(_)
            | TrackingError::RngFailed(_) => ErrorKind::Configuration,

            TrackingError::InvalidBase64
            | TrackingError::TokenTooShort
            | TrackingError::UnsupportedTokenVersion(_) => ErrorKind::Decode,

            TrackingError::AuthenticationFailed | TrackingError::TokenExpired { .. } => {
                ErrorKind::Integrity
            }

            TrackingError::InvalidJson(_)
            | TrackingError::NotAJsonObject
            | TrackingError::NonAsciiPayload
            | TrackingError::EncryptionFailed(_) => ErrorKind::Format,
        }
    }
}
