//! AES-256-GCM tracking token cipher.
//!
//! Token format, before base64url encoding:
//! [1 byte: version=1][8 bytes: issued-at unix seconds BE][12 bytes: nonce][ciphertext + tag]
//! The version and issued-at header is authenticated as AAD, so neither can
//! be altered without failing the tag check. The issued-at field lets a
//! decoder enforce a TTL on inbound tokens.

use core::fmt;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64ct::{Base64Url, Base64UrlUnpadded, Encoding};
use chrono::Utc;
use zeroize::Zeroize;

use crate::error::TrackingError;

/// AES key length in bytes (256 bits).
pub const KEY_LENGTH: usize = 32;

/// Token format version written by [`TrackingKey::encrypt`].
pub const TOKEN_VERSION: u8 = 1;

/// AES-GCM nonce length in bytes (96 bits per NIST recommendation).
pub const NONCE_LENGTH: usize = 12;

/// AES-GCM tag length in bytes (128 bits).
pub const TAG_LENGTH: usize = 16;

const HEADER_LENGTH: usize = 1 + 8;

/// Symmetric cipher handle derived from configured key material.
///
/// Produces and consumes self-describing, URL-path-safe tokens. Key material
/// is zeroized on drop.
pub struct TrackingKey {
    cipher: Aes256Gcm,
    material: [u8; KEY_LENGTH],
}

impl TrackingKey {
    /// Create a cipher from 32 bytes of raw key material.
    pub fn new(material: &[u8]) -> Result<Self, TrackingError> {
        if material.len() != KEY_LENGTH {
            return Err(TrackingError::InvalidKeyLength {
                expected: KEY_LENGTH,
                got: material.len(),
            });
        }
        let cipher = Aes256Gcm::new_from_slice(material).map_err(|_| {
            TrackingError::InvalidKeyLength {
                expected: KEY_LENGTH,
                got: material.len(),
            }
        })?;
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(material);
        Ok(Self {
            cipher,
            material: key,
        })
    }

    /// Create a cipher from base64url-encoded key material (padded or
    /// unpadded), as stored in a configuration.
    pub fn from_material(material: &str) -> Result<Self, TrackingError> {
        let bytes = Base64Url::decode_vec(material)
            .or_else(|_| Base64UrlUnpadded::decode_vec(material))
            .map_err(|_| TrackingError::InvalidKeyEncoding)?;
        Self::new(&bytes)
    }

    /// Generate fresh random key material, base64url-encoded.
    pub fn generate() -> Result<String, TrackingError> {
        let mut bytes = [0u8; KEY_LENGTH];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| TrackingError::RngFailed(e.to_string()))?;
        let material = Base64Url::encode_string(&bytes);
        bytes.zeroize();
        Ok(material)
    }

    /// Encrypt plaintext into a URL-path-safe token issued now.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, TrackingError> {
        self.encrypt_at(plaintext, Utc::now().timestamp())
    }

    fn encrypt_at(&self, plaintext: &[u8], issued_at: i64) -> Result<String, TrackingError> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| TrackingError::RngFailed(e.to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut header = [0u8; HEADER_LENGTH];
        header[0] = TOKEN_VERSION;
        header[1..].copy_from_slice(&(issued_at as u64).to_be_bytes());

        let ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: &header,
                },
            )
            .map_err(|e| TrackingError::EncryptionFailed(e.to_string()))?;

        let mut token = Vec::with_capacity(HEADER_LENGTH + NONCE_LENGTH + ciphertext.len());
        token.extend_from_slice(&header);
        token.extend_from_slice(&nonce_bytes);
        token.extend_from_slice(&ciphertext);
        Ok(Base64Url::encode_string(&token))
    }

    /// Decrypt a token, verifying its authentication tag.
    pub fn decrypt(&self, token: &str) -> Result<Vec<u8>, TrackingError> {
        self.decrypt_inner(token, None)
    }

    /// Decrypt a token and reject it if it was issued more than
    /// `ttl_seconds` ago. The tag is verified before the TTL check.
    pub fn decrypt_with_ttl(
        &self,
        token: &str,
        ttl_seconds: i64,
    ) -> Result<Vec<u8>, TrackingError> {
        self.decrypt_inner(token, Some(ttl_seconds))
    }

    fn decrypt_inner(&self, token: &str, ttl: Option<i64>) -> Result<Vec<u8>, TrackingError> {
        let raw = Base64Url::decode_vec(token).map_err(|_| TrackingError::InvalidBase64)?;

        if raw.len() < HEADER_LENGTH + NONCE_LENGTH + TAG_LENGTH {
            return Err(TrackingError::TokenTooShort);
        }
        if raw[0] != TOKEN_VERSION {
            return Err(TrackingError::UnsupportedTokenVersion(raw[0]));
        }

        let header = &raw[..HEADER_LENGTH];
        let nonce = Nonce::from_slice(&raw[HEADER_LENGTH..HEADER_LENGTH + NONCE_LENGTH]);
        let ciphertext = &raw[HEADER_LENGTH + NONCE_LENGTH..];

        let plaintext = self
            .cipher
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: header,
                },
            )
            .map_err(|_| TrackingError::AuthenticationFailed)?;

        if let Some(ttl) = ttl {
            let mut issued_at_bytes = [0u8; 8];
            issued_at_bytes.copy_from_slice(&raw[1..HEADER_LENGTH]);
            let issued_at = u64::from_be_bytes(issued_at_bytes) as i64;
            let age = Utc::now().timestamp() - issued_at;
            if age > ttl {
                return Err(TrackingError::TokenExpired { age, ttl });
            }
        }

        Ok(plaintext)
    }
}

impl fmt::Debug for TrackingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TrackingKey(..)")
    }
}

impl Drop for TrackingKey {
    fn drop(&mut self) {
        self.material.zeroize();
    }
}
