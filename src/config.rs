//! The settings bundle governing how tracking links are built and decoded.

use chrono::Utc;
use serde_json::Value;

use crate::codec::{self, TextEncoding};
use crate::error::TrackingError;
use crate::key::TrackingKey;
use crate::types::{Metadata, Payload, TrackingResult};
use crate::url::{build_url, extract_encoded_segment};

/// Default webhook timeout hint, in seconds.
pub const DEFAULT_WEBHOOK_TIMEOUT_SECONDS: u64 = 5;

/// Where the tracking pixel is inserted in an HTML body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PixelPosition {
    #[default]
    Top,
    Bottom,
}

/// Immutable settings bundle for building and decoding tracking links.
///
/// A configuration is a pure value: callers may share one read-only across
/// threads and derive per-call variants with [`Configuration::merge`]. The
/// `include_*` flags decide whether the webhook URL and default metadata
/// travel inside the link (portable across processes and config changes) or
/// are resolved from local configuration at decode time (compact links).
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Webhook to notify when a click or open is registered. Delivery is
    /// external to this crate.
    pub webhook_url: Option<String>,
    /// Timeout hint forwarded to the webhook delivery layer.
    pub webhook_timeout_seconds: u64,
    /// Embed the webhook URL in the link instead of resolving it from local
    /// configuration at decode time.
    pub include_webhook_url: bool,
    /// Base URL prepended to encoded open-tracking segments.
    pub base_open_tracking_url: Option<String>,
    /// Base URL prepended to encoded click-tracking segments.
    pub base_click_tracking_url: Option<String>,
    /// Metadata associated with every tracking event.
    pub default_metadata: Option<Metadata>,
    /// Embed the default metadata in the link instead of merging it in at
    /// decode time.
    pub include_default_metadata: bool,
    /// base64url-encoded 32-byte AES-256 key. When set, payloads are
    /// encrypted; when absent, they are merely base64url-encoded (NOT
    /// confidential).
    pub encryption_key_material: Option<String>,
    /// Text encoding applied to serialized payload bytes.
    pub encoding: TextEncoding,
    /// Append a trailing slash to built tracking URLs.
    pub append_slash: bool,
    /// Where the open-tracking pixel is inserted.
    pub pixel_position: PixelPosition,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_timeout_seconds: DEFAULT_WEBHOOK_TIMEOUT_SECONDS,
            include_webhook_url: false,
            base_open_tracking_url: None,
            base_click_tracking_url: None,
            default_metadata: None,
            include_default_metadata: false,
            encryption_key_material: None,
            encoding: TextEncoding::Utf8,
            append_slash: false,
            pixel_position: PixelPosition::Top,
        }
    }
}

/// Per-call overrides applied to a [`Configuration`] via
/// [`Configuration::merge`]. Only `Some` fields replace the originals.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub webhook_url: Option<String>,
    pub webhook_timeout_seconds: Option<u64>,
    pub include_webhook_url: Option<bool>,
    pub base_open_tracking_url: Option<String>,
    pub base_click_tracking_url: Option<String>,
    pub default_metadata: Option<Metadata>,
    pub include_default_metadata: Option<bool>,
    pub encryption_key_material: Option<String>,
    pub encoding: Option<TextEncoding>,
    pub append_slash: Option<bool>,
    pub pixel_position: Option<PixelPosition>,
}

impl Configuration {
    /// Build a configuration from defaults plus overrides.
    pub fn new(overrides: Overrides) -> Result<Self, TrackingError> {
        Self::default().merge(overrides)
    }

    /// Return a copy with every `Some` override applied. The receiver is
    /// never mutated. Fails fast if the merged key material is malformed.
    pub fn merge(&self, overrides: Overrides) -> Result<Self, TrackingError> {
        let mut merged = self.clone();
        if let Some(v) = overrides.webhook_url {
            merged.webhook_url = Some(v);
        }
        if let Some(v) = overrides.webhook_timeout_seconds {
            merged.webhook_timeout_seconds = v;
        }
        if let Some(v) = overrides.include_webhook_url {
            merged.include_webhook_url = v;
        }
        if let Some(v) = overrides.base_open_tracking_url {
            merged.base_open_tracking_url = Some(v);
        }
        if let Some(v) = overrides.base_click_tracking_url {
            merged.base_click_tracking_url = Some(v);
        }
        if let Some(v) = overrides.default_metadata {
            merged.default_metadata = Some(v);
        }
        if let Some(v) = overrides.include_default_metadata {
            merged.include_default_metadata = v;
        }
        if let Some(v) = overrides.encryption_key_material {
            merged.encryption_key_material = Some(v);
        }
        if let Some(v) = overrides.encoding {
            merged.encoding = v;
        }
        if let Some(v) = overrides.append_slash {
            merged.append_slash = v;
        }
        if let Some(v) = overrides.pixel_position {
            merged.pixel_position = v;
        }
        merged.cipher()?;
        Ok(merged)
    }

    /// Derive the token cipher from the configured key material.
    ///
    /// A pure function of `encryption_key_material`, recomputed per call, so
    /// a merged copy can never alias a stale cipher.
    pub fn cipher(&self) -> Result<Option<TrackingKey>, TrackingError> {
        match &self.encryption_key_material {
            Some(material) => Ok(Some(TrackingKey::from_material(material)?)),
            None => Ok(None),
        }
    }

    /// Assemble the payload to embed in a tracking link.
    ///
    /// `url` is set iff a tracked URL is given. Default metadata is embedded
    /// only when `include_default_metadata`; extra metadata wins on key
    /// collision. The webhook URL is embedded only when `include_webhook_url`.
    pub fn embedded_payload(
        &self,
        tracked_url: Option<&str>,
        extra_metadata: Option<&Metadata>,
    ) -> Payload {
        let mut metadata = Metadata::new();
        if self.include_default_metadata {
            if let Some(defaults) = &self.default_metadata {
                for (key, value) in defaults {
                    metadata.insert(key.clone(), value.clone());
                }
            }
        }
        if let Some(extra) = extra_metadata {
            for (key, value) in extra {
                metadata.insert(key.clone(), value.clone());
            }
        }

        Payload {
            url: tracked_url.map(str::to_owned),
            metadata: if metadata.is_empty() {
                None
            } else {
                Some(metadata)
            },
            webhook: if self.include_webhook_url {
                self.webhook_url.clone()
            } else {
                None
            },
        }
    }

    /// Assemble a decode result from an embedded payload.
    ///
    /// Local default metadata is the starting point only when it was NOT
    /// embedded in the link; link-embedded keys always win. The webhook URL
    /// comes from the link when `include_webhook_url`, else from local
    /// configuration.
    pub fn tracking_result(
        &self,
        payload: Payload,
        request_data: Option<Value>,
        is_open: bool,
    ) -> TrackingResult {
        let mut metadata = Metadata::new();
        if !self.include_default_metadata {
            if let Some(defaults) = &self.default_metadata {
                for (key, value) in defaults {
                    metadata.insert(key.clone(), value.clone());
                }
            }
        }
        if let Some(embedded) = payload.metadata {
            for (key, value) in embedded {
                metadata.insert(key, value);
            }
        }

        let webhook_url = if self.include_webhook_url {
            payload.webhook
        } else {
            self.webhook_url.clone()
        };

        TrackingResult {
            is_open_tracking: is_open,
            is_click_tracking: !is_open,
            tracked_url: payload.url,
            webhook_url,
            metadata,
            request_data,
            timestamp: Utc::now().timestamp(),
        }
    }

    fn encoded_payload(
        &self,
        tracked_url: Option<&str>,
        extra_metadata: Option<&Metadata>,
    ) -> Result<String, TrackingError> {
        let payload = self.embedded_payload(tracked_url, extra_metadata);
        codec::encode(&payload, self.cipher()?.as_ref(), self.encoding)
    }

    /// Full open-tracking URL embedding the given metadata.
    pub fn open_tracking_url(
        &self,
        extra_metadata: Option<&Metadata>,
    ) -> Result<String, TrackingError> {
        let base = self
            .base_open_tracking_url
            .as_deref()
            .ok_or(TrackingError::MissingBaseUrl { purpose: "open" })?;
        let encoded = self.encoded_payload(None, extra_metadata)?;
        build_url(base, &encoded, self.append_slash)
    }

    /// Full click-tracking URL embedding the tracked URL and metadata.
    pub fn click_tracking_url(
        &self,
        url_to_track: &str,
        extra_metadata: Option<&Metadata>,
    ) -> Result<String, TrackingError> {
        let base = self
            .base_click_tracking_url
            .as_deref()
            .ok_or(TrackingError::MissingBaseUrl { purpose: "click" })?;
        let encoded = self.encoded_payload(Some(url_to_track), extra_metadata)?;
        build_url(base, &encoded, self.append_slash)
    }

    /// Decode an inbound open-tracking request. Accepts a bare encoded
    /// segment, a `/`-prefixed path, or a full URL starting with the
    /// configured base.
    pub fn open_tracking_result(
        &self,
        encoded_path: &str,
        request_data: Option<Value>,
    ) -> Result<TrackingResult, TrackingError> {
        self.decode_result(encoded_path, request_data, true)
    }

    /// Decode an inbound click-tracking request. Accepts the same inputs as
    /// [`Configuration::open_tracking_result`].
    pub fn click_tracking_result(
        &self,
        encoded_path: &str,
        request_data: Option<Value>,
    ) -> Result<TrackingResult, TrackingError> {
        self.decode_result(encoded_path, request_data, false)
    }

    fn decode_result(
        &self,
        encoded_path: &str,
        request_data: Option<Value>,
        is_open: bool,
    ) -> Result<TrackingResult, TrackingError> {
        let base = if is_open {
            self.base_open_tracking_url.as_deref()
        } else {
            self.base_click_tracking_url.as_deref()
        };
        let segment = extract_encoded_segment(encoded_path, base);
        let payload = match codec::decode(segment, self.cipher()?.as_ref(), self.encoding) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(error = %err, "rejected inbound tracking request");
                return Err(err);
            }
        };
        Ok(self.tracking_result(payload, request_data, is_open))
    }

    /// The encoded segment of a full open-tracking URL.
    pub fn open_tracking_url_path<'a>(&self, url: &'a str) -> &'a str {
        extract_encoded_segment(url, self.base_open_tracking_url.as_deref())
    }

    /// The encoded segment of a full click-tracking URL.
    pub fn click_tracking_url_path<'a>(&self, url: &'a str) -> &'a str {
        extract_encoded_segment(url, self.base_click_tracking_url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn metadata(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    fn base_config() -> Configuration {
        Configuration {
            webhook_url: Some("https://hooks.example.com/t".to_string()),
            base_open_tracking_url: Some("https://t.example/o/".to_string()),
            base_click_tracking_url: Some("https://t.example/c/".to_string()),
            ..Configuration::default()
        }
    }

    #[test]
    fn defaults() {
        let config = Configuration::default();
        assert_eq!(config.webhook_timeout_seconds, 5);
        assert!(!config.include_webhook_url);
        assert!(!config.include_default_metadata);
        assert!(!config.append_slash);
        assert_eq!(config.pixel_position, PixelPosition::Top);
        assert_eq!(config.encoding, TextEncoding::Utf8);
    }

    #[test]
    fn merge_replaces_only_given_fields_and_never_mutates() {
        let original = base_config();
        let merged = original
            .merge(Overrides {
                append_slash: Some(true),
                webhook_timeout_seconds: Some(30),
                ..Overrides::default()
            })
            .unwrap();

        assert!(merged.append_slash);
        assert_eq!(merged.webhook_timeout_seconds, 30);
        assert_eq!(
            merged.base_open_tracking_url.as_deref(),
            Some("https://t.example/o/")
        );

        assert!(!original.append_slash);
        assert_eq!(original.webhook_timeout_seconds, 5);
    }

    #[test]
    fn merge_rejects_malformed_key_material() {
        let err = base_config()
            .merge(Overrides {
                encryption_key_material: Some("too-short".to_string()),
                ..Overrides::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn merge_rederives_cipher_from_new_material() {
        let material_a = TrackingKey::generate().unwrap();
        let material_b = TrackingKey::generate().unwrap();

        let config_a = base_config()
            .merge(Overrides {
                encryption_key_material: Some(material_a),
                ..Overrides::default()
            })
            .unwrap();
        let config_b = config_a
            .merge(Overrides {
                encryption_key_material: Some(material_b),
                ..Overrides::default()
            })
            .unwrap();

        let url = config_b.click_tracking_url("https://example.com", None).unwrap();
        // Decodes under the new key...
        assert!(config_b.click_tracking_result(&url, None).is_ok());
        // ...and fails under the old one.
        let err = config_a.click_tracking_result(&url, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn embedded_payload_sets_url_only_when_tracking_a_link() {
        let config = base_config();
        assert_eq!(config.embedded_payload(None, None).url, None);
        assert_eq!(
            config
                .embedded_payload(Some("https://example.com"), None)
                .url
                .as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn embedded_payload_omits_empty_metadata() {
        let payload = base_config().embedded_payload(None, Some(&Metadata::new()));
        assert_eq!(payload.metadata, None);
    }

    #[test]
    fn embedded_metadata_extra_wins_over_defaults() {
        let config = Configuration {
            default_metadata: Some(metadata(json!({"a": 1}))),
            include_default_metadata: true,
            ..base_config()
        };
        let payload =
            config.embedded_payload(None, Some(&metadata(json!({"a": 2, "b": 3}))));
        assert_eq!(payload.metadata, Some(metadata(json!({"a": 2, "b": 3}))));
    }

    #[test]
    fn defaults_not_embedded_when_excluded_but_merged_at_decode() {
        let config = Configuration {
            default_metadata: Some(metadata(json!({"a": 1}))),
            include_default_metadata: false,
            ..base_config()
        };

        let payload = config.embedded_payload(None, Some(&metadata(json!({"b": 3}))));
        assert_eq!(payload.metadata, Some(metadata(json!({"b": 3}))));

        let result = config.tracking_result(payload, None, true);
        assert_eq!(result.metadata, metadata(json!({"a": 1, "b": 3})));
    }

    #[test]
    fn embedded_keys_overwrite_local_defaults_at_decode() {
        let config = Configuration {
            default_metadata: Some(metadata(json!({"a": 1}))),
            include_default_metadata: false,
            ..base_config()
        };
        let payload = config.embedded_payload(None, Some(&metadata(json!({"a": 2}))));
        let result = config.tracking_result(payload, None, true);
        assert_eq!(result.metadata, metadata(json!({"a": 2})));
    }

    #[test]
    fn webhook_travels_in_link_when_included() {
        let config = Configuration {
            include_webhook_url: true,
            ..base_config()
        };
        let payload = config.embedded_payload(None, None);
        assert_eq!(payload.webhook.as_deref(), Some("https://hooks.example.com/t"));

        // The decode side then trusts the link, not local config.
        let other_decoder = Configuration {
            webhook_url: Some("https://other.example.com/hook".to_string()),
            include_webhook_url: true,
            ..base_config()
        };
        let result = other_decoder.tracking_result(payload, None, false);
        assert_eq!(
            result.webhook_url.as_deref(),
            Some("https://hooks.example.com/t")
        );
    }

    #[test]
    fn webhook_resolved_locally_when_not_included() {
        let config = base_config();
        let payload = config.embedded_payload(None, None);
        assert_eq!(payload.webhook, None);

        let result = config.tracking_result(payload, None, false);
        assert_eq!(
            result.webhook_url.as_deref(),
            Some("https://hooks.example.com/t")
        );
    }

    #[test]
    fn open_round_trip_plain() {
        let config = base_config();
        let url = config
            .open_tracking_url(Some(&metadata(json!({"user": 42}))))
            .unwrap();
        assert!(url.starts_with("https://t.example/o/"));

        let result = config.open_tracking_result(&url, None).unwrap();
        assert!(result.is_open_tracking);
        assert!(!result.is_click_tracking);
        assert_eq!(result.tracked_url, None);
        assert_eq!(result.metadata, metadata(json!({"user": 42})));
    }

    #[test]
    fn click_round_trip_plain() {
        let config = base_config();
        let url = config
            .click_tracking_url("https://example.com/page?x=1", Some(&metadata(json!({"c": "x"}))))
            .unwrap();
        assert!(url.starts_with("https://t.example/c/"));

        let result = config.click_tracking_result(&url, None).unwrap();
        assert!(result.is_click_tracking);
        assert!(!result.is_open_tracking);
        assert_eq!(result.tracked_url.as_deref(), Some("https://example.com/page?x=1"));
        assert_eq!(result.metadata, metadata(json!({"c": "x"})));
    }

    #[test]
    fn click_round_trip_encrypted() {
        let config = base_config()
            .merge(Overrides {
                encryption_key_material: Some(TrackingKey::generate().unwrap()),
                ..Overrides::default()
            })
            .unwrap();
        let url = config
            .click_tracking_url("https://example.com", Some(&metadata(json!({"k": [1, 2]}))))
            .unwrap();
        let result = config.click_tracking_result(&url, None).unwrap();
        assert_eq!(result.tracked_url.as_deref(), Some("https://example.com"));
        assert_eq!(result.metadata, metadata(json!({"k": [1, 2]})));
    }

    #[test]
    fn decode_accepts_bare_segment_and_slash_path() {
        let config = base_config();
        let url = config.open_tracking_url(None).unwrap();
        let segment = config.open_tracking_url_path(&url).to_string();

        assert!(config.open_tracking_result(&segment, None).is_ok());
        assert!(config
            .open_tracking_result(&format!("/{segment}"), None)
            .is_ok());
    }

    #[test]
    fn encrypted_link_rejected_by_keyless_decoder() {
        let sender = base_config()
            .merge(Overrides {
                encryption_key_material: Some(TrackingKey::generate().unwrap()),
                ..Overrides::default()
            })
            .unwrap();
        let url = sender.click_tracking_url("https://example.com", None).unwrap();
        assert!(base_config().click_tracking_result(&url, None).is_err());
    }

    #[test]
    fn plain_link_rejected_by_keyed_decoder() {
        let sender = base_config();
        let url = sender.click_tracking_url("https://example.com", None).unwrap();

        let receiver = base_config()
            .merge(Overrides {
                encryption_key_material: Some(TrackingKey::generate().unwrap()),
                ..Overrides::default()
            })
            .unwrap();
        assert!(receiver.click_tracking_result(&url, None).is_err());
    }

    #[test]
    fn missing_base_url_is_an_error() {
        let config = Configuration::default();
        let err = config.open_tracking_url(None).unwrap_err();
        assert!(matches!(err, TrackingError::MissingBaseUrl { purpose: "open" }));
        let err = config.click_tracking_url("https://example.com", None).unwrap_err();
        assert!(matches!(err, TrackingError::MissingBaseUrl { purpose: "click" }));
    }

    #[test]
    fn append_slash_applies_to_built_urls() {
        let config = Configuration {
            append_slash: true,
            ..base_config()
        };
        let url = config.open_tracking_url(None).unwrap();
        assert!(url.ends_with('/'));
    }

    #[test]
    fn request_data_passes_through_unchanged() {
        let config = base_config();
        let url = config.open_tracking_url(None).unwrap();
        let request_data = json!({"user_agent": "Mozilla/5.0", "ip": "10.0.0.1"});
        let result = config
            .open_tracking_result(&url, Some(request_data.clone()))
            .unwrap();
        assert_eq!(result.request_data, Some(request_data));
    }

    #[test]
    fn timestamp_is_captured_at_decode_time() {
        let config = base_config();
        let url = config.open_tracking_url(None).unwrap();
        let before = Utc::now().timestamp();
        let result = config.open_tracking_result(&url, None).unwrap();
        let after = Utc::now().timestamp();
        assert!(result.timestamp >= before && result.timestamp <= after);
    }

    #[test]
    fn url_path_extraction_matches_base() {
        let config = base_config();
        assert_eq!(
            config.click_tracking_url_path("https://t.example/c/AbCd123"),
            "AbCd123"
        );
        assert_eq!(config.click_tracking_url_path("/AbCd123"), "AbCd123");
        assert_eq!(
            config.open_tracking_url_path("https://t.example/o/XyZ"),
            "XyZ"
        );
    }
}
