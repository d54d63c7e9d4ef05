use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata attached to a tracking link. Insertion order is preserved so a
/// given payload always encodes to the same JSON.
pub type Metadata = serde_json::Map<String, Value>;

/// The data embedded in a tracking URL.
///
/// Keys are omitted entirely when not applicable, never serialized as null.
/// `url` is present only for click-tracking links; `webhook` only when the
/// configuration asked for the webhook URL to travel inside the link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
}

/// Structured result of decoding an inbound tracking request.
///
/// Exactly one of `is_open_tracking` / `is_click_tracking` is true.
/// `timestamp` is captured at decode time (Unix seconds, UTC), not carried
/// in the link. `request_data` is opaque caller-supplied context (user
/// agent, IP, ...) passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingResult {
    pub is_open_tracking: bool,
    pub is_click_tracking: bool,
    pub tracked_url: Option<String>,
    pub webhook_url: Option<String>,
    pub metadata: Metadata,
    pub request_data: Option<Value>,
    pub timestamp: i64,
}
