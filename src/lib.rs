//! Open and click tracking link codec.
//!
//! Embeds a JSON payload (tracked URL, metadata, webhook URL) into a compact
//! URL-safe string, builds full tracking URLs from it, and decodes inbound
//! tracking requests back into structured [`TrackingResult`]s. When key
//! material is configured the payload travels as an authenticated AES-256-GCM
//! token; otherwise it is plain base64url (NOT confidential).
//!
//! HTML parsing, HTTP serving, and webhook delivery are external
//! collaborators: the [`html`] module reaches the document through the
//! [`HtmlDocument`] trait, and a webhook notifier receives a decoded
//! [`TrackingResult`] to forward.

pub mod codec;
pub mod config;
pub mod error;
pub mod html;
pub mod key;
pub mod pixel;
pub mod types;
pub mod url;

pub use codec::{decode, encode, TextEncoding};
pub use config::{Configuration, Overrides, PixelPosition, DEFAULT_WEBHOOK_TIMEOUT_SECONDS};
pub use error::{ErrorKind, TrackingError};
pub use html::{
    adapt_html, insert_tracking_pixel, is_trackable_link, rewrite_links, HtmlDocument,
};
pub use key::TrackingKey;
pub use pixel::{open_tracking_pixel, PNG_MIME_TYPE, TRACKING_PIXEL};
pub use types::{Metadata, Payload, TrackingResult};
pub use url::{build_url, extract_encoded_segment};
