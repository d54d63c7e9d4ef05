//! The static open-tracking pixel asset.

/// A 1x1 transparent PNG, served by tracking endpoints that answer the
/// pixel request directly instead of redirecting.
pub const TRACKING_PIXEL: [u8; 68] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0xb5,
    0x1c, 0x0c, 0x02, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64,
    0x60, 0x00, 0x00, 0x00, 0x06, 0x00, 0x02, 0x30, 0x81, 0xd0, 0x2f, 0x00, 0x00, 0x00, 0x00,
    0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// MIME type of [`TRACKING_PIXEL`].
pub const PNG_MIME_TYPE: &str = "image/png";

/// The pixel bytes and their MIME type, as a pair.
pub fn open_tracking_pixel() -> (&'static [u8], &'static str) {
    (&TRACKING_PIXEL, PNG_MIME_TYPE)
}
