//! HTML rewriting helpers: click-tracking link replacement and tracking
//! pixel insertion.
//!
//! HTML parsing and serialization are external collaborators. This module
//! only decides which links qualify for rewriting and where the pixel goes;
//! the document itself is reached through the [`HtmlDocument`] seam.

use crate::config::{Configuration, PixelPosition};
use crate::error::TrackingError;
use crate::types::Metadata;

/// Doctype a serialized document is expected to carry.
pub const DOCTYPE: &str = "<!DOCTYPE html>";

/// Fixed attributes of the tracking pixel element, excluding `src`.
pub const PIXEL_ATTRIBUTES: [(&str, &str); 4] =
    [("border", "0"), ("width", "0"), ("height", "0"), ("alt", "")];

const TRACKABLE_SCHEMES: [&str; 3] = ["http://", "https://", "//"];

/// A parsed HTML document, supplied by the caller's HTML library of choice.
pub trait HtmlDocument {
    /// Visit every anchor `href` in document order; return `Some(new)` from
    /// the visitor to replace the attribute value.
    fn rewrite_anchor_hrefs(&mut self, rewrite: &mut dyn FnMut(&str) -> Option<String>);

    /// Insert an `<img>` element with the given attributes at the start or
    /// end of the document body. A fragment without a body element inserts
    /// at the start of the document root instead.
    fn insert_image(&mut self, attributes: &[(&str, String)], position: PixelPosition);

    /// Serialize the document, including a doctype declaration and a
    /// content-type meta element.
    fn to_html(&self) -> String;
}

/// Whether an anchor href qualifies for click-tracking rewriting.
///
/// Absolute http(s) and protocol-relative links qualify; relative links,
/// mailto:, javascript:, and fragment anchors do not. Links already
/// pointing at the click-tracking base are skipped to avoid double-wrapping.
pub fn is_trackable_link(href: &str, config: &Configuration) -> bool {
    let has_scheme = TRACKABLE_SCHEMES.iter().any(|s| href.starts_with(s));
    match config.base_click_tracking_url.as_deref() {
        Some(base) if !base.is_empty() => has_scheme && !href.starts_with(base),
        _ => has_scheme,
    }
}

/// Replace every trackable anchor href with its click-tracking URL.
pub fn rewrite_links<D: HtmlDocument + ?Sized>(
    document: &mut D,
    extra_metadata: Option<&Metadata>,
    config: &Configuration,
) -> Result<(), TrackingError> {
    let mut failure = None;
    let mut rewritten = 0usize;
    document.rewrite_anchor_hrefs(&mut |href| {
        if failure.is_some() || !is_trackable_link(href, config) {
            return None;
        }
        match config.click_tracking_url(href, extra_metadata) {
            Ok(url) => {
                rewritten += 1;
                Some(url)
            }
            Err(err) => {
                failure = Some(err);
                None
            }
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }
    tracing::debug!(rewritten, "rewrote trackable links");
    Ok(())
}

/// Insert the open-tracking pixel element per the configured position.
pub fn insert_tracking_pixel<D: HtmlDocument + ?Sized>(
    document: &mut D,
    extra_metadata: Option<&Metadata>,
    config: &Configuration,
) -> Result<(), TrackingError> {
    let src = config.open_tracking_url(extra_metadata)?;
    let mut attributes = vec![("src", src)];
    attributes.extend(
        PIXEL_ATTRIBUTES
            .iter()
            .map(|(name, value)| (*name, (*value).to_string())),
    );
    document.insert_image(&attributes, config.pixel_position);
    Ok(())
}

/// Rewrite links and/or insert the tracking pixel, then serialize.
pub fn adapt_html<D: HtmlDocument + ?Sized>(
    document: &mut D,
    extra_metadata: Option<&Metadata>,
    click_tracking: bool,
    open_tracking: bool,
    config: &Configuration,
) -> Result<String, TrackingError> {
    if click_tracking {
        rewrite_links(document, extra_metadata, config)?;
    }
    if open_tracking {
        insert_tracking_pixel(document, extra_metadata, config)?;
    }
    Ok(document.to_html())
}
