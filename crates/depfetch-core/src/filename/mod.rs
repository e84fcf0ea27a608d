//! Filename resolution from response headers.

mod content_disposition;
mod sanitize;

pub use content_disposition::parse_content_disposition;
pub use sanitize::sanitize_filename;

/// Filename to store a download under, taken from a `Content-Disposition`
/// value. Unlike a URL-based download there is no fallback: an opaque
/// identifier carries no name of its own.
pub fn filename_from_disposition(header_value: Option<&str>) -> Option<String> {
    header_value
        .and_then(parse_content_disposition)
        .and_then(|raw| sanitize_filename(&raw))
}
