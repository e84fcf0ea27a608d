//! Provider interface for turning content identifiers into responses.
//!
//! The fetch engine only depends on this trait and does not know how a
//! hosting provider maps identifiers to URLs or confirms large downloads.

mod drive;

pub use drive::DriveProvider;

use crate::cancel::CancellationToken;
use crate::error::FetchError;
use crate::http::RemoteResponse;

/// Resolves an identifier plus extra request headers (e.g. `Range`) into the
/// final, streamable response. Any provider handshake happens inside.
pub trait ContentProvider: Send + Sync {
    fn resolve(
        &self,
        identifier: &str,
        extra_headers: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<RemoteResponse, FetchError>;
}
