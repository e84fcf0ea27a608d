//! Fetcher-facing access to a content provider.

use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::error::{FetchError, ProtocolError, TransferMode};
use crate::filename::filename_from_disposition;
use crate::http::RemoteResponse;
use crate::provider::ContentProvider;

/// Status accepted when probing for a filename.
const PROBE_OK: &[u32] = &[200];

/// One provider plus the checkpoints the fetcher relies on. Cheap to clone.
#[derive(Clone)]
pub struct TransferSession {
    provider: Arc<dyn ContentProvider>,
}

impl TransferSession {
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        Self { provider }
    }

    /// Resolves `identifier` to a streaming response. The token is checked
    /// before any request is issued; no retries are attempted.
    pub fn open(
        &self,
        identifier: &str,
        extra_headers: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<RemoteResponse, FetchError> {
        if cancel.is_signalled() {
            return Err(FetchError::Cancelled);
        }
        self.provider.resolve(identifier, extra_headers, cancel)
    }

    /// Learns the filename from the response's `Content-Disposition` header.
    /// The body is not read; the connection is closed right away.
    pub fn resolve_filename(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let close = [("Connection".to_string(), "close".to_string())];
        let response = self.open(identifier, &close, cancel)?;
        if !PROBE_OK.contains(&response.status) {
            return Err(ProtocolError::UnexpectedStatus {
                mode: TransferMode::Probe,
                expected: PROBE_OK,
                actual: response.status,
            }
            .into());
        }
        let name = filename_from_disposition(response.headers.get("content-disposition"))
            .ok_or(ProtocolError::MissingFilename)?;
        tracing::debug!(identifier, filename = %name, "filename resolved from response headers");
        Ok(name)
    }
}

impl std::fmt::Debug for TransferSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSession").finish_non_exhaustive()
    }
}
