//! In-memory provider for unit tests.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::Mutex;

use crate::cancel::CancellationToken;
use crate::error::FetchError;
use crate::http::{HeaderList, RemoteResponse};
use crate::provider::ContentProvider;

/// Deterministic, non-repeating-looking payload of `len` bytes.
pub(crate) fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 7) % 251) as u8).collect()
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryFile {
    pub body: Vec<u8>,
    pub disposition: Option<String>,
    /// Replaces the status the range logic would pick.
    pub status: Option<u32>,
    /// Announce this Content-Length instead of the served length.
    pub content_length: Option<u64>,
    pub transport_failure: bool,
    /// Signal the token as soon as the response is produced.
    pub signal_on_open: bool,
    /// Signal the token once this many body bytes have been read.
    pub signal_after_bytes: Option<usize>,
}

impl MemoryFile {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub identifier: String,
    pub range: Option<String>,
}

#[derive(Default)]
pub(crate) struct MemoryProvider {
    files: Mutex<HashMap<String, MemoryFile>>,
    calls: Mutex<Vec<Call>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, identifier: &str, file: MemoryFile) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(identifier.to_string(), file);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, identifier: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.identifier == identifier)
            .count()
    }
}

impl ContentProvider for MemoryProvider {
    fn resolve(
        &self,
        identifier: &str,
        extra_headers: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<RemoteResponse, FetchError> {
        let range = extra_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("range"))
            .map(|(_, v)| v.clone());
        self.calls.lock().unwrap().push(Call {
            identifier: identifier.to_string(),
            range: range.clone(),
        });

        let file = self
            .files
            .lock()
            .unwrap()
            .get(identifier)
            .cloned()
            .ok_or_else(|| FetchError::transport("request", "unknown identifier"))?;
        if file.transport_failure {
            return Err(FetchError::transport("request", "connection refused"));
        }

        let offset = range
            .as_deref()
            .and_then(|r| r.strip_prefix("bytes="))
            .and_then(|r| r.strip_suffix('-'))
            .map(|n| n.parse::<usize>().unwrap());
        let (status, served) = match offset {
            Some(n) if n >= file.body.len() => (416, Vec::new()),
            Some(n) => (206, file.body[n..].to_vec()),
            None => (200, file.body.clone()),
        };
        let status = file.status.unwrap_or(status);

        let mut headers = HeaderList::new();
        let announced = file.content_length.unwrap_or(served.len() as u64);
        headers.push("Content-Length", announced.to_string());
        if let Some(d) = &file.disposition {
            headers.push("Content-Disposition", d.clone());
        }
        if file.signal_on_open {
            cancel.signal();
        }
        let body = SignalAfter {
            inner: Cursor::new(served),
            remaining: file.signal_after_bytes,
            cancel: cancel.clone(),
        };
        Ok(RemoteResponse::new(status, headers, body))
    }
}

/// Reader that signals a token after delivering a number of bytes.
struct SignalAfter {
    inner: Cursor<Vec<u8>>,
    remaining: Option<usize>,
    cancel: CancellationToken,
}

impl Read for SignalAfter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = self.remaining.map_or(buf.len(), |r| r.min(buf.len()));
        let n = self.inner.read(&mut buf[..limit])?;
        if let Some(r) = self.remaining.as_mut() {
            *r -= n;
            if *r == 0 {
                self.cancel.signal();
                self.remaining = None;
            }
        }
        Ok(n)
    }
}
