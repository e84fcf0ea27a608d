//! Single-file resumable fetch.
//!
//! Decides between a fresh transfer and a resume from an existing `.part`
//! file, gates the response status on that decision, streams the body into
//! the `.part` file in fixed-size chunks (checking the cancellation token
//! before every write), and renames the file once the body is exhausted.

mod outcome;

pub use outcome::{Completion, FetchProgress, FetchReport, TransferOutcome};

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::error::{FetchError, ProtocolError, TransferMode};
use crate::job::FetchJob;
use crate::session::TransferSession;
use crate::storage::{self, PartFile};

/// Chunk size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

const FRESH_OK: &[u32] = &[200];
const RESUME_OK: &[u32] = &[206, 416];
const RANGE_NOT_SATISFIABLE: u32 = 416;

/// Observer called after each chunk is written.
pub type ProgressFn = Arc<dyn Fn(&FetchProgress<'_>) + Send + Sync>;

/// Fresh transfer or continuation of a `.part` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    Fresh,
    Resume { offset: u64 },
}

impl Plan {
    fn mode(self) -> TransferMode {
        match self {
            Plan::Fresh => TransferMode::Fresh,
            Plan::Resume { .. } => TransferMode::Resume,
        }
    }

    fn accepted(self) -> &'static [u32] {
        match self {
            Plan::Fresh => FRESH_OK,
            Plan::Resume { .. } => RESUME_OK,
        }
    }

    fn request_headers(self) -> Vec<(String, String)> {
        match self {
            Plan::Fresh => Vec::new(),
            Plan::Resume { offset } => vec![("Range".to_string(), format!("bytes={offset}-"))],
        }
    }

    fn check_status(self, status: u32) -> Result<(), ProtocolError> {
        if self.accepted().contains(&status) {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedStatus {
                mode: self.mode(),
                expected: self.accepted(),
                actual: status,
            })
        }
    }
}

#[derive(Debug, Default)]
struct StreamStats {
    bytes: u64,
    chunks: u64,
}

#[derive(Clone)]
pub struct ResumableFetcher {
    chunk_size: usize,
    progress: Option<ProgressFn>,
}

impl Default for ResumableFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl std::fmt::Debug for ResumableFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumableFetcher")
            .field("chunk_size", &self.chunk_size)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ResumableFetcher {
    /// `chunk_size` of zero is treated as one byte.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Fetches one job. Failures and cancellation are returned as outcomes,
    /// never as panics or errors; the `.part` file survives both.
    pub fn fetch(
        &self,
        job: &FetchJob,
        session: &TransferSession,
        cancel: &CancellationToken,
    ) -> TransferOutcome {
        let _span = tracing::info_span!("fetch", job = %job.description()).entered();
        match self.try_fetch(job, session, cancel) {
            Ok(report) => {
                tracing::info!(
                    path = %report.destination.display(),
                    completion = ?report.completion,
                    bytes = report.bytes_written,
                    "fetch completed"
                );
                TransferOutcome::Completed(report)
            }
            Err(FetchError::Cancelled) => {
                tracing::info!(identifier = job.identifier(), "fetch cancelled");
                TransferOutcome::Cancelled
            }
            Err(e) => {
                tracing::warn!(identifier = job.identifier(), error = %e, "fetch failed");
                TransferOutcome::Failed(e)
            }
        }
    }

    fn try_fetch(
        &self,
        job: &FetchJob,
        session: &TransferSession,
        cancel: &CancellationToken,
    ) -> Result<FetchReport, FetchError> {
        if cancel.is_signalled() {
            return Err(FetchError::Cancelled);
        }

        let filename = match job.filename() {
            Some(name) => name.to_string(),
            None => session.resolve_filename(job.identifier(), cancel)?,
        };
        let dir = job.destination_dir();
        fs::create_dir_all(dir).map_err(|e| FetchError::fs("create dir", dir, e))?;
        let destination = dir.join(&filename);

        if storage::occupied(&destination) {
            tracing::info!(path = %destination.display(), "destination exists, skipping");
            return Ok(FetchReport::skipped(destination));
        }

        let temp = storage::temp_path(&destination);
        let plan = match storage::partial_len(&destination)
            .map_err(|e| FetchError::fs("stat", &temp, e))?
        {
            Some(offset) => Plan::Resume { offset },
            None => Plan::Fresh,
        };
        tracing::debug!(?plan, temp = %temp.display(), "starting transfer");

        let response = session.open(job.identifier(), &plan.request_headers(), cancel)?;
        plan.check_status(response.status)?;

        let (mut part, completion) = match plan {
            Plan::Resume { offset } if response.status == RANGE_NOT_SATISFIABLE => {
                tracing::debug!(offset, "server reports nothing left to fetch");
                drop(response);
                let part = PartFile::append(&temp)?;
                part.finalize(&destination)?;
                return Ok(FetchReport {
                    destination,
                    completion: Completion::AlreadyComplete,
                    bytes_written: 0,
                    chunks_written: 0,
                });
            }
            Plan::Resume { offset } => (PartFile::append(&temp)?, Completion::Resumed { from: offset }),
            Plan::Fresh => (PartFile::create(&temp)?, Completion::Downloaded),
        };

        let body_len = response.headers.content_length();
        let expected_total = body_len.map(|n| n + part.len());
        let stats = self.stream(
            job,
            &destination,
            response.body,
            &mut part,
            cancel,
            expected_total,
        )?;
        if let Some(expected) = body_len {
            if stats.bytes != expected {
                return Err(FetchError::transport(
                    "body",
                    format!("expected {expected} bytes, received {}", stats.bytes),
                ));
            }
        }

        part.finalize(&destination)?;
        Ok(FetchReport {
            destination,
            completion,
            bytes_written: stats.bytes,
            chunks_written: stats.chunks,
        })
    }

    fn stream(
        &self,
        job: &FetchJob,
        destination: &Path,
        mut body: Box<dyn Read + Send>,
        part: &mut PartFile,
        cancel: &CancellationToken,
        expected_total: Option<u64>,
    ) -> Result<StreamStats, FetchError> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut stats = StreamStats::default();
        loop {
            let n = match read_chunk(&mut body, &mut buf) {
                Ok(n) => n,
                // The transfer is aborted on cancel; the read error is its echo.
                Err(_) if cancel.is_signalled() => return Err(FetchError::Cancelled),
                Err(e) => return Err(FetchError::transport("body", e)),
            };
            if n == 0 {
                return Ok(stats);
            }
            if cancel.is_signalled() {
                tracing::debug!(kept = part.len(), "cancel observed, keeping partial file");
                return Err(FetchError::Cancelled);
            }
            part.write_chunk(&buf[..n])?;
            stats.bytes += n as u64;
            stats.chunks += 1;

            if let Some(progress) = &self.progress {
                progress(&FetchProgress {
                    description: job.description(),
                    destination,
                    bytes_on_disk: part.len(),
                    expected_total,
                });
            }
        }
    }
}

/// Fills `buf` unless the body ends first. Returns the number of bytes read.
fn read_chunk(body: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match body.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
