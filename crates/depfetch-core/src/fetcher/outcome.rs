//! Per-job results.

use std::path::{Path, PathBuf};

use crate::error::FetchError;

/// How a completed job reached its final artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The final file already existed; nothing was requested or verified.
    Skipped,
    /// Whole file fetched in this pass.
    Downloaded,
    /// Remaining bytes appended to a `.part` file holding `from` bytes.
    Resumed { from: u64 },
    /// The server answered the resume request with 416: the `.part` file was
    /// already complete and has been finalized.
    AlreadyComplete,
}

impl Completion {
    /// True if this pass produced (renamed) the final artifact.
    pub fn finalized_now(self) -> bool {
        !matches!(self, Completion::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub destination: PathBuf,
    pub completion: Completion,
    /// Bytes appended in this pass.
    pub bytes_written: u64,
    pub chunks_written: u64,
}

impl FetchReport {
    pub(crate) fn skipped(destination: PathBuf) -> Self {
        Self {
            destination,
            completion: Completion::Skipped,
            bytes_written: 0,
            chunks_written: 0,
        }
    }
}

/// Result of one fetch: completed, cancelled, or failed with a reason.
#[derive(Debug)]
pub enum TransferOutcome {
    Completed(FetchReport),
    Cancelled,
    Failed(FetchError),
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferOutcome::Cancelled)
    }

    pub fn report(&self) -> Option<&FetchReport> {
        match self {
            TransferOutcome::Completed(r) => Some(r),
            _ => None,
        }
    }
}

/// Progress after each written chunk.
#[derive(Debug, Clone, Copy)]
pub struct FetchProgress<'a> {
    pub description: &'a str,
    pub destination: &'a Path,
    /// Bytes in the `.part` file, including earlier passes.
    pub bytes_on_disk: u64,
    /// Full size if the server announced a length.
    pub expected_total: Option<u64>,
}
