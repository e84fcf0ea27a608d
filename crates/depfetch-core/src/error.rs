//! Per-job error taxonomy.

use std::fmt;
use std::path::{Path, PathBuf};

/// Which kind of request a status code was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// No partial file; the whole resource is requested.
    Fresh,
    /// A `.part` file exists; only the remaining bytes are requested.
    Resume,
    /// Header-only probe used to learn the filename.
    Probe,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Fresh => write!(f, "fresh"),
            TransferMode::Resume => write!(f, "resume"),
            TransferMode::Probe => write!(f, "probe"),
        }
    }
}

/// The server answered, but not in a way the fetcher can use.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("{mode} request returned HTTP {actual}, expected one of {expected:?}")]
    UnexpectedStatus {
        mode: TransferMode,
        expected: &'static [u32],
        actual: u32,
    },
    #[error("no usable filename in Content-Disposition header")]
    MissingFilename,
}

/// Error returned by a single fetch. Converted to a `Failed` outcome by the
/// fetcher; `Cancelled` is converted to a `Cancelled` outcome instead.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection could not be established or was dropped mid-stream.
    #[error("transport failure during {stage}: {message}")]
    Transport { stage: &'static str, message: String },
    /// Unexpected status code or missing filename header.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Local read/write/rename failure. The `.part` file is kept.
    #[error("filesystem failure ({op}) on {}: {source}", path.display())]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The cancellation token was observed. Not a failure.
    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    pub(crate) fn transport(stage: &'static str, message: impl fmt::Display) -> Self {
        FetchError::Transport {
            stage,
            message: message.to_string(),
        }
    }

    pub(crate) fn fs(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        FetchError::Filesystem {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}
