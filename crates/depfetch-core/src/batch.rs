//! Sequential execution of a job list.
//!
//! Jobs run one after another on the calling thread. A failed job marks the
//! batch as having errors and the next job starts; a cancelled job (or a
//! token found signalled between jobs) ends the batch at once.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cancel::CancellationToken;
use crate::config::FetchConfig;
use crate::extract::{Extractor, NoExtraction, ZipExtractor};
use crate::fetcher::{ResumableFetcher, TransferOutcome};
use crate::http::{HttpClient, HttpOptions};
use crate::job::FetchJob;
use crate::provider::DriveProvider;
use crate::session::TransferSession;

/// Terminal state of a whole batch, delivered once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Cancelled,
    CompletedWithErrors,
    CompletedCleanly,
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOutcome::Cancelled => write!(f, "download cancelled"),
            BatchOutcome::CompletedWithErrors => write!(f, "downloads finished with errors"),
            BatchOutcome::CompletedCleanly => write!(f, "all downloads finished"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Jobs handed to the fetcher.
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,
    pub extraction_failures: usize,
    pub error_occurred: bool,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn outcome(&self) -> BatchOutcome {
        if self.cancelled {
            BatchOutcome::Cancelled
        } else if self.error_occurred {
            BatchOutcome::CompletedWithErrors
        } else {
            BatchOutcome::CompletedCleanly
        }
    }
}

/// Fetcher, session and extractor shared by every job of a batch.
pub struct BatchRunner {
    fetcher: ResumableFetcher,
    session: TransferSession,
    extractor: Arc<dyn Extractor>,
}

impl fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRunner")
            .field("fetcher", &self.fetcher)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl BatchRunner {
    pub fn new(
        fetcher: ResumableFetcher,
        session: TransferSession,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            fetcher,
            session,
            extractor,
        }
    }

    /// Runner backed by the configured provider and a libcurl client.
    pub fn from_config(cfg: &FetchConfig) -> Result<Self> {
        let client = HttpClient::new(HttpOptions::from(&cfg.http));
        let provider = DriveProvider::new(client, &cfg.provider)
            .with_context(|| format!("invalid provider endpoint {:?}", cfg.provider.endpoint))?;
        let extractor: Arc<dyn Extractor> = if cfg.extract_archives {
            Arc::new(ZipExtractor)
        } else {
            Arc::new(NoExtraction)
        };
        Ok(Self::new(
            ResumableFetcher::new(cfg.chunk_size),
            TransferSession::new(Arc::new(provider)),
            extractor,
        ))
    }

    /// Replace the fetcher, e.g. to attach a progress observer.
    pub fn with_fetcher(mut self, fetcher: ResumableFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn fetcher(&self) -> &ResumableFetcher {
        &self.fetcher
    }

    pub fn run_all(&self, jobs: &[FetchJob], cancel: &CancellationToken) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for (index, job) in jobs.iter().enumerate() {
            if cancel.is_signalled() {
                tracing::info!(remaining = jobs.len() - index, "batch cancelled between jobs");
                summary.cancelled = true;
                break;
            }
            summary.attempted += 1;
            match self.fetcher.fetch(job, &self.session, cancel) {
                TransferOutcome::Completed(report) => {
                    summary.completed += 1;
                    if report.completion.finalized_now() {
                        if let Err(e) = self
                            .extractor
                            .extract(&report.destination, job.destination_dir())
                        {
                            tracing::warn!(
                                job = %job.description(),
                                path = %report.destination.display(),
                                error = %format!("{e:#}"),
                                "extraction failed"
                            );
                            summary.extraction_failures += 1;
                            summary.error_occurred = true;
                        }
                    }
                }
                TransferOutcome::Failed(_) => {
                    summary.failed += 1;
                    summary.error_occurred = true;
                }
                TransferOutcome::Cancelled => {
                    summary.cancelled = true;
                    break;
                }
            }
        }
        tracing::info!(
            attempted = summary.attempted,
            completed = summary.completed,
            failed = summary.failed,
            outcome = ?summary.outcome(),
            "batch finished"
        );
        summary
    }
}
