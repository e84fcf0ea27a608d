//! `depfetch run` – download every enabled manifest entry.

use anyhow::{Context, Result};
use depfetch_core::batch::{BatchOutcome, BatchRunner};
use depfetch_core::config::FetchConfig;
use depfetch_core::job::FetchJob;
use depfetch_core::manifest::Manifest;
use depfetch_core::worker::Controller;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::exit_code;
use super::progress::progress_printer;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run_manifest(
    cfg: &FetchConfig,
    manifest_path: &Path,
    targets: &[(String, PathBuf)],
) -> Result<i32> {
    let manifest = Manifest::load(manifest_path)?;
    let jobs = manifest.to_jobs(targets)?;
    if jobs.is_empty() {
        println!("Nothing to download in {}.", manifest_path.display());
        return Ok(0);
    }
    tracing::info!(
        manifest = %manifest_path.display(),
        jobs = jobs.len(),
        "running manifest"
    );
    Ok(exit_code(execute_batch(cfg, jobs)?))
}

/// Run `jobs` on a worker thread until they finish or Ctrl+C cancels them.
pub(super) fn execute_batch(cfg: &FetchConfig, jobs: Vec<FetchJob>) -> Result<BatchOutcome> {
    let runner = BatchRunner::from_config(cfg)?;
    let fetcher = runner.fetcher().clone().with_progress(progress_printer());
    let controller = Controller::new(Arc::new(runner.with_fetcher(fetcher)));

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    for job in &jobs {
        println!("  {} -> {}", job.description(), job.destination_dir().display());
    }
    let handle = controller.start(jobs, |outcome| {
        eprintln!();
        println!("{outcome}.");
    })?;

    let mut cancel_sent = false;
    while handle.is_running() {
        if !cancel_sent && interrupted.load(Ordering::SeqCst) {
            eprintln!();
            eprintln!("Cancelling; partial downloads are kept and resumed on the next run...");
            controller.cancel(&handle);
            cancel_sent = true;
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(handle.join())
}
