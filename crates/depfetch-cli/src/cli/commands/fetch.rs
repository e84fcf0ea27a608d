//! `depfetch fetch` – download one file by identifier.

use anyhow::{Context, Result};
use depfetch_core::config::FetchConfig;
use depfetch_core::job::FetchJob;
use std::path::Path;

use super::exit_code;
use super::run::execute_batch;

pub fn run_fetch(
    cfg: &FetchConfig,
    id: String,
    filename: Option<String>,
    dest: &Path,
) -> Result<i32> {
    let job = FetchJob::new(id, filename, dest)
        .with_context(|| format!("invalid destination {}", dest.display()))?;
    Ok(exit_code(execute_batch(cfg, vec![job])?))
}
