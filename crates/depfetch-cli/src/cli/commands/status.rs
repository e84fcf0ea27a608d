//! `depfetch status` – show what is on disk for each manifest entry.

use anyhow::Result;
use depfetch_core::job::FetchJob;
use depfetch_core::manifest::Manifest;
use depfetch_core::storage::{self, ArtifactState};
use std::path::{Path, PathBuf};

pub fn run_status(manifest_path: &Path, targets: &[(String, PathBuf)]) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let jobs = manifest.to_jobs(targets)?;
    if jobs.is_empty() {
        println!("No enabled downloads in {}.", manifest_path.display());
        return Ok(());
    }
    println!("{:<24} {:<32} {}", "STATE", "DESCRIPTION", "PATH");
    for job in &jobs {
        let (state, path) = describe(job)?;
        println!("{:<24} {:<32} {}", state, job.description(), path);
    }
    Ok(())
}

fn describe(job: &FetchJob) -> Result<(String, String)> {
    let Some(path) = job.destination_path() else {
        return Ok((
            "unknown".to_string(),
            job.destination_dir().display().to_string(),
        ));
    };
    let state = match storage::artifact_state(&path)? {
        ArtifactState::Complete => "complete".to_string(),
        ArtifactState::Partial(n) => format!("partial ({n} bytes)"),
        ArtifactState::Missing => "missing".to_string(),
    };
    Ok((state, path.display().to_string()))
}
