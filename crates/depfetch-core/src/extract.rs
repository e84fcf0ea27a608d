//! Unpacking of finalized archives into the job's destination folder.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use zip::ZipArchive;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Post-download step run on each freshly finalized artifact.
pub trait Extractor: Send + Sync {
    /// Extracts `archive` into `target`. Files the extractor does not handle
    /// are left alone and reported as success.
    fn extract(&self, archive: &Path, target: &Path) -> Result<()>;
}

/// Leaves every artifact as downloaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtraction;

impl Extractor for NoExtraction {
    fn extract(&self, _archive: &Path, _target: &Path) -> Result<()> {
        Ok(())
    }
}

/// Extracts `.zip` archives with the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    fn handles(archive: &Path) -> bool {
        archive
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
    }
}

impl Extractor for ZipExtractor {
    fn extract(&self, archive: &Path, target: &Path) -> Result<()> {
        if !Self::handles(archive) {
            tracing::debug!(path = %archive.display(), "not a zip archive, leaving as is");
            return Ok(());
        }
        let count = extract_zip(archive, target)?;
        tracing::info!(
            archive = %archive.display(),
            target = %target.display(),
            entries = count,
            "archive extracted"
        );
        Ok(())
    }
}

fn extract_zip(source: &Path, target: &Path) -> Result<usize> {
    let file = File::open(source)
        .with_context(|| format!("failed to open archive {}", source.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("failed to read zip archive {}", source.display()))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .with_context(|| format!("failed to read entry {index} of {}", source.display()))?;
        let destination = target.join(sanitize_entry_path(entry.name())?);

        if entry.is_dir() {
            fs::create_dir_all(&destination)
                .with_context(|| format!("failed to create {}", destination.display()))?;
            continue;
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut output = File::create(&destination)
            .with_context(|| format!("failed to create {}", destination.display()))?;
        io::copy(&mut entry, &mut output)
            .with_context(|| format!("failed to extract {}", destination.display()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            fs::set_permissions(&destination, fs::Permissions::from_mode(mode))
                .with_context(|| format!("failed to set permissions on {}", destination.display()))?;
        }
    }
    Ok(archive.len())
}

/// Entry path relative to the target folder; absolute paths and `..` are refused.
fn sanitize_entry_path(entry: &str) -> Result<PathBuf> {
    let path = Path::new(entry);
    ensure!(!path.is_absolute(), "archive entry '{entry}' is absolute");

    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => clean.push(segment),
            Component::CurDir => {}
            _ => bail!("archive entry '{entry}' escapes the target folder"),
        }
    }
    ensure!(!clean.as_os_str().is_empty(), "archive entry '{entry}' is empty");
    Ok(clean)
}
