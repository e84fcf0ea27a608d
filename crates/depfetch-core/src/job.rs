//! Fetch job description.

use std::io;
use std::path::{Component, Path, PathBuf};

/// One file to fetch. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    identifier: String,
    filename: Option<String>,
    destination_dir: PathBuf,
    description: String,
}

impl FetchJob {
    /// Builds a job; `destination_dir` is made absolute against the current
    /// working directory (it does not need to exist yet). An explicit
    /// filename must be a plain name inside that directory.
    pub fn new(
        identifier: impl Into<String>,
        filename: Option<String>,
        destination_dir: impl AsRef<Path>,
    ) -> io::Result<Self> {
        let identifier = identifier.into();
        let filename = filename.filter(|f| !f.trim().is_empty());
        if let Some(name) = &filename {
            check_plain_name(name)?;
        }
        Ok(Self {
            description: identifier.clone(),
            identifier,
            filename,
            destination_dir: std::path::absolute(destination_dir.as_ref())?,
        })
    }

    /// Human-readable label used in logs and progress output.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Explicit filename, if the job declares one.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn destination_dir(&self) -> &Path {
        &self.destination_dir
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Final artifact path when the filename is known up front.
    pub fn destination_path(&self) -> Option<PathBuf> {
        self.filename.as_ref().map(|f| self.destination_dir.join(f))
    }
}

/// Rejects names that would place the file outside the destination directory.
fn check_plain_name(name: &str) -> io::Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("filename {name:?} must be a plain file name"),
        )),
    }
}
