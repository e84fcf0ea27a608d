//! On-disk lifecycle of a download.
//!
//! Bytes land in `<final>.part`; its size is the resume offset. Only a fully
//! received file is renamed to its final name, so a `.part` suffix always
//! marks an incomplete artifact.

mod part_file;

pub use part_file::PartFile;

use std::io;
use std::path::{Path, PathBuf};

/// Suffix marking an in-flight download.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `lib.zip` → `lib.zip.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// True if anything (file, directory, dangling symlink) occupies `path`.
pub fn occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Bytes already received for `final_path`, or `None` when no `.part` file exists.
pub fn partial_len(final_path: &Path) -> io::Result<Option<u64>> {
    match temp_path(final_path).metadata() {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// What is on disk for one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Complete,
    Partial(u64),
    Missing,
}

pub fn artifact_state(final_path: &Path) -> io::Result<ArtifactState> {
    if occupied(final_path) {
        return Ok(ArtifactState::Complete);
    }
    Ok(match partial_len(final_path)? {
        Some(n) => ArtifactState::Partial(n),
        None => ArtifactState::Missing,
    })
}
