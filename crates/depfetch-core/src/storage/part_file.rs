//! Sequential writer for a `.part` file.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::FetchError;

/// Open `.part` file being filled in order. Dropping it without
/// `finalize` leaves the file in place for a later resume.
#[derive(Debug)]
pub struct PartFile {
    file: File,
    temp_path: PathBuf,
    len: u64,
}

impl PartFile {
    /// Create (or truncate) the temp file for a fresh transfer.
    pub fn create(temp_path: &Path) -> Result<Self, FetchError> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .map_err(|e| FetchError::fs("create", temp_path, e))?;
        Ok(Self {
            file,
            temp_path: temp_path.to_path_buf(),
            len: 0,
        })
    }

    /// Open an existing temp file for appending the remaining bytes.
    pub fn append(temp_path: &Path) -> Result<Self, FetchError> {
        let file = File::options()
            .append(true)
            .open(temp_path)
            .map_err(|e| FetchError::fs("open for append", temp_path, e))?;
        let len = file
            .metadata()
            .map_err(|e| FetchError::fs("stat", temp_path, e))?
            .len();
        Ok(Self {
            file,
            temp_path: temp_path.to_path_buf(),
            len,
        })
    }

    pub fn write_chunk(&mut self, data: &[u8]) -> Result<(), FetchError> {
        self.file
            .write_all(data)
            .map_err(|e| FetchError::fs("write", &self.temp_path, e))?;
        self.len += data.len() as u64;
        Ok(())
    }

    /// Total bytes in the file, including bytes from earlier passes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sync and rename to `final_path`. Refuses to replace an existing
    /// artifact. On any error the `.part` file stays where it is.
    pub fn finalize(self, final_path: &Path) -> Result<(), FetchError> {
        self.file
            .sync_all()
            .map_err(|e| FetchError::fs("sync", &self.temp_path, e))?;
        let temp_path = self.temp_path;
        drop(self.file);

        if super::occupied(final_path) {
            return Err(FetchError::fs(
                "finalize",
                final_path,
                io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
            ));
        }
        std::fs::rename(&temp_path, final_path)
            .map_err(|e| FetchError::fs("rename", final_path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::temp_path;

    #[test]
    fn create_write_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("lib.zip");
        let tp = temp_path(&final_path);

        let mut part = PartFile::create(&tp).unwrap();
        part.write_chunk(b"hello ").unwrap();
        part.write_chunk(b"world").unwrap();
        assert_eq!(part.len(), 11);
        part.finalize(&final_path).unwrap();

        assert!(!tp.exists());
        assert_eq!(std::fs::read(&final_path).unwrap(), b"hello world");
    }

    #[test]
    fn append_continues_existing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("lib.zip.part");
        std::fs::write(&tp, b"abc").unwrap();

        let mut part = PartFile::append(&tp).unwrap();
        assert_eq!(part.len(), 3);
        part.write_chunk(b"def").unwrap();
        assert_eq!(part.len(), 6);
        drop(part);
        assert_eq!(std::fs::read(&tp).unwrap(), b"abcdef");
    }

    #[test]
    fn create_truncates_stale_temp() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("lib.zip.part");
        std::fs::write(&tp, b"stale bytes").unwrap();
        let part = PartFile::create(&tp).unwrap();
        assert!(part.is_empty());
        assert_eq!(std::fs::metadata(&tp).unwrap().len(), 0);
    }

    #[test]
    fn failed_rename_keeps_temp_and_final_absent() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("lib.zip.part");
        let final_path = dir.path().join("missing-dir").join("lib.zip");

        let mut part = PartFile::create(&tp).unwrap();
        part.write_chunk(b"payload").unwrap();
        let err = part.finalize(&final_path).unwrap_err();

        assert!(matches!(err, FetchError::Filesystem { op: "rename", .. }));
        assert_eq!(std::fs::read(&tp).unwrap(), b"payload");
        assert!(!final_path.exists());
    }

    #[test]
    fn finalize_refuses_to_replace_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("lib.zip");
        let tp = temp_path(&final_path);
        std::fs::write(&final_path, b"someone else's").unwrap();

        let mut part = PartFile::create(&tp).unwrap();
        part.write_chunk(b"ours").unwrap();
        let err = part.finalize(&final_path).unwrap_err();

        assert!(matches!(err, FetchError::Filesystem { op: "finalize", .. }));
        assert_eq!(std::fs::read(&tp).unwrap(), b"ours");
        assert_eq!(std::fs::read(&final_path).unwrap(), b"someone else's");
    }
}
