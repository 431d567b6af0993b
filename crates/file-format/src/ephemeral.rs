//! Request-scoped temporary files.
//!
//! Each request owns an [`EphemeralScope`]. Files are registered with the
//! scope the moment they are created, so every exit path (success, error or
//! panic unwinding) removes them when the scope drops.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::errors::CodecError;

const FILE_PREFIX: &str = "step-forge-";
const FILE_SUFFIX: &str = ".step";

/// Which side of a request an ephemeral file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Input,
    Output,
}

impl FileRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::Input => "input",
            FileRole::Output => "output",
        }
    }
}

/// A uniquely named `.step` file that is deleted when dropped.
#[derive(Debug)]
pub struct EphemeralFile {
    file: NamedTempFile,
    role: FileRole,
}

impl EphemeralFile {
    /// Create an empty file in `dir`.
    pub fn create_in(dir: &Path, role: FileRole) -> Result<Self, CodecError> {
        let file = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(FILE_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| CodecError::io("create ephemeral file in", dir, e))?;
        tracing::debug!(path = %file.path().display(), role = role.as_str(), "ephemeral file created");
        Ok(Self { file, role })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let path = self.path().to_path_buf();
        let handle = self.file.as_file_mut();
        handle
            .write_all(bytes)
            .and_then(|_| handle.flush())
            .map_err(|e| CodecError::io("write", path, e))
    }

    fn read_all(&self) -> Result<Vec<u8>, CodecError> {
        fs::read(self.path()).map_err(|e| CodecError::io("read", self.path(), e))
    }
}

impl Drop for EphemeralFile {
    fn drop(&mut self) {
        // The NamedTempFile field removes the file right after this runs.
        tracing::debug!(path = %self.file.path().display(), role = self.role.as_str(), "ephemeral file released");
    }
}

/// Owns the input and output files of a single request.
#[derive(Debug)]
pub struct EphemeralScope {
    dir: PathBuf,
    input: Option<EphemeralFile>,
    output: Option<EphemeralFile>,
}

impl EphemeralScope {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            input: None,
            output: None,
        }
    }

    /// Write uploaded bytes to a fresh input file and return its path.
    ///
    /// The file is owned by the scope before any byte is written, so a failed
    /// write still leaves nothing behind.
    pub fn stage_input(&mut self, bytes: &[u8]) -> Result<&Path, CodecError> {
        self.input = None;
        let slot = self
            .input
            .insert(EphemeralFile::create_in(&self.dir, FileRole::Input)?);
        slot.write_all(bytes)?;
        Ok(slot.path())
    }

    /// Reserve an empty output file and return its path.
    pub fn allocate_output(&mut self) -> Result<&Path, CodecError> {
        self.output = None;
        let slot = self
            .output
            .insert(EphemeralFile::create_in(&self.dir, FileRole::Output)?);
        Ok(slot.path())
    }

    /// Delete the input file now rather than at scope end.
    pub fn release_input(&mut self) {
        self.input = None;
    }

    /// Read the whole output file into memory, then delete it.
    pub fn take_output(&mut self) -> Result<Vec<u8>, CodecError> {
        let file = self
            .output
            .take()
            .ok_or(CodecError::NotStaged { role: "output" })?;
        file.read_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_file_has_step_suffix_and_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let file = EphemeralFile::create_in(dir.path(), FileRole::Input).unwrap();
            let path = file.path().to_path_buf();
            assert!(path.exists());
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("step"));
            path
        };
        assert!(!path.exists(), "file should be deleted on drop");
    }

    #[test]
    fn test_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = EphemeralFile::create_in(dir.path(), FileRole::Input).unwrap();
        let b = EphemeralFile::create_in(dir.path(), FileRole::Input).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_stage_input_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut scope = EphemeralScope::new(dir.path());
        let path = scope.stage_input(b"ISO-10303-21;").unwrap().to_path_buf();
        assert_eq!(fs::read(&path).unwrap(), b"ISO-10303-21;");
        scope.release_input();
        assert!(!path.exists());
    }

    #[test]
    fn test_take_output_reads_then_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let mut scope = EphemeralScope::new(dir.path());
        let path = scope.allocate_output().unwrap().to_path_buf();
        fs::write(&path, b"payload").unwrap();

        let bytes = scope.take_output().unwrap();
        assert_eq!(bytes, b"payload");
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_take_output_without_allocation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut scope = EphemeralScope::new(dir.path());
        assert!(matches!(
            scope.take_output(),
            Err(CodecError::NotStaged { role: "output" })
        ));
    }

    #[test]
    fn test_scope_drop_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut scope = EphemeralScope::new(dir.path());
            scope.stage_input(b"in").unwrap();
            scope.allocate_output().unwrap();
            assert_eq!(entries(dir.path()), 2);
        }
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_missing_dir_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = EphemeralFile::create_in(&missing, FileRole::Output).unwrap_err();
        assert!(matches!(err, CodecError::Io { .. }));
    }
}
