//! Scoped intermediate files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Owns an intermediate file path and deletes the file when dropped, on
/// success, error, panic unwind or task cancellation alike. Deletion failures
/// are logged and swallowed.
#[derive(Debug)]
pub struct ScopedArtifact {
    path: PathBuf,
}

impl ScopedArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "intermediate file removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "could not remove intermediate file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job_bg.mp4");
        {
            let artifact = ScopedArtifact::new(&path);
            std::fs::write(artifact.path(), b"frames").unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn never_created_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        drop(ScopedArtifact::new(dir.path().join("never.mp4")));
    }

    #[test]
    fn removed_on_early_return() {
        fn fails(path: &Path) -> std::io::Result<()> {
            let artifact = ScopedArtifact::new(path);
            std::fs::write(artifact.path(), b"partial")?;
            Err(std::io::Error::other("second pass failed"))
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job_bg.mp4");
        assert!(fails(&path).is_err());
        assert!(!path.exists());
    }
}
