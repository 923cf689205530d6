//! Background clip selection.
//!
//! The configured source is either one clip or a directory of candidates.
//! Selection runs on every render, so a directory source varies per job.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::error::{ClipforgeError, Result};

/// Extensions accepted as background candidates (case-insensitive).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

/// A resolved background clip and its probed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundClip {
    pub path: PathBuf,
    pub duration: f64,
}

/// Resolve `source` to one concrete clip path.
///
/// # Errors
/// - `ClipforgeError::NoCandidates` for a directory without video files.
/// - `ClipforgeError::NotFound` for a file path that does not exist.
pub fn select_background<R: Rng + ?Sized>(source: &Path, rng: &mut R) -> Result<PathBuf> {
    if source.is_dir() {
        let candidates = list_candidates(source)?;
        let chosen = candidates
            .choose(rng)
            .cloned()
            .ok_or_else(|| ClipforgeError::NoCandidates {
                dir: source.to_path_buf(),
            })?;
        debug!(
            candidates = candidates.len(),
            chosen = %chosen.display(),
            "background picked from directory"
        );
        return Ok(chosen);
    }

    if !source.is_file() {
        return Err(ClipforgeError::NotFound {
            path: source.to_path_buf(),
        });
    }

    Ok(source.canonicalize()?)
}

/// Video files directly inside `dir`, sorted for stable ordering.
pub fn list_candidates(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_video_extension(&path) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.iter().any(|v| e.eq_ignore_ascii_case(v)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, b"").unwrap();
        p
    }

    #[test]
    fn single_file_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let clip = touch(dir.path(), "background.mp4");
        let mut rng = StdRng::seed_from_u64(1);
        let chosen = select_background(&clip, &mut rng).unwrap();
        assert_eq!(chosen, clip.canonicalize().unwrap());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.mp4");
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            select_background(&missing, &mut rng),
            Err(ClipforgeError::NotFound { path }) if path == missing
        ));
    }

    #[test]
    fn directory_without_videos_has_no_candidates() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "cover.png");
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            select_background(dir.path(), &mut rng),
            Err(ClipforgeError::NoCandidates { .. })
        ));
    }

    #[test]
    fn only_video_extensions_are_candidates() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.mp4");
        touch(dir.path(), "b.MOV");
        touch(dir.path(), "c.mkv");
        touch(dir.path(), "readme.md");
        let names: Vec<String> = list_candidates(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.MOV"]);
    }

    #[test]
    fn every_candidate_is_eventually_selected() {
        let dir = tempfile::tempdir().unwrap();
        let all: HashSet<PathBuf> = ["one.mp4", "two.mp4", "three.mov", "four.mp4"]
            .iter()
            .map(|n| touch(dir.path(), n))
            .collect();

        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let chosen = select_background(dir.path(), &mut rng).unwrap();
            assert!(chosen.exists());
            seen.insert(chosen);
        }
        assert_eq!(seen, all);
    }
}
