//! Periodic removal of stale files from the working directory.
//!
//! Renders are published straight out of the temp dir, so nothing there is
//! meant to live long. The sweep deletes regular files whose mtime is older
//! than `max_age`; subdirectories are left alone.

use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Delete stale files in `dir`. Returns how many were removed.
///
/// A missing `dir` is not an error. Files that cannot be inspected or removed
/// are logged and skipped.
pub fn sweep_stale_files(dir: &Path, max_age: Duration) -> Result<usize> {
    sweep_stale_files_at(dir, max_age, SystemTime::now())
}

/// [`sweep_stale_files`] against an explicit clock.
pub fn sweep_stale_files_at(dir: &Path, max_age: Duration, now: SystemTime) -> Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut deleted = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "could not read directory entry");
                continue;
            }
        };
        let path = entry.path();
        let modified = match entry.metadata() {
            Ok(meta) if meta.is_file() => meta.modified(),
            Ok(_) => continue,
            Err(e) => Err(e),
        };
        let modified = match modified {
            Ok(t) => t,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "could not stat file");
                continue;
            }
        };

        // Files stamped in the future are treated as fresh.
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                deleted += 1;
                debug!(file = %path.display(), age_secs = age.as_secs(), "stale file removed");
            }
            Err(e) => warn!(file = %path.display(), error = %e, "could not delete stale file"),
        }
    }

    if deleted > 0 {
        info!(dir = %dir.display(), deleted, "stale files swept");
    }
    Ok(deleted)
}

/// Sleep `interval`, sweep, repeat. Returns as soon as `shutdown` becomes
/// `true` or its sender is dropped, even mid-sleep.
pub async fn run_sweeper(
    dir: impl AsRef<Path>,
    interval: Duration,
    max_age: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let dir = dir.as_ref().to_path_buf();
    info!(
        dir = %dir.display(),
        interval_secs = interval.as_secs(),
        max_age_secs = max_age.as_secs(),
        "sweeper started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let sweep_dir = dir.clone();
        match tokio::task::spawn_blocking(move || sweep_stale_files(&sweep_dir, max_age)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "sweep failed"),
            Err(e) => warn!(error = %e, "sweep task did not complete"),
        }
    }

    info!("sweeper stopped");
}
