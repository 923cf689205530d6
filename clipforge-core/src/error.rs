use std::path::PathBuf;

use thiserror::Error;

/// All errors produced by clipforge-core.
#[derive(Debug, Error)]
pub enum ClipforgeError {
    #[error("cannot estimate word timings: {0}")]
    Estimation(String),

    #[error("invalid script: {0}")]
    InvalidScript(String),

    #[error("no .mp4/.mov files found in background directory: {}", dir.display())]
    NoCandidates { dir: PathBuf },

    #[error("background video not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("could not determine media duration for {}: {detail}", path.display())]
    Probe { path: PathBuf, detail: String },

    #[error("{pass} pass failed (exit {status}): {stderr}")]
    Render {
        pass: &'static str,
        status: String,
        stderr: String,
    },

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClipforgeError {
    pub(crate) fn probe(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClipforgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_keeps_tool_diagnostic() {
        let err = ClipforgeError::Render {
            pass: "compose",
            status: "1".into(),
            stderr: "Invalid argument\nError opening output files".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("compose pass failed (exit 1)"));
        assert!(msg.contains("Error opening output files"));
    }

    #[test]
    fn not_found_names_the_path() {
        let err = ClipforgeError::NotFound {
            path: PathBuf::from("/srv/assets/background.mp4"),
        };
        assert_eq!(
            err.to_string(),
            "background video not found: /srv/assets/background.mp4"
        );
    }
}
