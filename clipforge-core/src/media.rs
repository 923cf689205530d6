//! Media duration probing via the system `ffprobe` binary.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ClipforgeError, Result};

/// Which streams a duration probe looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSelector {
    /// Every stream (voice audio files).
    Any,
    /// First video stream only (background clips).
    FirstVideo,
}

/// Contract for duration probes.
pub trait MediaProbe: Send + Sync + 'static {
    /// Duration in seconds of the first selected stream that reports one.
    ///
    /// Blocking.
    ///
    /// # Errors
    /// `ClipforgeError::Probe` if the probe fails or no stream reports a duration.
    fn duration(&self, path: &Path, streams: StreamSelector) -> Result<f64>;
}

/// `ffprobe -v quiet -print_format json -show_streams`.
#[derive(Debug, Clone, Default)]
pub struct Ffprobe;

impl MediaProbe for Ffprobe {
    fn duration(&self, path: &Path, streams: StreamSelector) -> Result<f64> {
        let mut cmd = Command::new("ffprobe");
        cmd.args(["-v", "quiet", "-print_format", "json", "-show_streams"]);
        if streams == StreamSelector::FirstVideo {
            cmd.args(["-select_streams", "v:0"]);
        }
        cmd.arg(path);

        let out = cmd
            .output()
            .map_err(|e| ClipforgeError::probe(path, format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(ClipforgeError::probe(
                path,
                format!(
                    "ffprobe exited with {}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            ));
        }

        let duration = parse_stream_duration(&out.stdout)
            .map_err(|detail| ClipforgeError::probe(path, detail))?;
        debug!(path = %path.display(), duration_secs = duration, "probed media duration");
        Ok(duration)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    duration: Option<String>,
}

/// First positive stream duration in ffprobe's JSON output.
pub fn parse_stream_duration(json: &[u8]) -> std::result::Result<f64, String> {
    let parsed: ProbeOut =
        serde_json::from_slice(json).map_err(|e| format!("ffprobe json parse failed: {e}"))?;
    parsed
        .streams
        .iter()
        .filter_map(|s| s.duration.as_deref())
        .filter_map(|d| d.trim().parse::<f64>().ok())
        .find(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| "no stream reports a duration".to_string())
}

/// Whether `program -version` runs.
pub fn is_tool_on_path(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
