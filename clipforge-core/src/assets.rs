//! Startup provisioning: working directory, background download, tool checks.
//!
//! Missing optional assets only produce warnings. The report tells the host
//! what will degrade (no font, no ffmpeg) before the first job runs.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::media::is_tool_on_path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub temp_dir: PathBuf,
    pub background_path: PathBuf,
    pub background_present: bool,
    /// Set when the background was fetched during this startup.
    pub background_downloaded: bool,
    pub font_present: bool,
    pub ffmpeg_available: bool,
    pub ffprobe_available: bool,
    pub precise_timing: bool,
}

impl ReadinessReport {
    /// Whether a job can reach the render stage at all.
    pub fn can_render(&self) -> bool {
        self.background_present && self.ffmpeg_available && self.ffprobe_available
    }
}

/// Prepare the environment for `config`. Blocking; call it from
/// `spawn_blocking` inside a runtime.
///
/// # Errors
/// Creating the temp dir or downloading the background failed.
pub fn provision(config: &PipelineConfig) -> Result<ReadinessReport> {
    std::fs::create_dir_all(&config.temp_dir)?;

    let mut background_downloaded = false;
    if let Some(url) = config.background_url.as_deref() {
        if !config.background_path.exists() {
            info!(url, dest = %config.background_path.display(), "downloading background video");
            download(url, &config.background_path)?;
            background_downloaded = true;
            info!(dest = %config.background_path.display(), "background video saved");
        }
    }

    let font_present = config.font_path.is_file();
    if !font_present {
        warn!(
            font = %config.font_path.display(),
            "subtitle font not found; overlays will use ffmpeg's default font"
        );
    }

    let ffmpeg_available = is_tool_on_path("ffmpeg");
    let ffprobe_available = is_tool_on_path("ffprobe");
    for (tool, ok) in [("ffmpeg", ffmpeg_available), ("ffprobe", ffprobe_available)] {
        if !ok {
            warn!(tool, "not found on PATH; renders will fail");
        }
    }

    let background_present = config.background_path.exists();
    if !background_present {
        warn!(background = %config.background_path.display(), "background source missing");
    }

    Ok(ReadinessReport {
        temp_dir: config.temp_dir.clone(),
        background_path: config.background_path.clone(),
        background_present,
        background_downloaded,
        font_present,
        ffmpeg_available,
        ffprobe_available,
        precise_timing: cfg!(feature = "openai") && config.has_openai_credential(),
    })
}

/// Fetch `url` into `dest`, creating parent directories. The body lands in a
/// sibling `.part` file first so an interrupted download leaves no half file.
#[cfg(feature = "openai")]
fn download(url: &str, dest: &Path) -> Result<()> {
    use anyhow::Context;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(600))
        .build()
        .context("building HTTP client")?;
    let mut response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("downloading {url}"))?;

    let part = partial_path(dest);
    match write_body(&mut response, &part) {
        Ok(bytes) => {
            std::fs::rename(&part, dest)?;
            info!(bytes, "download complete");
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&part);
            Err(e)
        }
    }
}

#[cfg(feature = "openai")]
fn write_body(response: &mut reqwest::blocking::Response, part: &Path) -> Result<u64> {
    use anyhow::Context;

    let mut file = std::fs::File::create(part)?;
    let bytes = response
        .copy_to(&mut file)
        .with_context(|| format!("reading body of {}", response.url()))?;
    Ok(bytes)
}

#[cfg(not(feature = "openai"))]
fn download(url: &str, _dest: &Path) -> Result<()> {
    Err(crate::error::ClipforgeError::Other(anyhow::anyhow!(
        "cannot download {url}: built without HTTP support"
    )))
}

#[cfg_attr(not(feature = "openai"), allow(dead_code))]
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
