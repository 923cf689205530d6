//! Two-pass ffmpeg render.
//!
//! 1. **Normalize** the background to exactly the audio duration: trim from a
//!    random offset when the clip is long enough, loop it otherwise. Scale and
//!    crop to 1080×1920 and drop the clip's own audio.
//! 2. **Compose** the normalized clip, the voice track and the subtitle
//!    overlays into the final MP4. `-shortest` clamps the output to whichever
//!    of video/audio ends first.
//!
//! The intermediate clip lives in a [`ScopedArtifact`] and is removed on every
//! exit path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, info_span};

use crate::config::{OUTPUT_HEIGHT, OUTPUT_WIDTH};
use crate::error::{ClipforgeError, Result};
use crate::media::{MediaProbe, StreamSelector};
use crate::render::{
    artifact::ScopedArtifact, background::select_background, overlay::OverlayScript,
    BackgroundClip, OverlayStyle, RenderJob, VideoRenderer,
};

pub const NORMALIZE_PASS: &str = "normalize";
pub const COMPOSE_PASS: &str = "compose";

/// How the background is fitted to the target duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizePlan {
    /// Seek to `start` and take `target` seconds from there.
    Trim { start: f64 },
    /// Clip is too short: loop it and cut at `target`.
    Loop,
}

impl NormalizePlan {
    /// Trim from a uniform offset in `[0, clip - target]` when the clip covers
    /// the target, loop otherwise.
    pub fn choose<R: Rng + ?Sized>(clip_duration: f64, target_duration: f64, rng: &mut R) -> Self {
        if clip_duration >= target_duration {
            let max_start = clip_duration - target_duration;
            let start = if max_start > 0.0 {
                rng.gen_range(0.0..=max_start)
            } else {
                0.0
            };
            NormalizePlan::Trim { start }
        } else {
            NormalizePlan::Loop
        }
    }
}

/// Fixed encoder settings for both passes.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".into(),
            preset: "fast".into(),
            crf: 23,
            audio_codec: "aac".into(),
            audio_bitrate: "192k".into(),
        }
    }
}

/// Exit summary of an external tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub status: String,
    pub stderr: String,
}

/// Runs external tools. Swapped out in tests.
pub trait ToolRunner: Send + Sync + 'static {
    fn run(&self, program: &str, args: &[OsString]) -> std::io::Result<ToolOutput>;
}

/// Runs tools from `PATH` and captures their stderr.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, program: &str, args: &[OsString]) -> std::io::Result<ToolOutput> {
        let out = Command::new(program).args(args).output()?;
        Ok(ToolOutput {
            success: out.status.success(),
            status: out
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| out.status.to_string()),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        })
    }
}

pub struct FfmpegRenderer {
    background_source: PathBuf,
    work_dir: PathBuf,
    style: OverlayStyle,
    encode: EncodeSettings,
    probe: Arc<dyn MediaProbe>,
    runner: Arc<dyn ToolRunner>,
}

impl FfmpegRenderer {
    pub fn new(
        background_source: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
        style: OverlayStyle,
        probe: Arc<dyn MediaProbe>,
    ) -> Self {
        Self {
            background_source: background_source.into(),
            work_dir: work_dir.into(),
            style,
            encode: EncodeSettings::default(),
            probe,
            runner: Arc::new(SystemRunner),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_encode_settings(mut self, encode: EncodeSettings) -> Self {
        self.encode = encode;
        self
    }

    fn intermediate_path(&self, job_id: &str) -> PathBuf {
        self.work_dir.join(format!("{job_id}_bg.mp4"))
    }

    /// Render with an explicit random source (start offset, candidate choice).
    pub fn render_with_rng<R: Rng + ?Sized>(&self, job: &RenderJob, rng: &mut R) -> Result<()> {
        let _span = info_span!("render", job_id = %job.id).entered();

        let path = select_background(&self.background_source, rng)?;
        let duration = self.probe.duration(&path, StreamSelector::FirstVideo)?;
        let clip = BackgroundClip { path, duration };

        let plan = NormalizePlan::choose(clip.duration, job.target_duration, rng);
        info!(
            background = %clip.path.display(),
            clip_secs = clip.duration,
            target_secs = job.target_duration,
            ?plan,
            "background resolved"
        );

        let intermediate = ScopedArtifact::new(self.intermediate_path(&job.id));

        let args = normalize_args(
            &clip.path,
            plan,
            job.target_duration,
            &self.encode,
            intermediate.path(),
        );
        self.run_pass(NORMALIZE_PASS, &args)?;

        let filter = OverlayScript::build(&job.timings, self.style.clone()).to_filter();
        debug!(
            words = job.timings.len(),
            filter_len = filter.len(),
            "overlay filter built"
        );
        let args = compose_args(
            intermediate.path(),
            &job.audio_path,
            &filter,
            &self.encode,
            &job.output_path,
        );
        self.run_pass(COMPOSE_PASS, &args)?;

        info!(output = %job.output_path.display(), "render complete");
        Ok(())
    }

    fn run_pass(&self, pass: &'static str, args: &[OsString]) -> Result<()> {
        debug!(pass, "running ffmpeg");
        let out = self
            .runner
            .run("ffmpeg", args)
            .map_err(|e| ClipforgeError::Render {
                pass,
                status: "spawn".into(),
                stderr: format!("failed to run ffmpeg (is it installed and on PATH?): {e}"),
            })?;
        if !out.success {
            return Err(ClipforgeError::Render {
                pass,
                status: out.status,
                stderr: out.stderr,
            });
        }
        Ok(())
    }
}

impl VideoRenderer for FfmpegRenderer {
    fn render(&self, job: &RenderJob) -> Result<()> {
        self.render_with_rng(job, &mut rand::thread_rng())
    }
}

fn portrait_filter() -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
        w = OUTPUT_WIDTH,
        h = OUTPUT_HEIGHT
    )
}

/// Pass 1 arguments: fit, scale and crop the background, video only.
pub fn normalize_args(
    clip: &Path,
    plan: NormalizePlan,
    target_duration: f64,
    encode: &EncodeSettings,
    out: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-loglevel".into(), "error".into()];
    match plan {
        NormalizePlan::Trim { start } => {
            args.push("-ss".into());
            args.push(start.to_string().into());
        }
        NormalizePlan::Loop => {
            args.push("-stream_loop".into());
            args.push("-1".into());
        }
    }
    args.push("-i".into());
    args.push(clip.into());
    args.push("-t".into());
    args.push(target_duration.to_string().into());
    args.push("-vf".into());
    args.push(portrait_filter().into());
    args.push("-c:v".into());
    args.push(encode.video_codec.clone().into());
    args.push("-preset".into());
    args.push(encode.preset.clone().into());
    args.push("-an".into());
    args.push(out.into());
    args
}

/// Pass 2 arguments: background + voice + overlays → final MP4.
/// An empty `overlay_filter` omits `-vf`.
pub fn compose_args(
    background: &Path,
    audio: &Path,
    overlay_filter: &str,
    encode: &EncodeSettings,
    out: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        background.into(),
        "-i".into(),
        audio.into(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
    ];
    if !overlay_filter.is_empty() {
        args.push("-vf".into());
        args.push(overlay_filter.into());
    }
    let crf = encode.crf.to_string();
    for arg in [
        "-c:v",
        encode.video_codec.as_str(),
        "-preset",
        encode.preset.as_str(),
        "-crf",
        crf.as_str(),
        "-c:a",
        encode.audio_codec.as_str(),
        "-b:a",
        encode.audio_bitrate.as_str(),
        "-movflags",
        "+faststart",
        "-shortest",
    ] {
        args.push(arg.into());
    }
    args.push(out.into());
    args
}
