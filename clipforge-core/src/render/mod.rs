//! Video rendering: background selection, subtitle overlays, ffmpeg passes.
//!
//! ```text
//! RenderJob ─► select_background ─► probe clip ─► NormalizePlan (trim | loop)
//!                                                     │
//!                                  pass 1: normalize  ▼  {id}_bg.mp4 (scoped)
//!                                  pass 2: compose  + voice + overlays ─► output
//! ```

pub mod artifact;
pub mod background;
pub mod ffmpeg;
pub mod overlay;

pub use artifact::ScopedArtifact;
pub use background::{select_background, BackgroundClip};
pub use ffmpeg::{EncodeSettings, FfmpegRenderer, NormalizePlan, SystemRunner, ToolOutput, ToolRunner};
pub use overlay::{build_overlay_filter, escape_drawtext, OverlayDirective, OverlayScript, OverlayStyle};

use std::path::PathBuf;

use crate::error::Result;
use crate::timing::WordTiming;

/// Everything one render needs. The audio and output files belong to the
/// caller; the renderer only owns its intermediate clip.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub id: String,
    pub audio_path: PathBuf,
    pub timings: Vec<WordTiming>,
    /// Audio duration in seconds; the background is fitted to it.
    pub target_duration: f64,
    pub output_path: PathBuf,
}

/// Contract for renderers.
pub trait VideoRenderer: Send + Sync + 'static {
    /// Write the final video for `job` to `job.output_path`.
    ///
    /// Blocking.
    fn render(&self, job: &RenderJob) -> Result<()>;
}
