//! Pipeline configuration.
//!
//! Defaults mirror the production deployment; every field can be overridden
//! through a `CLIPFORGE_*` environment variable (see [`PipelineConfig::from_env`]).
//! The OpenAI credential is read from `OPENAI_API_KEY`.

use std::path::PathBuf;
use std::time::Duration;

use crate::render::OverlayStyle;

/// Output frame geometry (portrait 9:16).
pub const OUTPUT_WIDTH: u32 = 1080;
pub const OUTPUT_HEIGHT: u32 = 1920;

/// Configuration shared by every job the pipeline runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Per-job working directory (audio, intermediate clips, final renders).
    pub temp_dir: PathBuf,
    /// Background source: a single clip or a directory of candidate clips.
    pub background_path: PathBuf,
    /// Optional URL the background is downloaded from when missing at startup.
    pub background_url: Option<String>,
    /// Subtitle font. Overlays omit the font when the file does not exist.
    pub font_path: PathBuf,
    /// Subtitle font size in pixels.
    pub font_size: u32,
    /// Longest accepted script, in characters, after trimming.
    pub max_script_chars: usize,
    /// Credential for the precise transcription and primary TTS paths.
    pub openai_api_key: Option<String>,
    /// Primary TTS voice (nova | alloy | echo | fable | onyx | shimmer).
    pub tts_voice: String,
    /// Forces the fallback TTS voice instead of guessing from the script.
    pub edge_voice: Option<String>,
    /// How often the stale-file sweep runs.
    pub sweep_interval: Duration,
    /// Files in `temp_dir` older than this are deleted by the sweep.
    pub max_file_age: Duration,
    /// URL prefix under which finished renders are published.
    pub public_url_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("/tmp/clipforge"),
            background_path: PathBuf::from("./assets/background.mp4"),
            background_url: None,
            font_path: PathBuf::from("./assets/Anton.ttf"),
            font_size: 90,
            max_script_chars: 2_200,
            openai_api_key: None,
            tts_voice: "nova".into(),
            edge_voice: None,
            sweep_interval: Duration::from_secs(30 * 60),
            max_file_age: Duration::from_secs(60 * 60),
            public_url_prefix: "/videos".into(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with whatever the environment provides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_string("CLIPFORGE_TEMP_DIR") {
            config.temp_dir = PathBuf::from(v);
        }
        if let Some(v) = env_string("CLIPFORGE_BACKGROUND_PATH") {
            config.background_path = PathBuf::from(v);
        }
        config.background_url = env_string("CLIPFORGE_BACKGROUND_URL");
        if let Some(v) = env_string("CLIPFORGE_FONT_PATH") {
            config.font_path = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<u32>("CLIPFORGE_FONT_SIZE") {
            config.font_size = v.clamp(8, 400);
        }
        if let Some(v) = env_parse::<usize>("CLIPFORGE_MAX_SCRIPT_CHARS") {
            config.max_script_chars = v.max(1);
        }
        config.openai_api_key = env_string("OPENAI_API_KEY");
        if let Some(v) = env_string("CLIPFORGE_TTS_VOICE") {
            config.tts_voice = v;
        }
        config.edge_voice = env_string("CLIPFORGE_EDGE_VOICE");
        if let Some(v) = env_parse::<u64>("CLIPFORGE_SWEEP_INTERVAL_SECS") {
            config.sweep_interval = Duration::from_secs(v.max(1));
        }
        if let Some(v) = env_parse::<u64>("CLIPFORGE_MAX_FILE_AGE_SECS") {
            config.max_file_age = Duration::from_secs(v);
        }

        config
    }

    pub fn has_openai_credential(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// Subtitle style derived from the font settings.
    pub fn overlay_style(&self) -> OverlayStyle {
        OverlayStyle {
            font_size: self.font_size,
            font_file: Some(self.font_path.clone()),
            ..OverlayStyle::default()
        }
    }

    pub fn audio_path(&self, job_id: &str) -> PathBuf {
        self.temp_dir.join(format!("{job_id}.mp3"))
    }

    pub fn output_file_name(job_id: &str) -> String {
        format!("{job_id}_output.mp4")
    }

    pub fn output_path(&self, job_id: &str) -> PathBuf {
        self.temp_dir.join(Self::output_file_name(job_id))
    }

    pub fn public_url(&self, job_id: &str) -> String {
        format!(
            "{}/{}",
            self.public_url_prefix.trim_end_matches('/'),
            Self::output_file_name(job_id)
        )
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}
