//! `ClipforgeEngine`: job submission and status.
//!
//! ## Lifecycle of a job
//!
//! ```text
//! submit(text)
//!     └─► validate_script()      → InvalidScript on empty / too long
//!         └─► store.create()     → status = pending, id returned to caller
//!             └─► tokio::spawn(pipeline::run)
//!                     → processing … → done (url) | error (message + detail)
//! ```
//!
//! Jobs share nothing mutable: each one writes only files named by its own id,
//! and the background source is read-only.

pub mod pipeline;

use std::sync::{atomic::AtomicU64, Arc};

use tokio::sync::broadcast;
use tracing::info;

use crate::{
    config::PipelineConfig,
    error::{ClipforgeError, Result},
    events::JobEvent,
    jobs::{JobId, JobRecord, JobStore},
    media::{Ffprobe, MediaProbe},
    render::{FfmpegRenderer, VideoRenderer},
    timing::TimestampResolver,
    tts::{EdgeTtsCommand, FallbackSynthesizer, SpeechSynthesizer},
};

/// Broadcast channel capacity: job events buffered for slow subscribers.
const BROADCAST_CAP: usize = 256;

/// The external collaborators a job drives.
pub struct PipelineServices {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub probe: Arc<dyn MediaProbe>,
    pub resolver: TimestampResolver,
    pub renderer: Arc<dyn VideoRenderer>,
}

impl PipelineServices {
    /// Production backends: OpenAI (when a key is configured) with edge-tts
    /// and estimation fallbacks, ffprobe, and the two-pass ffmpeg renderer.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let probe: Arc<dyn MediaProbe> = Arc::new(Ffprobe);
        let renderer = FfmpegRenderer::new(
            config.background_path.clone(),
            config.temp_dir.clone(),
            config.overlay_style(),
            Arc::clone(&probe),
        );

        Self {
            synthesizer: Arc::new(build_synthesizer(config)),
            probe,
            resolver: build_resolver(config),
            renderer: Arc::new(renderer),
        }
    }
}

#[cfg(feature = "openai")]
fn build_synthesizer(config: &PipelineConfig) -> FallbackSynthesizer {
    use crate::tts::OpenAiSpeech;

    let primary = config.openai_api_key.as_ref().map(|key| {
        Box::new(OpenAiSpeech::new(key.clone(), config.tts_voice.clone()))
            as Box<dyn SpeechSynthesizer>
    });
    FallbackSynthesizer::new(primary, Box::new(EdgeTtsCommand::new(config.edge_voice.clone())))
}

#[cfg(not(feature = "openai"))]
fn build_synthesizer(config: &PipelineConfig) -> FallbackSynthesizer {
    FallbackSynthesizer::new(None, Box::new(EdgeTtsCommand::new(config.edge_voice.clone())))
}

#[cfg(feature = "openai")]
fn build_resolver(config: &PipelineConfig) -> TimestampResolver {
    use crate::transcribe::{OpenAiTranscriber, Transcriber};

    TimestampResolver::new(
        OpenAiTranscriber::from_key(config.openai_api_key.as_deref())
            .map(|t| Arc::new(t) as Arc<dyn Transcriber>),
    )
}

#[cfg(not(feature = "openai"))]
fn build_resolver(_config: &PipelineConfig) -> TimestampResolver {
    TimestampResolver::estimate_only()
}

/// The top-level engine handle. Cheap to share behind an `Arc`.
pub struct ClipforgeEngine {
    config: Arc<PipelineConfig>,
    store: Arc<dyn JobStore>,
    services: Arc<PipelineServices>,
    event_tx: broadcast::Sender<JobEvent>,
    seq: Arc<AtomicU64>,
    diagnostics: Arc<pipeline::PipelineDiagnostics>,
}

impl ClipforgeEngine {
    pub fn new(config: PipelineConfig, store: Arc<dyn JobStore>, services: PipelineServices) -> Self {
        let (event_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            config: Arc::new(config),
            store,
            services: Arc::new(services),
            event_tx,
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics: Arc::new(pipeline::PipelineDiagnostics::default()),
        }
    }

    /// Engine wired to the production backends.
    pub fn from_config(config: PipelineConfig, store: Arc<dyn JobStore>) -> Self {
        let services = PipelineServices::from_config(&config);
        info!(
            precise_timing = services.resolver.has_transcriber(),
            primary_tts = config.has_openai_credential(),
            "engine backends configured"
        );
        Self::new(config, store, services)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Trim the script and enforce the length limits.
    ///
    /// # Errors
    /// `ClipforgeError::InvalidScript` for empty or over-long scripts.
    pub fn validate_script(&self, text: &str) -> Result<String> {
        validate_script(text, self.config.max_script_chars)
    }

    /// Validate, register and start a job. Returns immediately with its id.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, text: &str) -> Result<JobId> {
        let text = self.validate_script(text)?;
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            ClipforgeError::Other(anyhow::anyhow!("job submitted outside a Tokio runtime: {e}"))
        })?;

        let id = self.store.create();
        info!(job_id = %id, chars = text.chars().count(), "job submitted");

        handle.spawn(pipeline::run(pipeline::JobContext {
            id: id.clone(),
            text,
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            services: Arc::clone(&self.services),
            event_tx: self.event_tx.clone(),
            seq: Arc::clone(&self.seq),
            diagnostics: Arc::clone(&self.diagnostics),
        }));

        Ok(id)
    }

    /// Current snapshot of a job.
    pub fn job(&self, id: &str) -> Option<JobRecord> {
        self.store.get(id)
    }

    /// Subscribe to job progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Snapshot of pipeline counters for observability.
    pub fn diagnostics_snapshot(&self) -> pipeline::DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }
}

/// Trim `text`; reject it when empty or longer than `max_chars` characters.
pub fn validate_script(text: &str, max_chars: usize) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ClipforgeError::InvalidScript("Script cannot be empty".into()));
    }
    let chars = trimmed.chars().count();
    if chars > max_chars {
        return Err(ClipforgeError::InvalidScript(format!(
            "Script is {chars} characters, which exceeds the {max_chars} character limit"
        )));
    }
    Ok(trimmed.to_string())
}
