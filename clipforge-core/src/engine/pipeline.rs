//! Per-job async flow.
//!
//! ## Stages (strictly sequential)
//!
//! ```text
//! 1. TTS            text ─► {id}.mp3                    progress 10 → 30
//! 2. Probe          {id}.mp3 ─► duration                 progress 35 → 40
//! 3. Timestamps     transcribe | estimate ─► timings     progress 45 → 52
//! 4. Render         two ffmpeg passes ─► {id}_output.mp4 progress 55 → 90
//! 5. Finalize       drop {id}.mp3                        progress 95 → 100
//! ```
//!
//! Each stage's blocking work runs in `spawn_blocking`, keeping the Tokio
//! executor free for other jobs. Any stage error ends the job in the `error`
//! state; nothing escapes the task.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::broadcast;
use tracing::{error, info, info_span, Instrument};

use crate::{
    config::PipelineConfig,
    engine::PipelineServices,
    error::{ClipforgeError, Result},
    events::JobEvent,
    jobs::{JobId, JobStatus, JobStore, JobUpdate},
    media::StreamSelector,
    render::{RenderJob, ScopedArtifact},
    timing::TimingSource,
};

#[derive(Default)]
pub struct PipelineDiagnostics {
    pub jobs_started: AtomicUsize,
    pub jobs_done: AtomicUsize,
    pub jobs_failed: AtomicUsize,
    pub precise_timings: AtomicUsize,
    pub estimated_timings: AtomicUsize,
}

impl PipelineDiagnostics {
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            jobs_started: self.jobs_started.load(Ordering::Relaxed),
            jobs_done: self.jobs_done.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            precise_timings: self.precise_timings.load(Ordering::Relaxed),
            estimated_timings: self.estimated_timings.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub jobs_started: usize,
    pub jobs_done: usize,
    pub jobs_failed: usize,
    pub precise_timings: usize,
    pub estimated_timings: usize,
}

/// Everything one job task needs, moved into the task as one value.
pub struct JobContext {
    pub id: JobId,
    pub text: String,
    pub config: Arc<PipelineConfig>,
    pub store: Arc<dyn JobStore>,
    pub services: Arc<PipelineServices>,
    pub event_tx: broadcast::Sender<JobEvent>,
    pub seq: Arc<AtomicU64>,
    pub diagnostics: Arc<PipelineDiagnostics>,
}

impl JobContext {
    fn report(&self, update: JobUpdate) {
        self.store.update(&self.id, update);
        if let Some(record) = self.store.get(&self.id) {
            // No subscribers is fine.
            let _ = self.event_tx.send(JobEvent {
                seq: self.seq.fetch_add(1, Ordering::Relaxed),
                job_id: self.id.clone(),
                record,
            });
        }
    }
}

/// Run one job to completion. Never panics the caller; the outcome is
/// recorded in the store.
pub async fn run(ctx: JobContext) {
    let span = info_span!("job", job_id = %ctx.id);
    async move {
        ctx.diagnostics.jobs_started.fetch_add(1, Ordering::Relaxed);
        match execute(&ctx).await {
            Ok(url) => {
                ctx.diagnostics.jobs_done.fetch_add(1, Ordering::Relaxed);
                info!(url = %url, "job done");
                ctx.report(JobUpdate::done(url));
            }
            Err(e) => {
                ctx.diagnostics.jobs_failed.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "job failed");
                ctx.report(JobUpdate::failed(e.to_string()));
            }
        }
    }
    .instrument(span)
    .await
}

async fn execute(ctx: &JobContext) -> Result<String> {
    ctx.report(JobUpdate::stage(5, "Starting...").with_status(JobStatus::Processing));

    // Removed on every exit path; the finished video does not need it.
    let audio = ScopedArtifact::new(ctx.config.audio_path(&ctx.id));
    let audio_path: PathBuf = audio.path().to_path_buf();

    // ── 1. TTS ───────────────────────────────────────────────────────────
    ctx.report(JobUpdate::stage(10, "Generating voiceover..."));
    {
        let services = Arc::clone(&ctx.services);
        let text = ctx.text.clone();
        let out = audio_path.clone();
        blocking(move || services.synthesizer.synthesize(&text, &out)).await?;
    }
    ctx.report(JobUpdate::progress(30));

    // ── 2. Audio duration ────────────────────────────────────────────────
    ctx.report(JobUpdate::stage(35, "Analyzing audio..."));
    let duration = {
        let services = Arc::clone(&ctx.services);
        let path = audio_path.clone();
        blocking(move || services.probe.duration(&path, StreamSelector::Any)).await?
    };
    info!(duration_secs = duration, "voiceover measured");
    ctx.report(JobUpdate::progress(40));

    // ── 3. Word timestamps ───────────────────────────────────────────────
    ctx.report(JobUpdate::stage(45, "Syncing subtitles..."));
    let timed = {
        let services = Arc::clone(&ctx.services);
        let text = ctx.text.clone();
        let path = audio_path.clone();
        blocking(move || services.resolver.resolve(&text, &path, duration)).await?
    };
    let counter = match timed.source {
        TimingSource::Precise => &ctx.diagnostics.precise_timings,
        TimingSource::Estimated => &ctx.diagnostics.estimated_timings,
    };
    counter.fetch_add(1, Ordering::Relaxed);
    info!(source = %timed.source, words = timed.len(), "word timings resolved");
    ctx.report(JobUpdate::progress(52));

    // ── 4. Render ────────────────────────────────────────────────────────
    ctx.report(JobUpdate::stage(55, "Rendering video..."));
    let job = RenderJob {
        id: ctx.id.clone(),
        audio_path: audio_path.clone(),
        timings: timed.words,
        target_duration: duration,
        output_path: ctx.config.output_path(&ctx.id),
    };
    {
        let services = Arc::clone(&ctx.services);
        blocking(move || services.renderer.render(&job)).await?;
    }
    ctx.report(JobUpdate::progress(90));

    // ── 5. Finalize ──────────────────────────────────────────────────────
    ctx.report(JobUpdate::stage(95, "Finalizing..."));
    drop(audio);

    Ok(ctx.config.public_url(&ctx.id))
}

/// Run blocking work on Tokio's blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        ClipforgeError::Other(anyhow::anyhow!("blocking stage did not complete: {e}"))
    })?
}
