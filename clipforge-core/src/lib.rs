//! # clipforge-core
//!
//! Turns a short script into a narrated portrait video with word-by-word
//! subtitles.
//!
//! ## Architecture
//!
//! ```text
//! submit(text) → JobStore (pending) → tokio::spawn(pipeline)
//!                                          │
//!                          SpeechSynthesizer (OpenAI → edge-tts)
//!                                          │
//!                                MediaProbe::duration
//!                                          │
//!                    TimestampResolver (transcribe | estimate)
//!                                          │
//!              VideoRenderer (background → normalize → compose)
//!                                          │
//!                   JobStore + broadcast::Sender<JobEvent>
//! ```
//!
//! Every blocking stage runs in `spawn_blocking`; jobs only share read-only
//! assets and write files named by their own id.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod assets;
pub mod cleanup;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod jobs;
pub mod media;
pub mod render;
pub mod timing;
pub mod transcribe;
pub mod tts;

// Convenience re-exports for downstream crates
pub use assets::{provision, ReadinessReport};
pub use cleanup::{run_sweeper, sweep_stale_files};
pub use config::PipelineConfig;
pub use engine::{ClipforgeEngine, PipelineServices};
pub use error::{ClipforgeError, Result};
pub use events::JobEvent;
pub use jobs::{InMemoryJobStore, JobId, JobRecord, JobStatus, JobStore, JobUpdate};
pub use media::{MediaProbe, StreamSelector};
pub use render::{RenderJob, VideoRenderer};
pub use timing::{estimate, TimedWords, TimestampResolver, TimingSource, WordTiming};
pub use transcribe::Transcriber;
pub use tts::SpeechSynthesizer;
