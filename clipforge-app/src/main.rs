//! Clipforge command-line host.
//!
//! ## Runtime note
//!
//! Settings are exported to the environment before the Tokio runtime is
//! built, so no worker thread can observe a half-written environment.

mod settings;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use clipforge_core::{
    cleanup, provision, ClipforgeEngine, InMemoryJobStore, JobEvent, JobId, JobRecord,
    JobStatus, PipelineConfig, ReadinessReport,
};
use settings::{
    apply_runtime_env_from_settings, default_settings_path, load_settings, save_settings,
    AppSettings,
};
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "clipforge", version, about = "Turn short scripts into narrated, subtitled portrait videos")]
struct Cli {
    /// Settings file (defaults to the user data directory).
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render one video per script, concurrently.
    Render(RenderArgs),
    /// Delete stale files from the working directory once.
    Sweep,
    /// Provision assets and report whether renders can run.
    Check,
    /// Print the effective settings.
    Settings {
        /// Write the normalized settings back to the settings file.
        #[arg(long)]
        save: bool,
    },
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Script text. Repeat for several videos.
    #[arg(long = "text", value_name = "TEXT")]
    texts: Vec<String>,

    /// File containing a script. Repeat for several videos.
    #[arg(long = "script", value_name = "FILE")]
    scripts: Vec<PathBuf>,

    /// Print each final job record as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("clipforge=info,clipforge_core=info")
                }),
        )
        .init();

    let cli = Cli::parse();

    // ── Settings → environment → pipeline config ──────────────────────────
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let app_settings = load_settings(&settings_path);
    apply_runtime_env_from_settings(&app_settings);
    let config = PipelineConfig::from_env();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(async move {
        match cli.command {
            Command::Render(args) => render(config, args).await,
            Command::Sweep => sweep(config).await,
            Command::Check => check(config).await,
            Command::Settings { save } => show_settings(&settings_path, &app_settings, save),
        }
    });
    // Do not wait on blocking stages of jobs abandoned by Ctrl-C.
    runtime.shutdown_timeout(Duration::from_secs(2));

    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "clipforge failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// One script to render and how to refer to it in output.
struct Submission {
    label: String,
    text: String,
}

fn collect_scripts(args: &RenderArgs) -> Result<Vec<Submission>> {
    let mut out: Vec<Submission> = args
        .texts
        .iter()
        .enumerate()
        .map(|(i, text)| Submission {
            label: format!("text #{}", i + 1),
            text: text.clone(),
        })
        .collect();
    for path in &args.scripts {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        out.push(Submission {
            label: path.display().to_string(),
            text,
        });
    }
    if out.is_empty() {
        bail!("nothing to render: pass --text or --script");
    }
    Ok(out)
}

async fn provision_blocking(config: &PipelineConfig) -> Result<ReadinessReport> {
    let config = config.clone();
    let report = tokio::task::spawn_blocking(move || provision(&config))
        .await
        .context("provisioning task did not complete")??;
    Ok(report)
}

async fn render(config: PipelineConfig, args: RenderArgs) -> Result<ExitCode> {
    let submissions = collect_scripts(&args)?;

    let report = provision_blocking(&config).await?;
    if !report.can_render() {
        warn!(?report, "environment is not ready; jobs are expected to fail");
    }

    // ── Background sweeper ────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(cleanup::run_sweeper(
        config.temp_dir.clone(),
        config.sweep_interval,
        config.max_file_age,
        shutdown_rx,
    ));

    let engine = ClipforgeEngine::from_config(config, Arc::new(InMemoryJobStore::new()));
    // Subscribe before submitting so no transition is missed.
    let mut events = engine.subscribe();

    let mut labels: HashMap<JobId, String> = HashMap::new();
    let mut failures = 0usize;
    for submission in submissions {
        match engine.submit(&submission.text) {
            Ok(id) => {
                info!(job_id = %id, script = %submission.label, "queued");
                labels.insert(id, submission.label);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}: rejected: {e}", submission.label);
            }
        }
    }

    let finished = wait_for_jobs(&engine, &mut events, labels.keys().cloned().collect()).await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        warn!(error = %e, "sweeper task ended abnormally");
    }

    let Some(finished) = finished else {
        eprintln!("interrupted before all jobs finished");
        return Ok(ExitCode::from(130));
    };

    for (id, record) in &finished {
        let label = labels.get(id).map(String::as_str).unwrap_or(id.as_str());
        if args.json {
            println!("{}", serde_json::to_string(record)?);
        }
        match record.status {
            JobStatus::Done => {
                let path = engine.config().output_path(id);
                println!("{label}: {}", path.display());
            }
            _ => {
                failures += 1;
                eprintln!(
                    "{label}: {}: {}",
                    record.message,
                    record.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    let diag = engine.diagnostics_snapshot();
    info!(
        done = diag.jobs_done,
        failed = diag.jobs_failed,
        precise = diag.precise_timings,
        estimated = diag.estimated_timings,
        "render session finished"
    );

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Follow job events until every job in `pending` is terminal. Returns the
/// final records in completion order, or `None` on Ctrl-C.
async fn wait_for_jobs(
    engine: &ClipforgeEngine,
    events: &mut broadcast::Receiver<JobEvent>,
    mut pending: HashSet<JobId>,
) -> Option<Vec<(JobId, JobRecord)>> {
    let mut finished = Vec::with_capacity(pending.len());
    let mut last_message: HashMap<JobId, String> = HashMap::new();

    while !pending.is_empty() {
        tokio::select! {
            recv = events.recv() => match recv {
                Ok(event) => {
                    if !pending.contains(&event.job_id) {
                        continue;
                    }
                    let record = event.record;
                    if last_message.get(&event.job_id) != Some(&record.message) {
                        info!(
                            job_id = %event.job_id,
                            progress = record.progress,
                            status = ?record.status,
                            "{}",
                            record.message
                        );
                        last_message.insert(event.job_id.clone(), record.message.clone());
                    }
                    if record.status.is_terminal() {
                        pending.remove(&event.job_id);
                        finished.push((event.job_id, record));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "progress events dropped; reading job store");
                    let ids: Vec<JobId> = pending.iter().cloned().collect();
                    for id in ids {
                        if let Some(record) = engine.job(&id).filter(|r| r.status.is_terminal()) {
                            pending.remove(&id);
                            finished.push((id, record));
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    // The engine outlives this loop, so this is unreachable in
                    // practice; settle from the store.
                    for id in pending.drain() {
                        if let Some(record) = engine.job(&id) {
                            finished.push((id, record));
                        }
                    }
                }
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("Ctrl-C received, stopping");
                return None;
            }
        }
    }

    Some(finished)
}

async fn sweep(config: PipelineConfig) -> Result<ExitCode> {
    let dir = config.temp_dir.clone();
    let max_age = config.max_file_age;
    let deleted = tokio::task::spawn_blocking(move || cleanup::sweep_stale_files(&dir, max_age))
        .await
        .context("sweep task did not complete")??;
    println!(
        "deleted {deleted} stale file(s) from {}",
        config.temp_dir.display()
    );
    Ok(ExitCode::SUCCESS)
}

async fn check(config: PipelineConfig) -> Result<ExitCode> {
    let report = provision_blocking(&config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.can_render() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn show_settings(path: &std::path::Path, settings: &AppSettings, save: bool) -> Result<ExitCode> {
    if save {
        save_settings(path, settings)
            .with_context(|| format!("writing settings to {}", path.display()))?;
        info!(path = %path.display(), "settings saved");
    }
    println!("{}", serde_json::to_string_pretty(&settings.runtime_settings())?);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_repeated_scripts() {
        let cli = Cli::try_parse_from([
            "clipforge",
            "render",
            "--text",
            "first",
            "--text",
            "second",
            "--script",
            "a.txt",
        ])
        .unwrap();
        match cli.command {
            Command::Render(args) => {
                assert_eq!(args.texts, ["first", "second"]);
                assert_eq!(args.scripts, [PathBuf::from("a.txt")]);
                assert!(!args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn settings_flag_is_global() {
        let cli = Cli::try_parse_from(["clipforge", "sweep", "--settings", "/etc/cf.json"]).unwrap();
        assert_eq!(cli.settings, Some(PathBuf::from("/etc/cf.json")));
        assert!(matches!(cli.command, Command::Sweep));
    }

    #[test]
    fn scripts_are_read_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.txt");
        std::fs::write(&path, "Hello from a file").unwrap();
        let args = RenderArgs {
            texts: vec!["inline".into()],
            scripts: vec![path.clone()],
            json: false,
        };

        let subs = collect_scripts(&args).unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].label, "text #1");
        assert_eq!(subs[1].text, "Hello from a file");
        assert_eq!(subs[1].label, path.display().to_string());
    }

    #[test]
    fn render_without_scripts_is_an_error() {
        let args = RenderArgs {
            texts: vec![],
            scripts: vec![],
            json: false,
        };
        assert!(collect_scripts(&args).is_err());
    }

    #[test]
    fn missing_script_file_is_an_error() {
        let args = RenderArgs {
            texts: vec![],
            scripts: vec![PathBuf::from("/no/such/script.txt")],
            json: false,
        };
        let err = collect_scripts(&args).err().unwrap();
        assert!(format!("{err:#}").contains("/no/such/script.txt"));
    }
}
