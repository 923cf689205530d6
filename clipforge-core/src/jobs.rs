//! Job bookkeeping.
//!
//! The pipeline reports status only through the narrow [`JobStore`] trait.
//! `InMemoryJobStore` is the default: state is lost on restart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub type JobId = String;

/// Lifecycle of a job. Moves forward only: pending → processing → done | error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

/// Snapshot of one job as reported to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub status: JobStatus,
    /// 0..=100.
    pub progress: u8,
    /// Short human-readable stage description.
    pub message: String,
    /// Where the finished video is published.
    pub url: Option<String>,
    /// Raw error detail when `status` is `Error`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            progress: 0,
            message: "Waiting to start...".into(),
            url: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    fn apply(&mut self, update: JobUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = progress.min(100);
        }
        if let Some(message) = update.message {
            self.message = message;
        }
        if let Some(url) = update.url {
            self.url = Some(url);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub url: Option<String>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn stage(progress: u8, message: impl Into<String>) -> Self {
        Self {
            progress: Some(progress),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn done(url: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Done),
            progress: Some(100),
            message: Some("Done!".into()),
            url: Some(url.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            progress: Some(0),
            message: Some("An error occurred".into()),
            url: None,
            error: Some(error.into()),
        }
    }
}

/// Key-value job status sink.
pub trait JobStore: Send + Sync + 'static {
    /// Register a new pending job and return its id.
    fn create(&self) -> JobId;
    /// Apply `update` to job `id`. Unknown ids are ignored.
    fn update(&self, id: &str, update: JobUpdate);
    fn get(&self, id: &str) -> Option<JobRecord>;
}

#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self) -> JobId {
        let id = new_job_id();
        self.jobs.write().insert(id.clone(), JobRecord::pending());
        id
    }

    fn update(&self, id: &str, update: JobUpdate) {
        if let Some(record) = self.jobs.write().get_mut(id) {
            record.apply(update);
        }
    }

    fn get(&self, id: &str) -> Option<JobRecord> {
        self.jobs.read().get(id).cloned()
    }
}

/// Random 128-bit id, lowercase hex.
pub fn new_job_id() -> JobId {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
