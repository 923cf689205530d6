//! Job events broadcast to in-process subscribers.
//!
//! Every store update made by the pipeline is followed by a [`JobEvent`]
//! carrying the job's new snapshot, so hosts can follow progress without
//! polling the store.

use serde::{Deserialize, Serialize};

use crate::jobs::{JobId, JobRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    /// Monotonically increasing across all jobs of one engine.
    pub seq: u64,
    pub job_id: JobId,
    pub record: JobRecord,
}
