//! Job progress broadcaster for live status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::job::{Job, JobCounters, JobStatus};

/// Phase of job processing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    Processing,
    Extracting,
    Deduplicating,
    Persisting,
    Associating,
    Matching,
    Completed,
    Cancelled,
    Failed,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Queued => write!(f, "Queued"),
            JobPhase::Processing => write!(f, "Processing document"),
            JobPhase::Extracting => write!(f, "Extracting fields"),
            JobPhase::Deduplicating => write!(f, "Checking duplicates"),
            JobPhase::Persisting => write!(f, "Persisting"),
            JobPhase::Associating => write!(f, "Associating"),
            JobPhase::Matching => write!(f, "Matching"),
            JobPhase::Completed => write!(f, "Completed"),
            JobPhase::Cancelled => write!(f, "Cancelled"),
            JobPhase::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: String,
    /// Document currently being processed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub phase: JobPhase,
    pub status: JobStatus,
    pub message: String,
    /// Counter snapshot; only set on job-level events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<JobCounters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl JobProgressEvent {
    /// Per-document event while a job is processing.
    pub fn document(job_id: &str, filename: &str, phase: JobPhase, message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            filename: Some(filename.to_string()),
            phase,
            status: JobStatus::Processing,
            message: message.to_string(),
            counters: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn document_failed(job_id: &str, filename: &str, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::document(job_id, filename, JobPhase::Failed, "Document failed")
        }
    }

    /// Job-level snapshot.
    pub fn job(job: &Job, phase: JobPhase, message: &str) -> Self {
        Self {
            job_id: job.id.clone(),
            filename: None,
            phase,
            status: job.status,
            message: message.to_string(),
            counters: Some(job.counters.clone()),
            error: job.error.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts job progress events to any number of subscribers.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    /// Tracker scoped to one document of `job_id`.
    pub fn track_document(&self, job_id: &str, filename: &str) -> DocumentProgressTracker {
        DocumentProgressTracker {
            job_id: job_id.to_string(),
            filename: filename.to_string(),
            sender: Arc::clone(&self.sender),
        }
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Emits the per-document events of one job.
pub struct DocumentProgressTracker {
    job_id: String,
    filename: String,
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl DocumentProgressTracker {
    pub fn update_phase(&self, phase: JobPhase, message: &str) {
        let event = JobProgressEvent::document(&self.job_id, &self.filename, phase, message);
        let _ = self.sender.send(event);
    }

    pub fn failed(&self, error: &str) {
        let event = JobProgressEvent::document_failed(&self.job_id, &self.filename, error);
        let _ = self.sender.send(event);
    }
}
