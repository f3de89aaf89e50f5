use crate::jobs::progress::{DocumentProgressTracker, JobPhase, JobProgressBroadcaster};

/// Events emitted by the pipeline while a document is ingested.
pub enum ProgressEvent {
    Phase {
        phase: JobPhase,
        message: String,
    },
    Completed {
        imported: usize,
        duplicates: usize,
        errors: usize,
    },
    Failed {
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Bridges pipeline events to the job progress broadcast channel.
pub struct BroadcastProgress {
    tracker: DocumentProgressTracker,
}

impl BroadcastProgress {
    pub fn new(job_id: &str, filename: &str, broadcaster: &JobProgressBroadcaster) -> Self {
        Self {
            tracker: broadcaster.track_document(job_id, filename),
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase { phase, message } => {
                self.tracker.update_phase(phase, &message);
            }
            ProgressEvent::Completed {
                imported,
                duplicates,
                errors,
            } => {
                let message = format!(
                    "{} imported, {} duplicates, {} errors",
                    imported, duplicates, errors
                );
                self.tracker.update_phase(JobPhase::Completed, &message);
            }
            ProgressEvent::Failed { error } => {
                self.tracker.failed(&error);
            }
        }
    }
}
