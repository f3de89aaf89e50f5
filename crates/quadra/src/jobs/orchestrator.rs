use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::associate::ReferenceSet;
use crate::config::Config;
use crate::error::{JobError, QuadraError};
use crate::pipeline::Pipeline;
use crate::processor::archive::expand_uploads;
use crate::processor::RawDocument;
use crate::reconcile::{MatchPlan, ReconcileService};
use crate::store::Store;

use super::job::{Job, JobKind, JobStatus};
use super::progress::{JobPhase, JobProgressBroadcaster, JobProgressEvent};
use super::runner;

/// State shared between the orchestrator and its background runners.
pub(crate) struct Shared {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) config: Config,
    pub(crate) pipeline: Pipeline,
    pub(crate) broadcaster: JobProgressBroadcaster,
    references: RwLock<ReferenceSet>,
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl Shared {
    /// Snapshot of the current reference set.
    pub(crate) fn references(&self) -> ReferenceSet {
        match self.references.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                log::warn!("Reference set lock was poisoned, recovering");
                poisoned.into_inner().clone()
            }
        }
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        match self.tokens.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Cancellation token map was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub(crate) fn release_token(&self, job_id: &str) {
        self.tokens().remove(job_id);
    }
}

/// Creates jobs and runs them as background tasks on the tokio runtime.
///
/// Must be used from within a runtime: `enqueue` and `start_reconciliation`
/// spawn tasks.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let pipeline = Pipeline::from_config(&config.ingest, Arc::clone(&store));
        Self {
            shared: Arc::new(Shared {
                store,
                config,
                pipeline,
                broadcaster: JobProgressBroadcaster::default(),
                references: RwLock::new(ReferenceSet::default()),
                tokens: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Replaces the vehicles, drivers and invoices used for auto-association.
    pub fn set_references(&self, references: ReferenceSet) {
        let mut guard = match self.shared.references.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Reference set lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = references;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.shared.broadcaster.subscribe()
    }

    /// Synchronous reconciliation, for callers that want the outcome directly.
    pub fn reconcile_service(&self) -> ReconcileService {
        ReconcileService::new(Arc::clone(&self.shared.store), self.shared.config.tolerances)
            .with_references(self.shared.references())
    }

    pub async fn create_job(&self) -> Result<String, JobError> {
        let job = Job::new(JobKind::Import);
        self.shared.store.create_job(&job).await?;
        debug!(job_id = %job.id, "Created job");
        Ok(job.id)
    }

    /// Queues `files` on a freshly created job and starts processing them in
    /// the background. Returns as soon as the job is queued.
    pub async fn enqueue(&self, job_id: &str, files: Vec<RawDocument>) -> Result<(), JobError> {
        let mut job = self.get_status(job_id).await?;
        if job.status != JobStatus::Created {
            return Err(JobError::InvalidState {
                job_id: job.id,
                status: job.status.to_string(),
                action: "enqueued",
            });
        }

        job.status = JobStatus::Queued;
        job.counters.total = files.len() as u64;
        self.shared.store.update_job(&job).await?;
        self.shared
            .broadcaster
            .send(JobProgressEvent::job(&job, JobPhase::Queued, "Job queued"));
        info!(job_id = %job.id, files = files.len(), "Job queued");

        let token = self.register_token(&job.id);
        tokio::spawn(runner::run_import(
            Arc::clone(&self.shared),
            job,
            files,
            token,
        ));
        Ok(())
    }

    /// Expands archives, then creates and enqueues a job. A corrupt archive
    /// fails the call before any job exists.
    pub async fn submit(&self, uploads: Vec<RawDocument>) -> Result<String, QuadraError> {
        let files = expand_uploads(uploads)?;
        let job_id = self.create_job().await?;
        self.enqueue(&job_id, files).await?;
        Ok(job_id)
    }

    pub async fn get_status(&self, job_id: &str) -> Result<Job, JobError> {
        self.shared
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    pub async fn list(&self, limit: u32) -> Result<Vec<Job>, JobError> {
        Ok(self.shared.store.list_jobs(limit).await?)
    }

    /// Asks a queued or running job to stop at its next file boundary.
    /// Returns `false` when the job is unknown or already finished.
    pub fn cancel(&self, job_id: &str) -> bool {
        match self.shared.tokens().get(job_id) {
            Some(token) => {
                token.cancel();
                info!(job_id, "Cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Runs `plan` as a background task. Poll [`Orchestrator::get_status`]
    /// with the returned id.
    pub async fn start_reconciliation(&self, plan: MatchPlan) -> Result<String, JobError> {
        let mut job = Job::new(JobKind::Reconcile);
        job.status = JobStatus::Queued;
        self.shared.store.create_job(&job).await?;
        self.shared.broadcaster.send(JobProgressEvent::job(
            &job,
            JobPhase::Queued,
            "Reconciliation queued",
        ));

        let job_id = job.id.clone();
        let token = self.register_token(&job_id);
        tokio::spawn(runner::run_reconcile(
            Arc::clone(&self.shared),
            job,
            plan,
            token,
        ));
        Ok(job_id)
    }

    fn register_token(&self, job_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.shared
            .tokens()
            .insert(job_id.to_string(), token.clone());
        token
    }
}
