//! Background execution of import and reconciliation jobs.
//!
//! Only the runner mutates a job once it is enqueued; the orchestrator just
//! flips the cancellation token.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::associate::{AssociationCounts, AutoAssociator};
use crate::dedup::DedupPool;
use crate::error::StoreError;
use crate::pipeline::{BroadcastProgress, IngestOutcome, PipelineContext};
use crate::processor::RawDocument;
use crate::reconcile::{MatchPlan, ReconcileService};

use super::job::{Job, JobStatus};
use super::orchestrator::Shared;
use super::progress::{JobPhase, JobProgressEvent};

pub(crate) async fn run_import(
    shared: Arc<Shared>,
    job: Job,
    files: Vec<RawDocument>,
    token: CancellationToken,
) {
    let span = info_span!("job", job_id = %job.id, kind = job.kind.as_str(), files = files.len());
    async move {
        let mut job = job;
        if let Err(e) = import(&shared, &mut job, files, &token).await {
            fail(&shared, &mut job, &e).await;
        }
        shared.release_token(&job.id);
    }
    .instrument(span)
    .await
}

pub(crate) async fn run_reconcile(
    shared: Arc<Shared>,
    job: Job,
    plan: MatchPlan,
    token: CancellationToken,
) {
    let span = info_span!("job", job_id = %job.id, kind = job.kind.as_str(), plan = plan.kind().as_str());
    async move {
        let mut job = job;
        if let Err(e) = reconcile(&shared, &mut job, plan, &token).await {
            fail(&shared, &mut job, &e).await;
        }
        shared.release_token(&job.id);
    }
    .instrument(span)
    .await
}

async fn import(
    shared: &Shared,
    job: &mut Job,
    files: Vec<RawDocument>,
    token: &CancellationToken,
) -> Result<(), StoreError> {
    job.start();
    flush(shared, job, JobPhase::Processing, "Import started").await?;

    let keys = shared.store.dedup_keys().await?;
    let mut pool = DedupPool::from_keys(keys);
    debug!(known_keys = pool.len(), "Loaded dedup pool");

    let flush_every = u64::from(shared.config.ingest.flush_every.max(1));
    let mut imported_ids = Vec::new();
    let mut stopped_early = false;

    for document in files {
        if token.is_cancelled() {
            stopped_early = true;
            break;
        }

        let progress = BroadcastProgress::new(&job.id, &document.filename, &shared.broadcaster);
        let ctx = PipelineContext::new(job.id.clone(), document);
        let (outcomes, _ctx) = shared.pipeline.run(ctx, &mut pool, &progress).await;

        for outcome in outcomes {
            match outcome {
                IngestOutcome::Imported { record_id, .. } => {
                    job.counters.imported += 1;
                    imported_ids.push(record_id);
                }
                IngestOutcome::Duplicate { .. } => job.counters.duplicates += 1,
                IngestOutcome::Failed { .. } => job.counters.errors += 1,
            }
        }
        job.counters.processed += 1;

        if job.counters.processed % flush_every == 0 {
            flush(shared, job, JobPhase::Processing, "Progress").await?;
        }
        tokio::task::yield_now().await;
    }

    // A cancel that lands after the last file has nothing left to stop
    if stopped_early {
        return finish_cancelled(shared, job).await;
    }

    let counts = associate(shared, &imported_ids).await?;
    job.counters.vehicles_linked = counts.vehicles;
    job.counters.drivers_linked = counts.drivers;
    job.counters.invoices_linked = counts.invoices;

    let message = format!(
        "{} imported, {} duplicates, {} errors",
        job.counters.imported, job.counters.duplicates, job.counters.errors
    );
    info!(
        processed = job.counters.processed,
        imported = job.counters.imported,
        duplicates = job.counters.duplicates,
        errors = job.counters.errors,
        "Import completed"
    );
    job.finish(JobStatus::Completed, &message);
    flush(shared, job, JobPhase::Completed, &message).await
}

/// Runs the auto-associator once over the batch's imported records.
async fn associate(shared: &Shared, record_ids: &[String]) -> Result<AssociationCounts, StoreError> {
    let mut counts = AssociationCounts::default();
    let references = shared.references();
    if references.is_empty() || record_ids.is_empty() {
        return Ok(counts);
    }

    let associator = AutoAssociator::new(references);
    for id in record_ids {
        let Some(mut record) = shared.store.get_record(id).await? else {
            continue;
        };
        let result = associator.associate(&mut record, false);
        if result.changed() {
            shared.store.update_record(&record).await?;
            counts.add(&result);
        }
    }
    debug!(
        vehicles = counts.vehicles,
        drivers = counts.drivers,
        invoices = counts.invoices,
        "Association pass finished"
    );
    Ok(counts)
}

async fn reconcile(
    shared: &Shared,
    job: &mut Job,
    plan: MatchPlan,
    token: &CancellationToken,
) -> Result<(), StoreError> {
    if token.is_cancelled() {
        return finish_cancelled(shared, job).await;
    }

    job.start();
    flush(shared, job, JobPhase::Matching, "Reconciliation started").await?;

    let service = ReconcileService::new(Arc::clone(&shared.store), shared.config.tolerances)
        .with_references(shared.references());
    let outcome = service.run(&plan, false).await?;

    let sources = (outcome.matches.len() + outcome.unmatched_sources.len()) as u64;
    job.counters.total = sources;
    job.counters.processed = sources;
    job.counters.matched = outcome.persisted;
    job.counters.vehicles_linked = outcome.associations.vehicles;
    job.counters.drivers_linked = outcome.associations.drivers;
    job.counters.invoices_linked = outcome.associations.invoices;

    let message = format!(
        "{} matched, {} unmatched",
        outcome.persisted,
        outcome.unmatched_sources.len()
    );
    job.finish(JobStatus::Completed, &message);
    flush(shared, job, JobPhase::Completed, &message).await
}

async fn finish_cancelled(shared: &Shared, job: &mut Job) -> Result<(), StoreError> {
    let message = format!(
        "Cancelled after {} of {} documents",
        job.counters.processed, job.counters.total
    );
    info!("{}", message);
    job.finish(JobStatus::Cancelled, &message);
    flush(shared, job, JobPhase::Cancelled, &message).await
}

/// Persists the job and broadcasts a snapshot of it.
async fn flush(shared: &Shared, job: &Job, phase: JobPhase, message: &str) -> Result<(), StoreError> {
    shared.store.update_job(job).await?;
    shared.broadcaster.send(JobProgressEvent::job(job, phase, message));
    Ok(())
}

async fn fail(shared: &Shared, job: &mut Job, err: &StoreError) {
    error!(error = %err, "Job failed");
    job.fail(err.to_string());
    if let Err(e) = shared.store.update_job(job).await {
        warn!(error = %e, "Could not record job failure");
    }
    shared
        .broadcaster
        .send(JobProgressEvent::job(job, JobPhase::Failed, "Job failed"));
}
