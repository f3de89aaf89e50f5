use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{JobStore, MatchStore, RecordStore};
use crate::db::job_repo::{self, JobRow};
use crate::db::match_repo::{self, MatchRow};
use crate::db::record_repo::{self, RecordRow};
use crate::db::{Database, DatabaseError};
use crate::dedup::DedupKey;
use crate::error::StoreError;
use crate::jobs::{Job, JobCounters, JobKind, JobStatus};
use crate::reconcile::{PlanKind, StoredMatch};
use crate::record::{Record, RecordKind};

// ─── Helpers ────────────────────────────────────────────────────────────────

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

fn to_column(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn record_to_row(record: &Record) -> Result<RecordRow, StoreError> {
    let (created_at, updated_at) = match record {
        Record::Transfer(e) | Record::StatementLine(e) => (e.created_at, e.updated_at),
        Record::Fine(f) => (f.created_at, f.updated_at),
    };

    Ok(RecordRow {
        id: record.id().to_string(),
        kind: record.kind().as_str().to_string(),
        state: record.state_label().to_string(),
        dedup_key: record.dedup_key().to_string(),
        job_id: record.fields().job_id.clone(),
        body: serde_json::to_string(record)?,
        created_at: format_timestamp(created_at),
        updated_at: format_timestamp(updated_at),
    })
}

fn row_to_record(row: &RecordRow) -> Result<Record, StoreError> {
    Ok(serde_json::from_str(&row.body)?)
}

fn rows_to_records(rows: Vec<RecordRow>) -> Result<Vec<Record>, StoreError> {
    rows.iter().map(row_to_record).collect()
}

/// A record that vanished mid-write is reported like any other missing record.
fn missing_record(err: DatabaseError) -> StoreError {
    match err {
        DatabaseError::MissingRow { table: "records", id } => StoreError::RecordNotFound(id),
        other => StoreError::Database(other),
    }
}

fn job_to_row(job: &Job) -> JobRow {
    let c = &job.counters;
    JobRow {
        id: job.id.clone(),
        kind: job.kind.as_str().to_string(),
        status: job.status.as_str().to_string(),
        total: to_column(c.total),
        processed: to_column(c.processed),
        imported: to_column(c.imported),
        duplicates: to_column(c.duplicates),
        errors: to_column(c.errors),
        matched: to_column(c.matched),
        vehicles_linked: to_column(c.vehicles_linked),
        drivers_linked: to_column(c.drivers_linked),
        invoices_linked: to_column(c.invoices_linked),
        message: job.message.clone(),
        error: job.error.clone(),
        created_at: format_timestamp(job.created_at),
        started_at: job.started_at.map(format_timestamp),
        completed_at: job.completed_at.map(format_timestamp),
        updated_at: format_timestamp(Utc::now()),
    }
}

fn row_to_job(row: &JobRow) -> Job {
    let kind = JobKind::parse(&row.kind).unwrap_or_else(|| {
        log::warn!(
            "Unknown job kind '{}' for job {}, defaulting to import",
            row.kind,
            row.id
        );
        JobKind::Import
    });
    let status = JobStatus::parse(&row.status).unwrap_or_else(|| {
        log::warn!(
            "Unknown job status '{}' for job {}, treating as error",
            row.status,
            row.id
        );
        JobStatus::Error
    });

    Job {
        id: row.id.clone(),
        kind,
        status,
        counters: JobCounters {
            total: to_count(row.total),
            processed: to_count(row.processed),
            imported: to_count(row.imported),
            duplicates: to_count(row.duplicates),
            errors: to_count(row.errors),
            matched: to_count(row.matched),
            vehicles_linked: to_count(row.vehicles_linked),
            drivers_linked: to_count(row.drivers_linked),
            invoices_linked: to_count(row.invoices_linked),
        },
        message: row.message.clone(),
        error: row.error.clone(),
        created_at: parse_timestamp(&row.created_at),
        started_at: row.started_at.as_deref().map(parse_timestamp),
        completed_at: row.completed_at.as_deref().map(parse_timestamp),
    }
}

fn match_to_row(m: &StoredMatch) -> MatchRow {
    MatchRow {
        id: m.id.clone(),
        plan: m.plan.as_str().to_string(),
        source_id: m.source_id.clone(),
        candidate_id: m.candidate_id.clone(),
        delta_cents: m.delta_cents,
        date_offset_days: m.date_offset_days,
        created_at: format_timestamp(m.created_at),
    }
}

fn row_to_match(row: &MatchRow) -> Result<StoredMatch, StoreError> {
    let plan = PlanKind::parse(&row.plan)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown plan '{}' on match {}", row.plan, row.id)))?;
    Ok(StoredMatch {
        id: row.id.clone(),
        plan,
        source_id: row.source_id.clone(),
        candidate_id: row.candidate_id.clone(),
        delta_cents: row.delta_cents,
        date_offset_days: row.date_offset_days,
        created_at: parse_timestamp(&row.created_at),
    })
}

// ─── SqliteStore ────────────────────────────────────────────────────────────

/// Store backed by the rusqlite [`Database`]. Statements are sub-millisecond,
/// so they run inline on the calling task.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert_record(&self, record: &Record) -> Result<(), StoreError> {
        let row = record_to_row(record)?;
        record_repo::insert(&self.db, &row)?;
        Ok(())
    }

    async fn update_record(&self, record: &Record) -> Result<(), StoreError> {
        let row = record_to_row(record)?;
        if !record_repo::update(&self.db, &row)? {
            return Err(StoreError::RecordNotFound(row.id));
        }
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<Record>, StoreError> {
        record_repo::find_by_id(&self.db, id)?
            .as_ref()
            .map(row_to_record)
            .transpose()
    }

    async fn delete_record(&self, id: &str) -> Result<bool, StoreError> {
        Ok(record_repo::delete(&self.db, id)?)
    }

    async fn list_records(&self, kind: RecordKind) -> Result<Vec<Record>, StoreError> {
        rows_to_records(record_repo::list_by_kind(&self.db, kind.as_str())?)
    }

    async fn list_job_records(&self, job_id: &str) -> Result<Vec<Record>, StoreError> {
        rows_to_records(record_repo::list_by_job(&self.db, job_id)?)
    }

    async fn all_records(&self) -> Result<Vec<Record>, StoreError> {
        rows_to_records(record_repo::list_all(&self.db)?)
    }

    async fn dedup_keys(&self) -> Result<Vec<(RecordKind, DedupKey)>, StoreError> {
        record_repo::all_dedup_keys(&self.db)?
            .into_iter()
            .map(|(kind, key)| {
                let kind = RecordKind::parse(&kind)
                    .ok_or_else(|| StoreError::Corrupt(format!("unknown record kind '{}'", kind)))?;
                Ok((kind, DedupKey::from_hex(key)))
            })
            .collect()
    }
}

#[async_trait]
impl MatchStore for SqliteStore {
    async fn commit_match(&self, m: &StoredMatch, records: &[Record]) -> Result<(), StoreError> {
        let rows = records
            .iter()
            .map(record_to_row)
            .collect::<Result<Vec<_>, _>>()?;
        match_repo::insert_with_records(&self.db, &match_to_row(m), &rows).map_err(missing_record)
    }

    async fn get_match(&self, id: &str) -> Result<Option<StoredMatch>, StoreError> {
        match_repo::find_by_id(&self.db, id)?
            .as_ref()
            .map(row_to_match)
            .transpose()
    }

    async fn matches_for_record(&self, record_id: &str) -> Result<Vec<StoredMatch>, StoreError> {
        match_repo::find_by_record(&self.db, record_id)?
            .iter()
            .map(row_to_match)
            .collect()
    }

    async fn claimed_candidates(&self, plan: PlanKind) -> Result<HashSet<String>, StoreError> {
        Ok(match_repo::claimed_candidates(&self.db, plan.as_str())?
            .into_iter()
            .collect())
    }

    async fn remove_match(&self, id: &str, records: &[Record]) -> Result<bool, StoreError> {
        let rows = records
            .iter()
            .map(record_to_row)
            .collect::<Result<Vec<_>, _>>()?;
        match_repo::delete_with_records(&self.db, id, &rows).map_err(missing_record)
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn create_job(&self, job: &Job) -> Result<(), StoreError> {
        job_repo::insert(&self.db, &job_to_row(job))?;
        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Option<Job>, StoreError> {
        Ok(job_repo::find_by_id(&self.db, id)?.as_ref().map(row_to_job))
    }

    async fn update_job(&self, job: &Job) -> Result<(), StoreError> {
        if !job_repo::update(&self.db, &job_to_row(job))? {
            return Err(StoreError::JobNotFound(job.id.clone()));
        }
        Ok(())
    }

    async fn list_jobs(&self, limit: u32) -> Result<Vec<Job>, StoreError> {
        Ok(job_repo::list(&self.db, None, limit)?
            .iter()
            .map(row_to_job)
            .collect())
    }
}
