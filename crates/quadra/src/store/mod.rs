//! Storage seams for records, matches and jobs.
//!
//! Services depend on these traits rather than on SQLite directly; the only
//! implementation shipped is [`SqliteStore`].

mod sqlite;
#[cfg(test)]
pub(crate) mod flaky;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::dedup::DedupKey;
use crate::error::StoreError;
use crate::jobs::Job;
use crate::reconcile::{PlanKind, StoredMatch};
use crate::record::{Record, RecordKind};

pub use sqlite::SqliteStore;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_record(&self, record: &Record) -> Result<(), StoreError>;

    /// Fails with [`StoreError::RecordNotFound`] if the record is gone.
    async fn update_record(&self, record: &Record) -> Result<(), StoreError>;

    async fn get_record(&self, id: &str) -> Result<Option<Record>, StoreError>;

    async fn delete_record(&self, id: &str) -> Result<bool, StoreError>;

    /// Records of one kind, oldest first.
    async fn list_records(&self, kind: RecordKind) -> Result<Vec<Record>, StoreError>;

    async fn list_job_records(&self, job_id: &str) -> Result<Vec<Record>, StoreError>;

    async fn all_records(&self) -> Result<Vec<Record>, StoreError>;

    /// Every persisted dedup key, with the kind of record that carries it.
    async fn dedup_keys(&self) -> Result<Vec<(RecordKind, DedupKey)>, StoreError>;
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Stores the match together with the records it changed, all or
    /// nothing. Fails with [`StoreError::RecordNotFound`] if one of them is
    /// gone.
    async fn commit_match(&self, m: &StoredMatch, records: &[Record]) -> Result<(), StoreError>;

    async fn get_match(&self, id: &str) -> Result<Option<StoredMatch>, StoreError>;

    async fn matches_for_record(&self, record_id: &str) -> Result<Vec<StoredMatch>, StoreError>;

    /// Candidate ids already paired under `plan`.
    async fn claimed_candidates(&self, plan: PlanKind) -> Result<HashSet<String>, StoreError>;

    /// Deletes the match and writes the records it released, all or
    /// nothing. Returns `false` if the match was already gone.
    async fn remove_match(&self, id: &str, records: &[Record]) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: &Job) -> Result<(), StoreError>;

    async fn get_job(&self, id: &str) -> Result<Option<Job>, StoreError>;

    async fn update_job(&self, job: &Job) -> Result<(), StoreError>;

    /// Most recent first.
    async fn list_jobs(&self, limit: u32) -> Result<Vec<Job>, StoreError>;
}

/// Everything the orchestrator and the reconcile service need.
pub trait Store: RecordStore + MatchStore + JobStore {}

impl<T: RecordStore + MatchStore + JobStore> Store for T {}
