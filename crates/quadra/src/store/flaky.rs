//! A [`SqliteStore`] wrapper that fails chosen writes, for exercising the
//! error paths of the services built on top of it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{JobStore, MatchStore, RecordStore, SqliteStore};
use crate::db::{Database, DatabaseError};
use crate::dedup::DedupKey;
use crate::error::StoreError;
use crate::jobs::Job;
use crate::reconcile::{PlanKind, StoredMatch};
use crate::record::{Record, RecordKind};

pub(crate) struct FlakyStore {
    inner: SqliteStore,
    failing_inserts: AtomicUsize,
    /// Commits still allowed before one fails; `usize::MAX` never fails.
    commits_before_failure: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: SqliteStore::new(Database::open_in_memory().unwrap()),
            failing_inserts: AtomicUsize::new(0),
            commits_before_failure: AtomicUsize::new(usize::MAX),
        }
    }

    /// The next `n` calls to `insert_record` fail.
    pub(crate) fn fail_next_inserts(&self, n: usize) {
        self.failing_inserts.store(n, Ordering::SeqCst);
    }

    /// Lets `n` calls to `commit_match` through, then fails one.
    pub(crate) fn fail_commit_after(&self, n: usize) {
        self.commits_before_failure.store(n, Ordering::SeqCst);
    }

    pub(crate) fn inner(&self) -> &SqliteStore {
        &self.inner
    }

    fn disk_full() -> StoreError {
        StoreError::Database(DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            Some("database or disk is full".to_string()),
        )))
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn insert_record(&self, record: &Record) -> Result<(), StoreError> {
        let failing = self
            .failing_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(Self::disk_full());
        }
        self.inner.insert_record(record).await
    }

    async fn update_record(&self, record: &Record) -> Result<(), StoreError> {
        self.inner.update_record(record).await
    }

    async fn get_record(&self, id: &str) -> Result<Option<Record>, StoreError> {
        self.inner.get_record(id).await
    }

    async fn delete_record(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.delete_record(id).await
    }

    async fn list_records(&self, kind: RecordKind) -> Result<Vec<Record>, StoreError> {
        self.inner.list_records(kind).await
    }

    async fn list_job_records(&self, job_id: &str) -> Result<Vec<Record>, StoreError> {
        self.inner.list_job_records(job_id).await
    }

    async fn all_records(&self) -> Result<Vec<Record>, StoreError> {
        self.inner.all_records().await
    }

    async fn dedup_keys(&self) -> Result<Vec<(RecordKind, DedupKey)>, StoreError> {
        self.inner.dedup_keys().await
    }
}

#[async_trait]
impl MatchStore for FlakyStore {
    async fn commit_match(&self, m: &StoredMatch, records: &[Record]) -> Result<(), StoreError> {
        let allowed = self
            .commits_before_failure
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                usize::MAX => Some(n),
                0 => Some(usize::MAX),
                n => Some(n - 1),
            })
            .unwrap_or(usize::MAX);
        if allowed == 0 {
            return Err(Self::disk_full());
        }
        self.inner.commit_match(m, records).await
    }

    async fn get_match(&self, id: &str) -> Result<Option<StoredMatch>, StoreError> {
        self.inner.get_match(id).await
    }

    async fn matches_for_record(&self, record_id: &str) -> Result<Vec<StoredMatch>, StoreError> {
        self.inner.matches_for_record(record_id).await
    }

    async fn claimed_candidates(&self, plan: PlanKind) -> Result<HashSet<String>, StoreError> {
        self.inner.claimed_candidates(plan).await
    }

    async fn remove_match(&self, id: &str, records: &[Record]) -> Result<bool, StoreError> {
        self.inner.remove_match(id, records).await
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn create_job(&self, job: &Job) -> Result<(), StoreError> {
        self.inner.create_job(job).await
    }

    async fn get_job(&self, id: &str) -> Result<Option<Job>, StoreError> {
        self.inner.get_job(id).await
    }

    async fn update_job(&self, job: &Job) -> Result<(), StoreError> {
        self.inner.update_job(job).await
    }

    async fn list_jobs(&self, limit: u32) -> Result<Vec<Job>, StoreError> {
        self.inner.list_jobs(limit).await
    }
}
