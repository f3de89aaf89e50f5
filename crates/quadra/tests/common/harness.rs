//! Test harness for isolated test execution.
//!
//! Each `TestHarness` owns its own database, either in memory or in a
//! temporary directory, and an orchestrator on top of it.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use quadra::db::Database;
use quadra::store::RecordStore;
use quadra::{Config, Job, Orchestrator, RawDocument, Record, RecordKind, SqliteStore};

pub struct TestHarness {
    /// Keeps the database directory alive for file-backed harnesses.
    temp_dir: Option<TempDir>,
    pub store: Arc<SqliteStore>,
    pub orchestrator: Orchestrator,
}

impl TestHarness {
    /// In-memory database with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        Self::build(db, config, None)
    }

    /// File-backed database inside a fresh temp directory.
    pub fn with_file_db() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("data").join("quadra.db");
        let db = Database::open(&path).expect("Failed to open database");
        Self::build(db, Config::default(), Some(temp_dir))
    }

    fn build(db: Database, config: Config, temp_dir: Option<TempDir>) -> Self {
        let store = Arc::new(SqliteStore::new(db));
        let orchestrator = Orchestrator::new(store.clone(), config);
        Self {
            temp_dir,
            store,
            orchestrator,
        }
    }

    pub fn db_path(&self) -> Option<PathBuf> {
        self.temp_dir
            .as_ref()
            .map(|d| d.path().join("data").join("quadra.db"))
    }

    /// Submits `uploads` and waits for the job to finish.
    pub async fn import(&self, uploads: Vec<RawDocument>) -> Job {
        let job_id = self
            .orchestrator
            .submit(uploads)
            .await
            .expect("Failed to submit upload");
        self.wait_finished(&job_id).await
    }

    pub async fn wait_finished(&self, job_id: &str) -> Job {
        for _ in 0..500 {
            let job = self
                .orchestrator
                .get_status(job_id)
                .await
                .expect("Job disappeared");
            if job.is_finished() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Job {} did not finish in time", job_id);
    }

    pub async fn records(&self, kind: RecordKind) -> Vec<Record> {
        self.store
            .list_records(kind)
            .await
            .expect("Failed to list records")
    }

    pub async fn record_count(&self) -> usize {
        self.store
            .all_records()
            .await
            .expect("Failed to list records")
            .len()
    }
}
