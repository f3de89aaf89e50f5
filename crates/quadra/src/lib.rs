pub mod associate;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod export;
pub mod extract;
pub mod jobs;
pub mod lifecycle;
pub mod pipeline;
pub mod processor;
pub mod reconcile;
pub mod record;
pub mod sanitize;
pub mod statement;
pub mod store;
pub mod telemetry;

pub use associate::{AssociationResult, AutoAssociator, ReferenceEntity, ReferenceSet};
pub use config::{load_config, load_config_from_str, Config};
pub use dedup::{dedup_key, DedupKey, DedupPool};
pub use error::{
    ArchiveError, ConfigError, ExportError, ExtractionError, JobError, ProcessError, QuadraError,
    Result, StoreError, TelemetryError,
};
pub use export::{write_csv, ExportOptions};
pub use jobs::{Job, JobKind, JobProgressBroadcaster, JobProgressEvent, JobStatus, Orchestrator};
pub use pipeline::{IngestOutcome, Pipeline, PipelineContext};
pub use processor::RawDocument;
pub use reconcile::{Counterpart, MatchPlan, ReconcileOutcome, ReconcileService, Tolerance};
pub use record::{Amount, ExtractedRecord, Record, RecordKind};
pub use store::{SqliteStore, Store};
pub use telemetry::init_logging;
