use serde::Serialize;

use crate::dedup::DedupKey;
use crate::error::ExtractionError;
use crate::processor::{DocumentFormat, RawDocument};
use crate::record::{ExtractedRecord, RecordKind};

/// What became of one candidate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Imported { record_id: String, kind: RecordKind },
    Duplicate { dedup_key: DedupKey },
    Failed { error: String },
}

impl IngestOutcome {
    pub fn failed(error: impl ToString) -> Self {
        IngestOutcome::Failed {
            error: error.to_string(),
        }
    }
}

pub struct PipelineContext {
    // Input
    pub job_id: String,
    pub filename: String,

    // Taken by step_process_document; the bytes are dropped once read
    pub document: Option<RawDocument>,

    // Step 1 results
    pub format: Option<DocumentFormat>,
    pub text: Option<String>,

    // Step 2 result, guaranteed Some after step_classify
    pub kind: Option<RecordKind>,

    // Step 3 result: one entry per row for statements, one otherwise
    pub candidates: Vec<Result<ExtractedRecord, ExtractionError>>,

    // Step 4 result: records whose key was new to the pool
    pub fresh: Vec<(ExtractedRecord, DedupKey)>,

    pub outcomes: Vec<IngestOutcome>,
}

impl PipelineContext {
    pub fn new(job_id: impl Into<String>, document: RawDocument) -> Self {
        Self {
            job_id: job_id.into(),
            filename: document.filename.clone(),
            document: Some(document),
            format: None,
            text: None,
            kind: None,
            candidates: Vec::new(),
            fresh: Vec::new(),
            outcomes: Vec::new(),
        }
    }
}
