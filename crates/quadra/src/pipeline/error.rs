use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Document processing failed: {0}")]
    Processing(#[from] crate::error::ProcessError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] crate::error::ExtractionError),

    #[error("Persisting record failed: {0}")]
    Persist(#[from] crate::error::StoreError),
}
