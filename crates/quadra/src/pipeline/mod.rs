pub mod context;
pub mod error;
pub mod progress;
pub mod runner;

pub use context::{IngestOutcome, PipelineContext};
pub use error::PipelineError;
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::Pipeline;
