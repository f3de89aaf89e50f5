pub mod job;
pub mod orchestrator;
pub mod progress;
mod runner;

pub use job::{Job, JobCounters, JobKind, JobStatus};
pub use orchestrator::Orchestrator;
pub use progress::{DocumentProgressTracker, JobPhase, JobProgressBroadcaster, JobProgressEvent};
