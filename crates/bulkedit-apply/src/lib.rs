//! Apply stage of the batch import engine.

pub mod applier;
pub mod policy;
pub mod progress;
pub mod report;

pub use applier::{ChangeApplier, apply, apply_with_policy};
pub use policy::{StandardPolicy, SubmissionPolicy};
pub use progress::{CollectingProgress, CommitProgress, ProgressSink, TracingProgress};
pub use report::{ApplyReport, RecordOutcome, RecordReport};
