pub mod classifier;
pub mod poller;
pub mod reporting;
pub mod source;

pub use classifier::{Classifier, HealthSignal, Verdict};
pub use poller::{CycleReport, PollError, Poller};
pub use reporting::ReportingMode;
pub use source::{KubeStatusSource, SourceError, StatusSource};
