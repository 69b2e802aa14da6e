pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod hasher;
pub mod metadata;
pub mod model;
pub mod plan;
pub mod progress;
pub mod remote;
pub mod scanner;

pub use config::AppConfig;
pub use engine::{Analysis, OrganizeEngine};
pub use error::Error;
pub use executor::ExecutionReport;
pub use model::{Classification, ClassificationSource, Confidence, FileRecord};
pub use plan::{ExportFormat, OrganizationPlan, PlanAction};
pub use progress::{CancelToken, Phase, ProgressEvent, ProgressReporter, SilentReporter};
