// Output module - errors, results, recap and report

pub mod errors;
pub mod report;
pub mod results;
pub mod summary;

pub use errors::DeployError;
pub use report::{read_report, write_report};
pub use results::{
    AttemptError, DeploymentResult, ExecutionStatus, FailureKind, HostResult, ResultAggregator,
};
pub use summary::render_summary;
