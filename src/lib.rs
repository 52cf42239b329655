// Armada - Parallel Multi-Host Deployment Orchestration
//
// Runs an opaque deployment script against a fleet of hosts with bounded
// concurrency, per-attempt timeouts, retry handling and a deterministic
// aggregate report.

pub mod deploy;
pub mod executor;
pub mod inventory;
pub mod output;

pub use deploy::Deployment;
pub use executor::{
    DeploymentScript, LocalRunner, OpenSshRunner, OutputCapture, RetryPolicy, Scheduler,
    SchedulerConfig, ScriptOutcome, ScriptRunner,
};
pub use inventory::{ConnectionConfig, FilterCriteria, Host};
pub use output::{
    AttemptError, DeployError, DeploymentResult, ExecutionStatus, FailureKind, HostResult,
    ResultAggregator,
};

/// Version of the armada crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::deploy::Deployment;
    pub use crate::executor::{
        DeploymentScript, Scheduler, SchedulerConfig, ScriptOutcome, ScriptRunner,
    };
    pub use crate::inventory::{ConnectionConfig, FilterCriteria, Host};
    pub use crate::output::{DeployError, DeploymentResult, ExecutionStatus, HostResult};
}
