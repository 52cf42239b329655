// Executor module - deployment script dispatch

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::inventory::{ConnectionConfig, Host};
use crate::output::errors::DeployError;

pub mod local;
pub mod retry;
pub mod scheduler;
pub mod ssh;

mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use local::LocalRunner;
pub use retry::RetryPolicy;
pub use scheduler::{Scheduler, SchedulerConfig};
pub use ssh::OpenSshRunner;

/// An opaque unit of work to run once per host, per attempt.
///
/// The orchestrator never interprets the body; what it means is entirely up
/// to the runner that executes it.
#[derive(Debug, Clone)]
pub struct DeploymentScript {
    pub name: String,
    pub body: String,
}

impl DeploymentScript {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        DeploymentScript {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// Outcome of one completed attempt
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub return_code: i32,
    pub output: String,
}

impl ScriptOutcome {
    pub fn success(&self) -> bool {
        self.return_code == 0
    }
}

/// Live output buffer for one attempt.
///
/// Runners append lines as they are produced; the orchestrator reads the
/// snapshot when an attempt is cut short by its timeout budget.
#[derive(Debug, Clone, Default)]
pub struct OutputCapture {
    buf: Arc<Mutex<String>>,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_line(&self, line: &str) {
        let mut buf = self.buf.lock();
        if !buf.is_empty() {
            buf.push('\n');
        }
        buf.push_str(line);
    }

    pub fn snapshot(&self) -> String {
        self.buf.lock().clone()
    }
}

/// Capability that applies a deployment script to one host.
///
/// The orchestrator does not know or care how the script is applied
/// remotely; it only sees the return code and output.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run the script once against `host`.
    ///
    /// Implementations should mirror output into `capture` as it is
    /// produced, so an attempt cancelled mid-flight still reports what
    /// happened up to that point.
    async fn run(
        &self,
        script: &DeploymentScript,
        host: &Host,
        conn: &ConnectionConfig,
        capture: &OutputCapture,
    ) -> Result<ScriptOutcome, DeployError>;
}
