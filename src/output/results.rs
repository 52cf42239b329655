// Per-host and aggregate deployment results

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::errors::DeployError;

/// Lifecycle status of one host during an orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Timeout,
    Retrying,
    Skipped,
}

impl ExecutionStatus {
    /// Whether this status ends the host's participation in the run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success
                | ExecutionStatus::Failed
                | ExecutionStatus::Timeout
                | ExecutionStatus::Skipped
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::Retrying => "retrying",
            ExecutionStatus::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// What went wrong in a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connection,
    Execution,
    Timeout,
    Cancelled,
}

/// One recorded failure, tied to the attempt that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptError {
    pub attempt: u32,
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptError {
    pub fn execution(attempt: u32, return_code: i32) -> Self {
        AttemptError {
            attempt,
            kind: FailureKind::Execution,
            message: format!("script returned non-zero exit code {}", return_code),
        }
    }

    pub fn timeout(attempt: u32, budget: Duration) -> Self {
        AttemptError {
            attempt,
            kind: FailureKind::Timeout,
            message: format!("attempt exceeded {}s budget", budget.as_secs()),
        }
    }

    pub fn cancelled() -> Self {
        AttemptError {
            attempt: 0,
            kind: FailureKind::Cancelled,
            message: "cancelled due to prior failure".to_string(),
        }
    }

    /// Classify a runner error into the matching failure kind
    pub fn from_run_error(attempt: u32, err: &DeployError) -> Self {
        let kind = match err {
            DeployError::Connection { .. } => FailureKind::Connection,
            _ => FailureKind::Execution,
        };
        AttemptError {
            attempt,
            kind,
            message: err.brief(),
        }
    }
}

/// Outcome of one host's full state machine run.
///
/// Owned exclusively by the worker driving the host until the status is
/// terminal, then handed over to the aggregator and never mutated again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostResult {
    pub hostname: String,
    pub status: ExecutionStatus,
    pub attempts: u32,
    pub errors: Vec<AttemptError>,
    pub output: String,
    /// Wall clock summed over all attempts
    pub duration: Duration,
    pub return_code: Option<i32>,
}

impl HostResult {
    pub fn pending(hostname: impl Into<String>) -> Self {
        HostResult {
            hostname: hostname.into(),
            status: ExecutionStatus::Pending,
            attempts: 0,
            errors: Vec::new(),
            output: String::new(),
            duration: Duration::ZERO,
            return_code: None,
        }
    }

    /// A host cancelled before its first attempt ever started
    pub fn skipped(hostname: impl Into<String>) -> Self {
        HostResult {
            status: ExecutionStatus::Skipped,
            errors: vec![AttemptError::cancelled()],
            ..HostResult::pending(hostname)
        }
    }

    pub fn first_error(&self) -> Option<&AttemptError> {
        self.errors.first()
    }
}

/// Run-wide summary combining every host's terminal outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub total_hosts: usize,
    pub successful_hosts: usize,
    pub failed_hosts: usize,
    pub skipped_hosts: usize,
    pub timeout_hosts: usize,
    pub total_duration: Duration,
    /// successful / total * 100, zero when the run had no hosts
    pub success_rate: f64,
    /// One entry per selected host, in filtered host order
    pub host_results: Vec<HostResult>,
}

impl DeploymentResult {
    /// Look up one host's outcome by hostname
    pub fn host_result(&self, hostname: &str) -> Option<&HostResult> {
        self.host_results.iter().find(|r| r.hostname == hostname)
    }

    pub fn has_failures(&self) -> bool {
        self.failed_hosts + self.timeout_hosts > 0
    }
}

/// Thread-safe accumulator for worker outcomes.
///
/// Workers hand over immutable `HostResult` values; merging them into the
/// running aggregate is the only cross-worker shared mutation and happens
/// under the internal mutex.
pub struct ResultAggregator {
    inner: Mutex<AggregatorInner>,
}

struct AggregatorInner {
    order: Vec<String>,
    results: HashMap<String, HostResult>,
}

impl ResultAggregator {
    /// `order` is the filtered host order the final report preserves
    pub fn new(order: Vec<String>) -> Self {
        ResultAggregator {
            inner: Mutex::new(AggregatorInner {
                order,
                results: HashMap::new(),
            }),
        }
    }

    /// Record one host's terminal outcome. Invoked exactly once per host.
    pub fn merge(&self, result: HostResult) {
        debug_assert!(
            result.status.is_terminal(),
            "merged a non-terminal status for {}",
            result.hostname
        );

        let mut inner = self.inner.lock();
        debug_assert!(
            !inner.results.contains_key(&result.hostname),
            "duplicate merge for {}",
            result.hostname
        );
        inner.results.insert(result.hostname.clone(), result);
    }

    /// Produce the immutable aggregate once all workers have joined
    pub fn finalize(self, total_duration: Duration) -> DeploymentResult {
        let inner = self.inner.into_inner();
        let mut results = inner.results;

        let mut host_results = Vec::with_capacity(inner.order.len());
        for hostname in &inner.order {
            if let Some(result) = results.remove(hostname) {
                host_results.push(result);
            }
        }

        let count = |status: ExecutionStatus| {
            host_results
                .iter()
                .filter(|r| r.status == status)
                .count()
        };

        let total_hosts = host_results.len();
        let successful_hosts = count(ExecutionStatus::Success);
        let failed_hosts = count(ExecutionStatus::Failed);
        let skipped_hosts = count(ExecutionStatus::Skipped);
        let timeout_hosts = count(ExecutionStatus::Timeout);
        let success_rate = if total_hosts == 0 {
            0.0
        } else {
            successful_hosts as f64 / total_hosts as f64 * 100.0
        };

        DeploymentResult {
            total_hosts,
            successful_hosts,
            failed_hosts,
            skipped_hosts,
            timeout_hosts,
            total_duration,
            success_rate,
            host_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn terminal(hostname: &str, status: ExecutionStatus) -> HostResult {
        HostResult {
            status,
            attempts: 1,
            ..HostResult::pending(hostname)
        }
    }

    #[test]
    fn test_status_terminality() {
        assert!(ExecutionStatus::Success.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Timeout.is_terminal());
        assert!(ExecutionStatus::Skipped.is_terminal());
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::Retrying.is_terminal());
    }

    #[test]
    fn test_finalize_counts_and_rate() {
        let aggregator = ResultAggregator::new(vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "d".to_string(),
        ]);

        aggregator.merge(terminal("c", ExecutionStatus::Failed));
        aggregator.merge(terminal("a", ExecutionStatus::Success));
        aggregator.merge(terminal("d", ExecutionStatus::Timeout));
        aggregator.merge(HostResult::skipped("b"));

        let result = aggregator.finalize(Duration::from_secs(3));

        assert_eq!(result.total_hosts, 4);
        assert_eq!(result.successful_hosts, 1);
        assert_eq!(result.failed_hosts, 1);
        assert_eq!(result.skipped_hosts, 1);
        assert_eq!(result.timeout_hosts, 1);
        assert_eq!(
            result.total_hosts,
            result.successful_hosts
                + result.failed_hosts
                + result.skipped_hosts
                + result.timeout_hosts
        );
        assert_eq!(result.success_rate, 25.0);
        assert!(result.has_failures());
    }

    #[test]
    fn test_finalize_preserves_host_order() {
        let aggregator =
            ResultAggregator::new(vec!["x".to_string(), "y".to_string(), "z".to_string()]);

        aggregator.merge(terminal("z", ExecutionStatus::Success));
        aggregator.merge(terminal("x", ExecutionStatus::Success));
        aggregator.merge(terminal("y", ExecutionStatus::Success));

        let result = aggregator.finalize(Duration::ZERO);
        let order: Vec<&str> = result
            .host_results
            .iter()
            .map(|r| r.hostname.as_str())
            .collect();
        assert_eq!(order, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_empty_run_has_zero_rate() {
        let result = ResultAggregator::new(Vec::new()).finalize(Duration::ZERO);
        assert_eq!(result.total_hosts, 0);
        assert_eq!(result.success_rate, 0.0);
        assert!(!result.has_failures());
    }

    #[test]
    fn test_skipped_result_carries_cancellation_error() {
        let result = HostResult::skipped("web1");
        assert_eq!(result.status, ExecutionStatus::Skipped);
        assert_eq!(result.attempts, 0);
        let err = result.first_error().unwrap();
        assert_eq!(err.kind, FailureKind::Cancelled);
        assert!(err.message.contains("prior failure"));
    }
}
