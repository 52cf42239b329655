// Per-host execution state machine: attempts, retries, timeout budget

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::retry::RetryPolicy;
use super::scheduler::RunControl;
use super::{DeploymentScript, OutputCapture, ScriptRunner};
use crate::inventory::{ConnectionConfig, Host};
use crate::output::results::{AttemptError, ExecutionStatus, HostResult};

/// Drive one host from pending to a terminal status.
///
/// Attempts are totally ordered: attempt N+1 never starts before attempt N
/// has finalized. The returned result's duration sums the wall clock of all
/// attempts.
#[allow(clippy::too_many_arguments)]
pub(super) async fn run_host(
    runner: &dyn ScriptRunner,
    script: &DeploymentScript,
    host: &Host,
    conn: &ConnectionConfig,
    policy: RetryPolicy,
    budget: Duration,
    control: &RunControl,
    verbose: bool,
) -> HostResult {
    let mut result = HostResult::pending(&host.hostname);

    loop {
        result.attempts += 1;
        result.status = ExecutionStatus::Running;
        if verbose {
            info!(host = %host.hostname, attempt = result.attempts, script = %script.name, "starting attempt");
        } else {
            debug!(host = %host.hostname, attempt = result.attempts, "starting attempt");
        }

        let capture = OutputCapture::new();
        let started = Instant::now();
        let attempt = tokio::time::timeout(budget, runner.run(script, host, conn, &capture)).await;
        result.duration += started.elapsed();

        match attempt {
            Ok(Ok(outcome)) => {
                result.return_code = Some(outcome.return_code);
                let succeeded = outcome.success();
                result.output = outcome.output;

                if succeeded {
                    result.status = ExecutionStatus::Success;
                    if verbose {
                        info!(host = %host.hostname, attempt = result.attempts, "attempt succeeded");
                    }
                    return result;
                }

                result.status = ExecutionStatus::Failed;
                result
                    .errors
                    .push(AttemptError::execution(result.attempts, outcome.return_code));
            }
            Ok(Err(err)) => {
                result.output = capture.snapshot();
                result.status = ExecutionStatus::Failed;
                result
                    .errors
                    .push(AttemptError::from_run_error(result.attempts, &err));
            }
            Err(_) => {
                // Dropping the runner future tears down the attempt; output
                // streamed into the capture so far is preserved.
                result.output = capture.snapshot();
                result.status = ExecutionStatus::Timeout;
                result
                    .errors
                    .push(AttemptError::timeout(result.attempts, budget));
            }
        }

        if control.retries_abandoned() {
            warn!(host = %host.hostname, status = %result.status, "not retrying: run was cancelled");
            return result;
        }

        if !policy.should_retry(result.attempts) {
            debug!(host = %host.hostname, attempts = result.attempts, "retry budget spent");
            return result;
        }

        result.status = ExecutionStatus::Retrying;
        debug!(
            host = %host.hostname,
            attempt = result.attempts,
            delay_ms = policy.retry_delay.as_millis() as u64,
            "retrying after delay"
        );
        tokio::time::sleep(policy.retry_delay).await;
    }
}
