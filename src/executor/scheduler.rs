// Parallel deployment scheduler

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::retry::RetryPolicy;
use super::worker;
use super::{DeploymentScript, ScriptRunner};
use crate::inventory::{ConnectionConfig, Host};
use crate::output::errors::DeployError;
use crate::output::results::{DeploymentResult, ExecutionStatus, HostResult, ResultAggregator};

/// Configuration for a deployment run
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Worker pool size
    pub max_parallel: usize,
    /// Per-attempt wall-clock budget
    pub timeout: Duration,
    /// Extra attempts after the first failure
    pub retry_count: u32,
    /// Delay between attempts
    pub retry_delay: Duration,
    /// Abort pending work on the first terminal failure
    pub fail_fast: bool,
    /// Keep dispatching remaining hosts despite failures
    pub continue_on_error: bool,
    /// Run-level connection defaults; hosts may override
    pub connection: ConnectionConfig,
    /// Detailed per-attempt diagnostics
    pub verbose: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            max_parallel: 10,
            timeout: Duration::from_secs(300),
            retry_count: 0,
            retry_delay: Duration::from_secs(5),
            fail_fast: false,
            continue_on_error: true,
            connection: ConnectionConfig::default(),
            verbose: false,
        }
    }
}

impl SchedulerConfig {
    /// Check the knobs once, before any dispatch is possible
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.max_parallel < 1 {
            return Err(DeployError::Config {
                message: "max_parallel must be at least 1".to_string(),
                suggestion: Some("set max_parallel to a positive worker count".to_string()),
            });
        }

        if self.timeout.is_zero() {
            return Err(DeployError::Config {
                message: "per-attempt timeout must be non-zero".to_string(),
                suggestion: Some("give each attempt a wall-clock budget in seconds".to_string()),
            });
        }

        Ok(())
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count, self.retry_delay)
    }
}

/// Cooperative cancellation signal shared by all workers.
///
/// `stop_dispatch` suppresses hosts that have not started; `abandon_retries`
/// additionally stops in-flight hosts from re-attempting. Neither forces a
/// running attempt to stop early, and results already merged are never
/// discarded.
pub(super) struct RunControl {
    fail_fast: bool,
    continue_on_error: bool,
    stop_dispatch: AtomicBool,
    abandon_retries: AtomicBool,
}

impl RunControl {
    fn new(fail_fast: bool, continue_on_error: bool) -> Self {
        RunControl {
            fail_fast,
            continue_on_error,
            stop_dispatch: AtomicBool::new(false),
            abandon_retries: AtomicBool::new(false),
        }
    }

    pub(super) fn should_dispatch(&self) -> bool {
        !self.stop_dispatch.load(Ordering::SeqCst)
    }

    pub(super) fn retries_abandoned(&self) -> bool {
        self.abandon_retries.load(Ordering::SeqCst)
    }

    fn record_failure(&self) {
        if self.fail_fast {
            self.stop_dispatch.store(true, Ordering::SeqCst);
            self.abandon_retries.store(true, Ordering::SeqCst);
        } else if !self.continue_on_error {
            // In-flight hosts keep their retry budget; only new dispatch stops
            self.stop_dispatch.store(true, Ordering::SeqCst);
        }
    }
}

/// The deployment scheduler: a bounded pool of per-host workers.
///
/// Each worker owns one host for the duration of its attempts; the shared
/// aggregate is only ever touched through the aggregator's merge.
pub struct Scheduler {
    config: SchedulerConfig,
    runner: Arc<dyn ScriptRunner>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("runner", &"<dyn ScriptRunner>")
            .finish()
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, runner: Arc<dyn ScriptRunner>) -> Result<Self, DeployError> {
        config.validate()?;
        Ok(Scheduler { config, runner })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run `script` against every host in `hosts`, bounded by the pool size.
    ///
    /// Per-host failures never fail the run: once dispatch begins, an
    /// aggregate covering every selected host is always produced.
    pub async fn execute(
        &self,
        script: &DeploymentScript,
        hosts: &[&Host],
    ) -> Result<DeploymentResult, DeployError> {
        if hosts.is_empty() {
            return Err(DeployError::HostSelection {
                message: "no hosts selected for deployment".to_string(),
                suggestion: Some("check the host list and filter criteria".to_string()),
            });
        }

        info!(
            script = %script.name,
            hosts = hosts.len(),
            max_parallel = self.config.max_parallel,
            "starting deployment"
        );

        let order: Vec<String> = hosts.iter().map(|h| h.hostname.clone()).collect();
        let aggregator = ResultAggregator::new(order);
        let semaphore = Semaphore::new(self.config.max_parallel);
        let control = RunControl::new(self.config.fail_fast, self.config.continue_on_error);
        let policy = self.config.retry_policy();
        let started = Instant::now();

        let futures: Vec<_> = hosts
            .iter()
            .map(|&host| {
                let aggregator = &aggregator;
                let semaphore = &semaphore;
                let control = &control;
                let config = &self.config;
                let runner = self.runner.as_ref();

                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore closed");

                    // Dispatch boundary: hosts cancelled here never enter running
                    if !control.should_dispatch() {
                        debug!(host = %host.hostname, "skipped by cancellation");
                        aggregator.merge(HostResult::skipped(&host.hostname));
                        return;
                    }

                    let conn = host.connection.as_ref().unwrap_or(&config.connection);
                    let result = worker::run_host(
                        runner,
                        script,
                        host,
                        conn,
                        policy,
                        config.timeout,
                        control,
                        config.verbose,
                    )
                    .await;

                    if matches!(
                        result.status,
                        ExecutionStatus::Failed | ExecutionStatus::Timeout
                    ) {
                        warn!(
                            host = %host.hostname,
                            status = %result.status,
                            attempts = result.attempts,
                            "host finished with failure"
                        );
                        control.record_failure();
                    } else {
                        debug!(host = %host.hostname, status = %result.status, "host finished");
                    }

                    aggregator.merge(result);
                }
            })
            .collect();

        join_all(futures).await;

        let result = aggregator.finalize(started.elapsed());
        info!(
            success = result.successful_hosts,
            failed = result.failed_hosts,
            skipped = result.skipped_hosts,
            timeout = result.timeout_hosts,
            "deployment finished"
        );
        Ok(result)
    }
}
