// Deployment facade tying inventory, scheduler and reporting together

use std::path::Path;
use std::sync::Arc;

use crate::executor::{DeploymentScript, Scheduler, SchedulerConfig, ScriptRunner};
use crate::inventory::{FilterCriteria, Host};
use crate::output::{render_summary, write_report, DeployError, DeploymentResult};

/// A configured deployment: candidate hosts, run options, the executor
/// capability, plus the most recent run's aggregate.
#[derive(Debug)]
pub struct Deployment {
    hosts: Vec<Host>,
    scheduler: Scheduler,
    last_result: Option<DeploymentResult>,
}

impl Deployment {
    /// Validates the configuration once, before any dispatch is possible
    pub fn new(
        hosts: Vec<Host>,
        config: SchedulerConfig,
        runner: Arc<dyn ScriptRunner>,
    ) -> Result<Self, DeployError> {
        if hosts.is_empty() {
            return Err(DeployError::Config {
                message: "host list must not be empty".to_string(),
                suggestion: Some("provide at least one candidate host".to_string()),
            });
        }

        let scheduler = Scheduler::new(config, runner)?;

        Ok(Deployment {
            hosts,
            scheduler,
            last_result: None,
        })
    }

    /// The candidate host list, in caller-supplied order
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Select a subset of the candidate hosts
    pub fn filter_hosts(&self, criteria: &FilterCriteria) -> Vec<&Host> {
        criteria.filter(&self.hosts)
    }

    /// Run the script against all candidate hosts, or the filtered subset.
    ///
    /// The returned aggregate is also retained for [`summarize`] and
    /// [`export_results`].
    ///
    /// [`summarize`]: Deployment::summarize
    /// [`export_results`]: Deployment::export_results
    pub async fn execute(
        &mut self,
        script: &DeploymentScript,
        filter: Option<&FilterCriteria>,
    ) -> Result<DeploymentResult, DeployError> {
        let selected: Vec<&Host> = match filter {
            Some(criteria) => criteria.filter(&self.hosts),
            None => self.hosts.iter().collect(),
        };

        let result = self.scheduler.execute(script, &selected).await?;
        self.last_result = Some(result.clone());
        Ok(result)
    }

    /// The most recent run's aggregate, if any
    pub fn last_result(&self) -> Option<&DeploymentResult> {
        self.last_result.as_ref()
    }

    /// Human-readable recap of the most recent run
    pub fn summarize(&self) -> Option<String> {
        self.last_result.as_ref().map(render_summary)
    }

    /// Serialize the most recent run's aggregate to `path`
    pub fn export_results(&self, path: impl AsRef<Path>) -> Result<(), DeployError> {
        let result = self.last_result.as_ref().ok_or_else(|| DeployError::Config {
            message: "no deployment has been executed yet".to_string(),
            suggestion: Some("call execute() before exporting results".to_string()),
        })?;

        write_report(result, path.as_ref())
    }
}
