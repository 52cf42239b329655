// Local script execution without SSH

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{DeploymentScript, OutputCapture, ScriptOutcome, ScriptRunner};
use crate::inventory::{ConnectionConfig, Host};
use crate::output::errors::DeployError;

/// Runs deployment scripts on the local machine via `sh -c`.
///
/// Useful for smoke-testing an orchestration without remote targets; the
/// host's address and connection settings are ignored.
#[derive(Debug, Default)]
pub struct LocalRunner;

impl LocalRunner {
    pub fn new() -> Self {
        LocalRunner
    }
}

#[async_trait]
impl ScriptRunner for LocalRunner {
    async fn run(
        &self,
        script: &DeploymentScript,
        host: &Host,
        _conn: &ConnectionConfig,
        capture: &OutputCapture,
    ) -> Result<ScriptOutcome, DeployError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&script.body)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeployError::Execution {
                host: host.hostname.clone(),
                message: format!("failed to spawn local script: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| DeployError::Execution {
            host: host.hostname.clone(),
            message: "failed to capture stdout".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| DeployError::Execution {
            host: host.hostname.clone(),
            message: "failed to capture stderr".to_string(),
        })?;

        let stdout_capture = capture.clone();
        let stdout_task = tokio::spawn(async move {
            let mut collected = String::new();
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                stdout_capture.append_line(&line);
                collected.push_str(&line);
                collected.push('\n');
            }
            collected
        });

        let stderr_capture = capture.clone();
        let stderr_task = tokio::spawn(async move {
            let mut collected = String::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                stderr_capture.append_line(&line);
                collected.push_str(&line);
                collected.push('\n');
            }
            collected
        });

        let status = child.wait().await.map_err(|e| DeployError::Execution {
            host: host.hostname.clone(),
            message: format!("failed to wait for local script: {}", e),
        })?;

        let mut output = stdout_task.await.unwrap_or_default();
        output.push_str(&stderr_task.await.unwrap_or_default());

        Ok(ScriptOutcome {
            return_code: status.code().unwrap_or(-1),
            output: output.trim_end().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(body: &str) -> DeploymentScript {
        DeploymentScript::new("test", body)
    }

    #[tokio::test]
    async fn test_local_runner_captures_output() {
        let runner = LocalRunner::new();
        let capture = OutputCapture::new();
        let host = Host::new("localhost");

        let outcome = runner
            .run(
                &script("echo hello"),
                &host,
                &ConnectionConfig::default(),
                &capture,
            )
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.output, "hello");
        assert_eq!(capture.snapshot(), "hello");
    }

    #[tokio::test]
    async fn test_local_runner_reports_exit_code() {
        let runner = LocalRunner::new();
        let capture = OutputCapture::new();
        let host = Host::new("localhost");

        let outcome = runner
            .run(
                &script("exit 3"),
                &host,
                &ConnectionConfig::default(),
                &capture,
            )
            .await
            .unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.return_code, 3);
    }

    #[tokio::test]
    async fn test_local_runner_combines_stderr() {
        let runner = LocalRunner::new();
        let capture = OutputCapture::new();
        let host = Host::new("localhost");

        let outcome = runner
            .run(
                &script("echo oops >&2; exit 1"),
                &host,
                &ConnectionConfig::default(),
                &capture,
            )
            .await
            .unwrap();

        assert_eq!(outcome.return_code, 1);
        assert!(outcome.output.contains("oops"));
    }
}
