// OpenSSH subprocess runner
//
// Shells out to the system `ssh` binary instead of embedding a client
// library, so the local ssh setup (agents, config, known keys) keeps
// working unchanged.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{DeploymentScript, OutputCapture, ScriptOutcome, ScriptRunner};
use crate::inventory::{ConnectionConfig, Host};
use crate::output::errors::DeployError;

/// ssh reserves exit code 255 for its own failures (unreachable host,
/// rejected authentication), distinct from the remote command's exit code.
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// Runs deployment scripts over an `ssh` subprocess, one session per attempt.
#[derive(Debug, Default)]
pub struct OpenSshRunner {
    extra_options: Vec<String>,
}

impl OpenSshRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an extra `-o` option passed to every ssh invocation
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.extra_options.push(option.into());
        self
    }

    /// Assemble the ssh argv for one host
    fn build_args(&self, host: &Host, conn: &ConnectionConfig, command: &str) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-o".into(),
            "StrictHostKeyChecking=no".into(),
            "-o".into(),
            "UserKnownHostsFile=/dev/null".into(),
            "-o".into(),
            "LogLevel=ERROR".into(),
            "-o".into(),
            format!("ConnectTimeout={}", conn.connect_timeout.as_secs()),
        ];

        for option in &self.extra_options {
            args.push("-o".into());
            args.push(option.clone());
        }

        if let Some(ref config_file) = conn.ssh_config_file {
            args.push("-F".into());
            args.push(config_file.display().to_string());
        }

        if let Some(ref key) = conn.private_key {
            args.push("-i".into());
            args.push(key.display().to_string());
        }

        if conn.port != 22 {
            args.push("-p".into());
            args.push(conn.port.to_string());
        }

        match conn.user {
            Some(ref user) => args.push(format!("{}@{}", user, host.address)),
            None => args.push(host.address.clone()),
        }

        if conn.sudo {
            args.push(format!("sudo -n -- sh -c {}", shell_quote(command)));
        } else {
            args.push(command.to_string());
        }

        args
    }
}

/// Single-quote a command for safe transport through a remote shell
fn shell_quote(command: &str) -> String {
    format!("'{}'", command.replace('\'', r"'\''"))
}

#[async_trait]
impl ScriptRunner for OpenSshRunner {
    async fn run(
        &self,
        script: &DeploymentScript,
        host: &Host,
        conn: &ConnectionConfig,
        capture: &OutputCapture,
    ) -> Result<ScriptOutcome, DeployError> {
        let args = self.build_args(host, conn, &script.body);

        let mut child = Command::new("ssh")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeployError::Execution {
                host: host.hostname.clone(),
                message: format!("failed to spawn ssh: {}", e),
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
            message: format!("failed to wait for ssh: {}", e),
        })?;

        let stdout_text = stdout_task.await.unwrap_or_default();
        let stderr_text = stderr_task.await.unwrap_or_default();
        let return_code = status.code().unwrap_or(-1);

        if return_code == SSH_TRANSPORT_FAILURE {
            let detail = stderr_text.trim();
            return Err(DeployError::Connection {
                host: host.hostname.clone(),
                message: if detail.is_empty() {
                    "ssh transport failure".to_string()
                } else {
                    detail.to_string()
                },
                suggestion: Some("check connectivity and credentials for the target".to_string()),
            });
        }

        let mut output = stdout_text;
        output.push_str(&stderr_text);

        Ok(ScriptOutcome {
            return_code,
            output: output.trim_end().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn conn() -> ConnectionConfig {
        ConnectionConfig::default()
    }

    #[test]
    fn test_default_args_carry_batch_options() {
        let runner = OpenSshRunner::new();
        let host = Host::new("web1").with_address("192.168.1.10");

        let args = runner.build_args(&host, &conn(), "uptime");

        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        assert!(args.contains(&"ConnectTimeout=30".to_string()));
        assert_eq!(args.last().unwrap(), "uptime");
        assert!(args.contains(&"192.168.1.10".to_string()));
        // Default port needs no -p flag
        assert!(!args.contains(&"-p".to_string()));
    }

    #[test]
    fn test_user_port_and_key_are_applied() {
        let runner = OpenSshRunner::new();
        let host = Host::new("web1").with_address("10.0.0.5");
        let conn = ConnectionConfig::new()
            .with_user("deploy")
            .with_port(2222)
            .with_private_key("/home/deploy/.ssh/id_ed25519")
            .with_connect_timeout(Duration::from_secs(10));

        let args = runner.build_args(&host, &conn, "uptime");

        assert!(args.contains(&"deploy@10.0.0.5".to_string()));
        assert!(args.contains(&"-p".to_string()));
        assert!(args.contains(&"2222".to_string()));
        assert!(args.contains(&"-i".to_string()));
        assert!(args.contains(&"/home/deploy/.ssh/id_ed25519".to_string()));
        assert!(args.contains(&"ConnectTimeout=10".to_string()));
    }

    #[test]
    fn test_sudo_wraps_and_quotes_the_command() {
        let runner = OpenSshRunner::new();
        let host = Host::new("web1");
        let conn = ConnectionConfig::new().with_sudo(true);

        let args = runner.build_args(&host, &conn, "echo 'it works'");

        let remote = args.last().unwrap();
        assert!(remote.starts_with("sudo -n -- sh -c "));
        assert!(remote.contains(r"'\''it works'\''"));
    }

    #[test]
    fn test_extra_options_are_forwarded() {
        let runner = OpenSshRunner::new().with_option("ServerAliveInterval=15");
        let host = Host::new("web1");

        let args = runner.build_args(&host, &conn(), "uptime");
        assert!(args.contains(&"ServerAliveInterval=15".to_string()));
    }
}
