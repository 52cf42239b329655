// Human-readable error messages for armada

use std::fmt;
use std::io::IsTerminal;
use std::path::PathBuf;

use colored::*;

/// Initialize color output based on TTY detection and NO_COLOR environment variable
fn should_use_colors() -> bool {
    // Check NO_COLOR environment variable first (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    // Check if stderr is a TTY (errors are typically written to stderr)
    std::io::stderr().is_terminal()
}

/// All error types surfaced by the orchestrator
#[derive(Debug)]
pub enum DeployError {
    /// Invalid configuration, reported before any dispatch begins
    Config {
        message: String,
        suggestion: Option<String>,
    },

    /// Host selection produced no targets
    HostSelection {
        message: String,
        suggestion: Option<String>,
    },

    /// Host unreachable or authentication rejected
    Connection {
        host: String,
        message: String,
        suggestion: Option<String>,
    },

    /// The deployment script could not be launched or crashed the runner
    Execution { host: String, message: String },

    /// I/O errors
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Report serialization or re-parse errors
    Report {
        message: String,
        path: Option<PathBuf>,
    },
}

impl DeployError {
    /// One-line description without formatting, for per-host error records
    pub fn brief(&self) -> String {
        match self {
            DeployError::Config { message, .. } => message.clone(),
            DeployError::HostSelection { message, .. } => message.clone(),
            DeployError::Connection { host, message, .. } => {
                format!("connection to {} failed: {}", host, message)
            }
            DeployError::Execution { host, message } => {
                format!("execution on {} failed: {}", host, message)
            }
            DeployError::Io { message, .. } => message.clone(),
            DeployError::Report { message, .. } => message.clone(),
        }
    }
}

impl std::error::Error for DeployError {}

impl fmt::Display for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Set color mode based on TTY detection and NO_COLOR
        if !should_use_colors() {
            colored::control::set_override(false);
        }

        match self {
            DeployError::Config {
                message,
                suggestion,
            } => {
                writeln!(f, "{}: {}", "CONFIG ERROR".red().bold(), message)?;
                if let Some(suggestion) = suggestion {
                    writeln!(f)?;
                    writeln!(f, "{}: {}", "Hint".yellow().bold(), suggestion)?;
                }
                Ok(())
            }

            DeployError::HostSelection {
                message,
                suggestion,
            } => {
                writeln!(f, "{}: {}", "NO HOSTS".red().bold(), message)?;
                if let Some(suggestion) = suggestion {
                    writeln!(f)?;
                    writeln!(f, "{}: {}", "Hint".yellow().bold(), suggestion)?;
                }
                Ok(())
            }

            DeployError::Connection {
                host,
                message,
                suggestion,
            } => {
                writeln!(f, "{}: {}", "CONNECTION ERROR".red().bold(), message)?;
                writeln!(f, "  {} {}", "Host:".dimmed(), host.cyan())?;
                if let Some(suggestion) = suggestion {
                    writeln!(f)?;
                    writeln!(f, "{}: {}", "Hint".yellow().bold(), suggestion)?;
                }
                Ok(())
            }

            DeployError::Execution { host, message } => {
                writeln!(f, "{}: {}", "EXECUTION ERROR".red().bold(), message)?;
                writeln!(f, "  {} {}", "Host:".dimmed(), host.cyan())?;
                Ok(())
            }

            DeployError::Io { message, path } => {
                writeln!(f, "{}: {}", "I/O ERROR".red().bold(), message)?;
                if let Some(path) = path {
                    writeln!(f, "  {} {}", "Path:".dimmed(), path.display())?;
                }
                Ok(())
            }

            DeployError::Report { message, path } => {
                writeln!(f, "{}: {}", "REPORT ERROR".red().bold(), message)?;
                if let Some(path) = path {
                    writeln!(f, "  {} {}", "Path:".dimmed(), path.display())?;
                }
                Ok(())
            }
        }
    }
}
