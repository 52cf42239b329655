// Deployment recap rendering

use std::io::IsTerminal;

use colored::*;

use super::results::{DeploymentResult, ExecutionStatus};

fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::stdout().is_terminal()
}

/// Render the per-host recap plus aggregate totals as display text
pub fn render_summary(result: &DeploymentResult) -> String {
    if !should_use_colors() {
        colored::control::set_override(false);
    }

    let mut out = String::new();

    out.push_str(&format!("{}\n", "DEPLOYMENT RECAP".green().bold()));
    out.push_str(&format!("{}\n", "─".repeat(60).dimmed()));

    for host in &result.host_results {
        let status = match host.status {
            ExecutionStatus::Success => "success".green(),
            ExecutionStatus::Failed => "failed".red().bold(),
            ExecutionStatus::Timeout => "timeout".red(),
            ExecutionStatus::Skipped => "skipped".cyan(),
            other => other.to_string().normal(),
        };

        out.push_str(&format!(
            "{:<30} {:<10} {:>7.2}s",
            host.hostname.white().bold(),
            status,
            host.duration.as_secs_f64()
        ));

        if let Some(err) = host.first_error() {
            out.push_str(&format!("   {}", err.message.dimmed()));
        }
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&format!(
        "hosts={}    {}    {}    {}    {}\n",
        result.total_hosts,
        format!("success={}", result.successful_hosts).green(),
        if result.failed_hosts > 0 {
            format!("failed={}", result.failed_hosts).red().bold()
        } else {
            format!("failed={}", result.failed_hosts).normal()
        },
        format!("skipped={}", result.skipped_hosts).cyan(),
        if result.timeout_hosts > 0 {
            format!("timeout={}", result.timeout_hosts).red()
        } else {
            format!("timeout={}", result.timeout_hosts).normal()
        },
    ));
    out.push_str(&format!(
        "Success rate: {:.1}%    total time: {:.2}s\n",
        result.success_rate,
        result.total_duration.as_secs_f64()
    ));

    out
}
