// JSON report export and re-import

use std::fs;
use std::path::Path;

use super::errors::DeployError;
use super::results::DeploymentResult;

/// Serialize the full aggregate to `path` as pretty JSON.
///
/// Field order follows the struct declaration and hosts keep their filtered
/// order, so identical results always produce identical bytes.
pub fn write_report(result: &DeploymentResult, path: &Path) -> Result<(), DeployError> {
    let mut json = serde_json::to_string_pretty(result).map_err(|e| DeployError::Report {
        message: format!("failed to serialize report: {}", e),
        path: Some(path.to_path_buf()),
    })?;
    json.push('\n');

    fs::write(path, json).map_err(|e| DeployError::Io {
        message: format!("failed to write report: {}", e),
        path: Some(path.to_path_buf()),
    })
}

/// Re-parse a report written by [`write_report`]
pub fn read_report(path: &Path) -> Result<DeploymentResult, DeployError> {
    let content = fs::read_to_string(path).map_err(|e| DeployError::Io {
        message: format!("failed to read report: {}", e),
        path: Some(path.to_path_buf()),
    })?;

    serde_json::from_str(&content).map_err(|e| DeployError::Report {
        message: format!("failed to parse report: {}", e),
        path: Some(path.to_path_buf()),
    })
}
