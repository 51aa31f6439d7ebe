//! Command results and the failure taxonomy folded into them.

use super::timeout::ExecutionTimeout;
use serde::{Deserialize, Serialize};

/// Return code reported for failures that never produced a real exit code
///
/// This covers a child terminated by a signal: callers see -1, never a
/// negative signal number, so -1 alone does not tell a timeout from a kill.
pub const INTERNAL_FAILURE_CODE: i32 = -1;

/// Return code reported when the denylist refuses a command
pub const BLOCKED_CODE: i32 = 1;

/// Number of stdout characters quoted back when JSON decoding fails
pub const JSON_PREVIEW_CHARS: usize = 200;

/// Reasons an execution did not run to a normal exit
///
/// The `Display` text of each variant is exactly what ends up in
/// [`CommandResult::stderr`] (or the JSON error string).
#[derive(Debug, thiserror::Error)]
pub enum ExecutionFailure {
    #[error("Command '{0}' is blocked for security reasons")]
    PolicyBlocked(String),

    #[error("Command timed out after {0} seconds")]
    Timeout(ExecutionTimeout),

    #[error("Error executing command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Invalid JSON output: {0}...")]
    InvalidJson(String),
}

impl ExecutionFailure {
    /// Return code recorded for this failure
    pub fn return_code(&self) -> i32 {
        match self {
            Self::PolicyBlocked(_) => BLOCKED_CODE,
            _ => INTERNAL_FAILURE_CODE,
        }
    }

    /// Build the JSON decode failure for a given stdout
    pub fn invalid_json(stdout: &str) -> Self {
        Self::InvalidJson(stdout.chars().take(JSON_PREVIEW_CHARS).collect())
    }
}

/// Result of a command execution
///
/// Every execution path, including a denylist refusal, produces one of these.
/// `success` is only ever true together with `return_code == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether the process exited with code 0
    pub success: bool,

    /// Standard output, lossily decoded as UTF-8
    pub stdout: String,

    /// Standard error, lossily decoded as UTF-8
    pub stderr: String,

    /// Process exit code, or -1 when there is none
    pub return_code: i32,

    /// The command exactly as requested
    pub command: String,
}

impl CommandResult {
    /// Create a result for a process that ran to completion
    ///
    /// A missing exit code (process killed by a signal) is reported as -1.
    pub fn completed(
        command: impl Into<String>,
        exit_code: Option<i32>,
        stdout: &[u8],
        stderr: &[u8],
    ) -> Self {
        let return_code = exit_code.unwrap_or(INTERNAL_FAILURE_CODE);
        Self {
            success: return_code == 0,
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
            return_code,
            command: command.into(),
        }
    }

    /// Create a result for an execution that failed before a normal exit
    pub fn failed(command: impl Into<String>, failure: &ExecutionFailure) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: failure.to_string(),
            return_code: failure.return_code(),
            command: command.into(),
        }
    }

    /// Create the denylist refusal result
    pub fn blocked(command: &str) -> Self {
        Self::failed(command, &ExecutionFailure::PolicyBlocked(command.to_string()))
    }

    /// The text tool handlers report back: stdout on success, stderr otherwise
    pub fn output(&self) -> &str {
        if self.success {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        if self.success {
            format!(
                "Success (return code: {}, {} bytes output)",
                self.return_code,
                self.stdout.len()
            )
        } else {
            format!(
                "Failed (return code: {}, {} bytes output)",
                self.return_code,
                self.stdout.len() + self.stderr.len()
            )
        }
    }
}

/// Decode a result's stdout as JSON
///
/// A failed result yields its stderr; undecodable stdout yields an
/// `Invalid JSON output: ...` message quoting its first 200 characters.
pub fn parse_json_output(result: &CommandResult) -> Result<serde_json::Value, String> {
    if !result.success {
        return Err(result.stderr.clone());
    }

    serde_json::from_str(&result.stdout).map_err(|e| {
        tracing::error!("Failed to parse JSON from command output: {}", e);
        ExecutionFailure::invalid_json(&result.stdout).to_string()
    })
}
