//! Command Executor
//!
//! This module runs command strings as subprocesses. It applies the denylist,
//! picks an invocation strategy, enforces the timeout and folds every failure
//! into a [`CommandResult`].

use super::policy::is_dangerous;
use super::process::{terminate, Invocation, Spawner, SystemSpawner};
use super::result::{parse_json_output, CommandResult, ExecutionFailure};
use super::timeout::ExecutionTimeout;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tracing::{debug, error, info, warn};

/// Configuration for command execution
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Timeout used when the caller does not pass one (default: 30 seconds)
    pub timeout: ExecutionTimeout,

    /// Working directory used when the caller does not pass one
    /// (default: the server's own)
    pub working_dir: Option<PathBuf>,
}

impl ExecutorConfig {
    /// Create a new executor config with custom timeout
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            timeout: ExecutionTimeout::from_secs(timeout_secs),
            ..Default::default()
        }
    }

    /// Create a new executor config with custom working directory
    pub fn with_working_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
            ..Default::default()
        }
    }
}

/// Anything that can run a command string and report a [`CommandResult`]
///
/// Tool handlers depend on this trait rather than on [`CommandExecutor`], so
/// they can be exercised against scripted results.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command with an explicit timeout and optional working directory
    async fn run(
        &self,
        command: &str,
        timeout: ExecutionTimeout,
        working_dir: Option<&Path>,
    ) -> CommandResult;

    /// Timeout applied by [`CommandRunner::run_default`]
    fn default_timeout(&self) -> ExecutionTimeout {
        ExecutionTimeout::default()
    }

    /// Run a command with the default timeout
    async fn run_default(&self, command: &str) -> CommandResult {
        self.run(command, self.default_timeout(), None).await
    }

    /// Run a command and decode its stdout as JSON
    async fn run_json(
        &self,
        command: &str,
        timeout: ExecutionTimeout,
    ) -> Result<serde_json::Value, String> {
        let result = self.run(command, timeout, None).await;
        parse_json_output(&result)
    }
}

/// Guarded subprocess executor
///
/// # Security
///
/// 1. Commands whose program name is on the denylist are refused without
///    spawning anything (see [`crate::exec::policy`] for the limits of
///    that check)
/// 2. Commands without shell syntax are exec'd directly, never through a shell
/// 3. Every execution is bounded by a timeout; on expiry the whole process
///    group is killed
///
/// Nothing is returned as an error: every failure is encoded in the result.
///
/// # Example
///
/// ```no_run
/// use hypernode_mcp::exec::CommandExecutor;
///
/// #[tokio::main]
/// async fn main() {
///     let executor = CommandExecutor::new();
///
///     let result = executor.execute("echo hello world").await;
///     assert!(result.success);
///     assert_eq!(result.stdout, "hello world\n");
///
///     let blocked = executor.execute("rm -rf /tmp/x").await;
///     assert_eq!(blocked.return_code, 1);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CommandExecutor<S = SystemSpawner> {
    /// Process factory
    spawner: S,

    /// Executor configuration
    config: ExecutorConfig,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    /// Create a new executor with default configuration
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    /// Create a new executor with custom configuration
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self {
            spawner: SystemSpawner,
            config,
        }
    }
}

impl<S: Spawner> CommandExecutor<S> {
    /// Create an executor that creates processes through a custom spawner
    pub fn with_spawner(spawner: S, config: ExecutorConfig) -> Self {
        Self { spawner, config }
    }

    /// Get a reference to the config
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Get a reference to the spawner
    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Execute a command with the configured timeout and working directory
    pub async fn execute(&self, command: &str) -> CommandResult {
        self.execute_with(command, self.config.timeout, self.config.working_dir.as_deref())
            .await
    }

    /// Execute a command with an explicit timeout and working directory
    ///
    /// `working_dir = None` falls back to the configured directory, and then
    /// to the current process's own.
    pub async fn execute_with(
        &self,
        command: &str,
        timeout: ExecutionTimeout,
        working_dir: Option<&Path>,
    ) -> CommandResult {
        info!("Executing command: {}", command);

        if is_dangerous(command) {
            warn!("Command blocked by denylist: {}", command);
            return CommandResult::blocked(command);
        }

        let working_dir = working_dir.or(self.config.working_dir.as_deref());
        let invocation = Invocation::from_command(command);
        debug!(
            strategy = invocation.strategy().as_str(),
            "Selected invocation strategy"
        );

        match self.run_invocation(&invocation, timeout, working_dir).await {
            Ok((status, stdout, stderr)) => {
                let result = CommandResult::completed(command, status.code(), &stdout, &stderr);
                if result.success {
                    info!("Command executed successfully: {}", command);
                } else {
                    warn!(
                        "Command failed: {}, return code: {}",
                        command, result.return_code
                    );
                }
                result
            }
            Err(failure) => {
                match &failure {
                    ExecutionFailure::Timeout(_) => error!("Command timed out: {}", command),
                    _ => error!("Error executing command '{}': {}", command, failure),
                }
                CommandResult::failed(command, &failure)
            }
        }
    }

    /// Execute a command and decode its stdout as JSON
    ///
    /// `Ok(value)` when the command succeeded and printed valid JSON.
    /// `Err(text)` carries either the command's stderr or an
    /// `Invalid JSON output: ...` message.
    pub async fn execute_json(
        &self,
        command: &str,
        timeout: ExecutionTimeout,
    ) -> Result<serde_json::Value, String> {
        let result = self.execute_with(command, timeout, None).await;
        parse_json_output(&result)
    }

    /// Spawn the invocation and collect its exit status and output
    async fn run_invocation(
        &self,
        invocation: &Invocation,
        timeout: ExecutionTimeout,
        working_dir: Option<&Path>,
    ) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), ExecutionFailure> {
        let mut child = self.spawner.spawn(invocation, working_dir)?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = timeout
            .run(collect_output(&mut child, stdout, stderr))
            .await;

        match outcome {
            Some(collected) => Ok(collected?),
            None => {
                terminate(&mut child).await;
                Err(ExecutionFailure::Timeout(timeout))
            }
        }
    }
}

#[async_trait]
impl<S: Spawner> CommandRunner for CommandExecutor<S> {
    async fn run(
        &self,
        command: &str,
        timeout: ExecutionTimeout,
        working_dir: Option<&Path>,
    ) -> CommandResult {
        self.execute_with(command, timeout, working_dir).await
    }

    fn default_timeout(&self) -> ExecutionTimeout {
        self.config.timeout
    }
}

/// Wait for exit while draining both pipes
///
/// Both streams are read concurrently with the wait, so a child that fills a
/// pipe buffer cannot deadlock against us.
async fn collect_output<O, E>(
    child: &mut Child,
    stdout: Option<O>,
    stderr: Option<E>,
) -> io::Result<(ExitStatus, Vec<u8>, Vec<u8>)>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    tokio::try_join!(child.wait(), read_stream(stdout), read_stream(stderr))
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
