//! Process creation and cleanup.
//!
//! A command string becomes an [`Invocation`]: either an argv exec'd directly
//! or a string passed to `sh -c`. A [`Spawner`] turns the invocation into a
//! running child with both output streams piped.

use super::policy::{select_strategy, InvocationStrategy};
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// A command ready to be spawned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Program and arguments, no shell involved
    Direct { program: String, args: Vec<String> },
    /// Full command line interpreted by the system shell
    Shell(String),
}

impl Invocation {
    /// Build the invocation for a command string
    ///
    /// # Example
    ///
    /// ```
    /// use hypernode_mcp::exec::Invocation;
    ///
    /// assert_eq!(
    ///     Invocation::from_command("echo hello world"),
    ///     Invocation::Direct {
    ///         program: "echo".to_string(),
    ///         args: vec!["hello".to_string(), "world".to_string()],
    ///     }
    /// );
    /// assert_eq!(
    ///     Invocation::from_command("ls | wc -l"),
    ///     Invocation::Shell("ls | wc -l".to_string())
    /// );
    /// ```
    pub fn from_command(command: &str) -> Self {
        match select_strategy(command) {
            InvocationStrategy::Shell => Self::Shell(command.to_string()),
            InvocationStrategy::Direct => {
                let mut parts = command.split_whitespace().map(str::to_string);
                let program = parts.next().unwrap_or_default();
                Self::Direct {
                    program,
                    args: parts.collect(),
                }
            }
        }
    }

    pub fn strategy(&self) -> InvocationStrategy {
        match self {
            Self::Direct { .. } => InvocationStrategy::Direct,
            Self::Shell(_) => InvocationStrategy::Shell,
        }
    }

    /// Build the tokio command for this invocation
    ///
    /// Fails with `InvalidInput` for an empty direct invocation.
    pub fn to_command(&self) -> io::Result<Command> {
        match self {
            Self::Direct { program, args } => {
                if program.is_empty() {
                    return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
                }
                let mut command = Command::new(program);
                command.args(args);
                Ok(command)
            }
            Self::Shell(line) => Ok(shell_command(line)),
        }
    }
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("/bin/sh");
    command.arg("-c").arg(line);
    command
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(line);
    command
}

/// Creates child processes for invocations
///
/// The executor only talks to this trait, so tests can count or refuse
/// spawns without touching the OS.
pub trait Spawner: Send + Sync {
    /// Start the invocation with stdout and stderr piped
    fn spawn(&self, invocation: &Invocation, working_dir: Option<&Path>) -> io::Result<Child>;
}

/// Spawns real OS processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpawner;

impl Spawner for SystemSpawner {
    fn spawn(&self, invocation: &Invocation, working_dir: Option<&Path>) -> io::Result<Child> {
        let mut command = invocation.to_command()?;

        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // New process group; the timeout path kills the whole group
        #[cfg(unix)]
        command.process_group(0);

        command.spawn()
    }
}

/// Kill the child's process group, then the child itself, and reap it
///
/// Best-effort: errors are logged, never returned.
pub async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        if let Err(e) = kill_process_group(pid) {
            tracing::debug!("Failed to kill process group {}: {}", pid, e);
        }
    }

    if let Err(e) = child.start_kill() {
        tracing::debug!("Failed to kill child process: {}", e);
    }

    if let Err(e) = child.wait().await {
        tracing::warn!("Failed to reap child process: {}", e);
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) -> io::Result<()> {
    let result = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) -> io::Result<()> {
    Ok(())
}
