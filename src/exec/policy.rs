//! Command Policy
//!
//! This module decides whether a command string may run at all, and how it
//! should be invoked when it does.
//!
//! # Denylist
//!
//! The denylist check is intentionally shallow: only the first
//! whitespace-delimited token is compared (case-insensitively) against a fixed
//! set of destructive programs. It stops trivially destructive direct
//! invocations such as `rm -rf /tmp/x`, but it does **not** look past a pipe,
//! a `;`, a subshell or an alias, so `echo x | rm -rf /` passes the check.
//! Treat it as a weak guard, not a sandbox.
//!
//! # Invocation strategy
//!
//! Commands that contain shell syntax (pipes, redirects, substitution,
//! chaining) are handed to a shell so they behave as written. Everything else
//! is split on whitespace and exec'd directly, bypassing the shell.

/// Programs that are refused when they appear as the first token of a command
pub const DENYLIST: [&str; 13] = [
    "rm", "rmdir", "del", "format", "mkfs", "dd", "shred", "kill", "killall", "pkill", "halt",
    "shutdown", "reboot",
];

/// Characters whose presence forces shell interpretation
///
/// `>>`, `<<`, `&&` and `||` are covered by their single-character prefixes.
pub const SHELL_METACHARACTERS: [char; 9] = ['|', '&', ';', '>', '<', '(', ')', '$', '`'];

/// How a command string is turned into a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStrategy {
    /// Split on whitespace and exec the argv directly
    Direct,
    /// Pass the whole string to `sh -c`
    Shell,
}

impl InvocationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Shell => "shell",
        }
    }
}

/// Check whether a command is refused by the denylist
///
/// Only the program name (first whitespace-delimited token) is inspected.
/// Empty or whitespace-only commands are never dangerous.
///
/// # Example
///
/// ```
/// use hypernode_mcp::exec::is_dangerous;
///
/// assert!(is_dangerous("rm -rf /tmp/x"));
/// assert!(is_dangerous("  ReBoot now"));
/// assert!(!is_dangerous("ls -la"));
/// // Not detected: the denylisted program is not the first token.
/// assert!(!is_dangerous("echo x | rm -rf /"));
/// ```
pub fn is_dangerous(command: &str) -> bool {
    match command.split_whitespace().next() {
        Some(program) => {
            let program = program.to_lowercase();
            DENYLIST.contains(&program.as_str())
        }
        None => false,
    }
}

/// Check whether a command needs a shell to behave as written
pub fn requires_shell(command: &str) -> bool {
    command.contains(&SHELL_METACHARACTERS[..])
}

/// Pick the invocation strategy for a command string
pub fn select_strategy(command: &str) -> InvocationStrategy {
    if requires_shell(command) {
        InvocationStrategy::Shell
    } else {
        InvocationStrategy::Direct
    }
}
