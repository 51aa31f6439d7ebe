//! Command Execution Subsystem
//!
//! This module turns command strings into subprocess runs for the tool
//! handlers. It is the one place where commands reach the operating system.
//!
//! # Safety Layer
//!
//! - **Denylist**: commands whose program name is destructive (`rm`, `dd`,
//!   `reboot`, ...) are refused without spawning anything
//! - **Direct exec by default**: commands without shell syntax are split on
//!   whitespace and exec'd, never interpreted by a shell
//! - **Timeout Enforcement**: every execution is bounded; on expiry the
//!   child's process group is killed and reaped
//! - **No thrown errors**: blocked, timed-out and unspawnable commands all
//!   come back as a [`CommandResult`] with `success == false`
//!
//! # Architecture
//!
//! - `policy.rs`: denylist and invocation strategy selection
//! - `process.rs`: invocation building, spawning and termination
//! - `timeout.rs`: timeout configuration
//! - `result.rs`: result record and failure taxonomy
//! - `executor.rs`: the executor tying these together
//!
//! # Example
//!
//! ```no_run
//! use hypernode_mcp::exec::{CommandExecutor, ExecutionTimeout};
//!
//! #[tokio::main]
//! async fn main() {
//!     let executor = CommandExecutor::new();
//!
//!     let result = executor
//!         .execute_with("ls -la /tmp", ExecutionTimeout::from_secs(5), None)
//!         .await;
//!     println!("Return code: {}", result.return_code);
//!     println!("Stdout: {}", result.stdout);
//! }
//! ```

mod executor;
pub mod policy;
mod process;
mod result;
mod timeout;

pub use executor::{CommandExecutor, CommandRunner, ExecutorConfig};
pub use policy::{is_dangerous, select_strategy, InvocationStrategy, DENYLIST};
pub use process::{Invocation, Spawner, SystemSpawner};
pub use result::{parse_json_output, CommandResult, ExecutionFailure};
pub use timeout::{ExecutionTimeout, DEFAULT_TIMEOUT_SECS};
