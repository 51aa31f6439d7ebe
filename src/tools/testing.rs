//! Scripted command runner for handler tests.

use crate::exec::{CommandResult, CommandRunner, ExecutionTimeout};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub command: String,
    pub timeout: ExecutionTimeout,
    pub working_dir: Option<PathBuf>,
}

/// Returns queued results in order and records every command it is given
///
/// Once the queue is empty, every call succeeds with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<Vec<(i32, String, String)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn succeeding(stdout: &str) -> Arc<Self> {
        let runner = Self::new();
        runner.push(0, stdout, "");
        runner
    }

    pub fn failing(return_code: i32, stderr: &str) -> Arc<Self> {
        let runner = Self::new();
        runner.push(return_code, "", stderr);
        runner
    }

    pub fn push(&self, return_code: i32, stdout: &str, stderr: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((return_code, stdout.to_string(), stderr.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        command: &str,
        timeout: ExecutionTimeout,
        working_dir: Option<&Path>,
    ) -> CommandResult {
        self.calls.lock().unwrap().push(RecordedCall {
            command: command.to_string(),
            timeout,
            working_dir: working_dir.map(Path::to_path_buf),
        });

        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                None
            } else {
                Some(responses.remove(0))
            }
        };

        match next {
            Some((code, stdout, stderr)) => {
                CommandResult::completed(command, Some(code), stdout.as_bytes(), stderr.as_bytes())
            }
            None => CommandResult::completed(command, Some(0), b"", b""),
        }
    }
}
