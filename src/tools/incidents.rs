//! Incident directory listing and retrieval.
//!
//! Incidents live as one directory per date under the configured incidents
//! directory. Listings come from `ls -la`, file contents are read directly.

use super::{ensure_plain_token, parse_args, SharedRunner, ToolError, ToolHandler, ToolSettings};
use crate::mcp::protocol::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// One row of `ls -la` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LsEntry {
    pub name: String,
    pub permissions: String,
    pub size: String,
    pub date: String,
    pub is_directory: bool,
}

/// Split off the first whitespace-delimited column, returning it and the rest
fn next_column(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    if line.is_empty() {
        return None;
    }
    let end = line.find(char::is_whitespace).unwrap_or(line.len());
    Some((&line[..end], &line[end..]))
}

/// Parse a `ls -la` row; rows with fewer than nine columns (such as the
/// leading `total` line) yield `None`
///
/// The name is everything after the eighth column, spacing included. Symlink
/// rows drop their ` -> target` suffix.
fn parse_ls_line(line: &str) -> Option<LsEntry> {
    let mut columns = Vec::with_capacity(8);
    let mut rest = line;
    for _ in 0..8 {
        let (column, tail) = next_column(rest)?;
        columns.push(column);
        rest = tail;
    }

    let mut name = rest.trim_start();
    if name.is_empty() {
        return None;
    }
    let permissions = columns[0].to_string();
    if permissions.starts_with('l') {
        if let Some((link, _target)) = name.split_once(" -> ") {
            name = link;
        }
    }

    Some(LsEntry {
        name: name.to_string(),
        is_directory: permissions.starts_with('d'),
        permissions,
        size: columns[4].to_string(),
        date: columns[5..8].join(" "),
    })
}

/// Parse a full `ls -la` listing, dropping the given names
fn parse_ls_output(output: &str, skip: &[&str]) -> Vec<LsEntry> {
    output
        .lines()
        .filter_map(parse_ls_line)
        .filter(|entry| !skip.contains(&entry.name.as_str()))
        .collect()
}

/// `ls -la <dir>`; the path has to stay a single argv entry
fn list_command(dir: &Path) -> Result<String, ToolError> {
    let dir = dir.display().to_string();
    ensure_plain_token("incidents directory", &dir)?;
    Ok(format!("ls -la {}", dir))
}

async fn dir_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

/// Lists the incident directories
pub struct ListIncidentsTool {
    runner: SharedRunner,
    incidents_dir: PathBuf,
}

impl ListIncidentsTool {
    pub fn new(runner: SharedRunner, incidents_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            incidents_dir: incidents_dir.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for ListIncidentsTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "list_incidents".to_string(),
            description: format!(
                "List all incidents in the {} directory.",
                self.incidents_dir.display()
            ),
            input_schema: super::empty_object_schema(),
        }
    }

    async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
        if !dir_exists(&self.incidents_dir).await {
            return Ok(json!({
                "success": true,
                "incidents": [],
                "count": 0,
                "message": "Incidents directory does not exist",
            }));
        }

        let result = self
            .runner
            .run_default(&list_command(&self.incidents_dir)?)
            .await;

        if !result.success {
            return Ok(json!({
                "success": false,
                "error": result.stderr,
                "incidents": [],
            }));
        }

        let incidents = parse_ls_output(&result.stdout, &[".", "..", "README.txt"]);
        Ok(json!({
            "success": true,
            "count": incidents.len(),
            "incidents": incidents,
            "directory": self.incidents_dir.display().to_string(),
        }))
    }
}

fn default_file_pattern() -> String {
    "*".to_string()
}

#[derive(Debug, Deserialize)]
struct GetIncidentParams {
    date: String,
    #[serde(default = "default_file_pattern")]
    file_pattern: String,
}

/// A file inside an incident directory, with its content when small enough
#[derive(Debug, Serialize)]
struct IncidentFile {
    #[serde(flatten)]
    entry: LsEntry,
    full_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_truncated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_error: Option<String>,
}

/// Retrieves the files of a single incident
pub struct GetIncidentTool {
    runner: SharedRunner,
    incidents_dir: PathBuf,
    content_limit: usize,
    max_file_bytes: u64,
}

impl GetIncidentTool {
    pub fn new(runner: SharedRunner, settings: &ToolSettings) -> Self {
        Self {
            runner,
            incidents_dir: settings.incidents_dir.clone(),
            content_limit: settings.incident_content_limit,
            max_file_bytes: settings.incident_max_file_bytes,
        }
    }

    async fn load(&self, entry: LsEntry, incident_path: &Path) -> IncidentFile {
        let full_path = incident_path.join(&entry.name);
        let mut file = IncidentFile {
            full_path: full_path.display().to_string(),
            content: None,
            content_truncated: None,
            content_error: None,
            entry,
        };

        let small_enough = file
            .entry
            .size
            .parse::<u64>()
            .map(|size| size < self.max_file_bytes)
            .unwrap_or(false);
        if file.entry.is_directory || !small_enough {
            return file;
        }

        match tokio::fs::read(&full_path).await {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                let truncated = content.chars().count() > self.content_limit;
                file.content = Some(content.chars().take(self.content_limit).collect());
                file.content_truncated = Some(truncated);
            }
            Err(e) => file.content_error = Some(e.to_string()),
        }
        file
    }
}

/// The date must name a single directory directly under the incidents dir
fn validate_incident_date(date: &str) -> Result<(), ToolError> {
    ensure_plain_token("date", date)?;
    if date == "." || date == ".." || date.contains('/') || date.contains('\\') {
        return Err(ToolError::InvalidParameter(format!(
            "Invalid incident date: '{}'",
            date
        )));
    }
    Ok(())
}

fn compile_pattern(file_pattern: &str) -> Result<glob::Pattern, ToolError> {
    if file_pattern.contains('/') {
        return Err(ToolError::InvalidParameter(format!(
            "Invalid file pattern: '{}' must not contain '/'",
            file_pattern
        )));
    }
    glob::Pattern::new(file_pattern).map_err(|e| {
        ToolError::InvalidParameter(format!("Invalid file pattern '{}': {}", file_pattern, e))
    })
}

#[async_trait]
impl ToolHandler for GetIncidentTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_incident".to_string(),
            description: "Get the files of a specific incident directory, including the \
                content of small files."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "date": {"type": "string", "description": "The incident date/directory name"},
                    "file_pattern": {
                        "type": "string",
                        "description": "Optional glob to filter files (e.g. \"*.log\")",
                        "default": "*"
                    }
                },
                "required": ["date"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let params: GetIncidentParams = parse_args(arguments)?;
        validate_incident_date(&params.date)?;
        let pattern = compile_pattern(&params.file_pattern)?;

        let incident_path = self.incidents_dir.join(&params.date);
        let incident_path_str = incident_path.display().to_string();

        if !dir_exists(&incident_path).await {
            return Ok(json!({
                "success": false,
                "error": format!("Incident directory does not exist: {}", incident_path_str),
                "incident_path": incident_path_str,
            }));
        }

        let result = self.runner.run_default(&list_command(&incident_path)?).await;
        if !result.success {
            return Ok(json!({
                "success": false,
                "error": format!("Failed to list files: {}", result.stderr),
                "incident_path": incident_path_str,
            }));
        }

        let mut files = Vec::new();
        for entry in parse_ls_output(&result.stdout, &[".", ".."]) {
            if pattern.matches(&entry.name) {
                files.push(self.load(entry, &incident_path).await);
            }
        }

        Ok(json!({
            "success": true,
            "incident_date": params.date,
            "incident_path": incident_path_str,
            "count": files.len(),
            "files": files,
            "file_pattern": params.file_pattern,
        }))
    }
}
