// Hypernode MCP Server - Main Entry Point
//
// Runs the MCP server on stdio, or a single command / tool listing from the
// command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hypernode_mcp::config::Config;
use hypernode_mcp::exec::{parse_json_output, CommandExecutor, ExecutionTimeout};
use hypernode_mcp::mcp::McpServer;
use hypernode_mcp::tools::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;

/// Hypernode MCP: Hypernode administration tools for MCP agents
#[derive(Parser, Debug)]
#[command(name = "hypernode-mcp")]
#[command(version)]
#[command(about = "MCP server for Hypernode administration commands", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (default: ~/.config/hypernode-mcp/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve MCP over stdin/stdout (default)
    Serve,
    /// Run a single command through the guarded executor
    Exec {
        /// The command line to run
        command: String,

        /// Timeout in seconds (default: from config)
        #[arg(long)]
        timeout: Option<u64>,

        /// Working directory
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Decode stdout as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the tool definitions as JSON
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    hypernode_mcp::logging::init(&config.logging, args.verbose)?;

    let executor = Arc::new(CommandExecutor::with_config(config.executor_config()));

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let registry = ToolRegistry::with_default_tools(executor, config.tool_settings());
            let server = McpServer::new(registry, config.server.name.clone());
            server
                .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await?;
        }
        Commands::Exec {
            command,
            timeout,
            cwd,
            json,
        } => {
            let timeout = timeout
                .map(ExecutionTimeout::from_secs)
                .unwrap_or(executor.config().timeout);
            let success = exec(&executor, &command, timeout, cwd, json).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Tools => {
            let registry = ToolRegistry::with_default_tools(executor, config.tool_settings());
            let definitions = serde_json::to_string_pretty(&registry.definitions())
                .context("Failed to serialize tool definitions")?;
            println!("{}", definitions);
        }
    }

    Ok(())
}

/// Run one command and print its outcome; returns whether it succeeded
async fn exec(
    executor: &CommandExecutor,
    command: &str,
    timeout: ExecutionTimeout,
    cwd: Option<PathBuf>,
    json: bool,
) -> Result<bool> {
    info!("Running one-off command: {}", command);

    let result = executor.execute_with(command, timeout, cwd.as_deref()).await;
    let (output, success) = if json {
        match parse_json_output(&result) {
            Ok(value) => (value, true),
            Err(error) => (serde_json::json!({ "error": error }), false),
        }
    } else {
        let success = result.success;
        let value = serde_json::to_value(&result).context("Failed to serialize result")?;
        (value, success)
    };

    let output = serde_json::to_string_pretty(&output).context("Failed to serialize output")?;
    println!("{}", output);
    Ok(success)
}
