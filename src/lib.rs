//! Hypernode MCP Server Library
//!
//! This library provides the guarded command executor, the Hypernode tool
//! handlers built on it, and the MCP server that exposes them over stdio.

pub mod config;
pub mod exec;
pub mod logging;
pub mod mcp;
pub mod tools;
