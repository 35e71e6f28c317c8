//! Error types for skillrunner.

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for all skillrunner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("no valid skills found under {0}")]
    NoSkillsFound(PathBuf),

    #[error("skill '{name}' not found; available skills: {}", available.join(", "))]
    SkillNotFound { name: String, available: Vec<String> },

    #[error("skill directory not found: {0}")]
    SkillDirectoryNotFound(PathBuf),

    #[error("neither SKILL.md nor skill.md found in {0}")]
    DescriptorMissing(PathBuf),

    #[error("no YAML frontmatter found in {0}")]
    MissingFrontmatter(PathBuf),

    #[error("failed to parse SKILL.md frontmatter in {path}: {source}")]
    InvalidFrontmatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("bad arguments for tool {tool_name}: {message}")]
    BadArguments { tool_name: String, message: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool execution failed for {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("template error: {0}")]
    Template(String),

    #[error("invalid tool name format: {0}")]
    BadToolName(String),

    #[error("MCP server '{0}' not found")]
    UnknownServer(String),

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("failed to call tool on server '{server}' after {attempts} retries")]
    CallFailedAfterRetries { server: String, attempts: u32 },

    #[error("exceeded maximum tool call iterations ({0})")]
    IterationLimitExceeded(usize),
}

impl RunnerError {
    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RunnerError>;
