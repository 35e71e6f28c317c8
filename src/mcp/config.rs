//! MCP server configuration file handling.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Default retry bound for tool calls on a flaky connection.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The `mcpServers` configuration file (spec: `mcp.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct McpConfig {
    #[serde(rename = "mcpServers", default)]
    pub servers: HashMap<String, McpServerConfig>,
}

/// One configured MCP server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct McpServerConfig {
    /// `"stdio"` or `"sse"`; anything else falls back to stdio.
    #[serde(rename = "type", default)]
    pub transport: String,
    /// Executable for stdio servers.
    #[serde(default)]
    pub command: String,
    /// Arguments for stdio servers.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment on top of the inherited one (stdio only).
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Endpoint URL for SSE servers.
    #[serde(default)]
    pub url: String,
    /// Extra HTTP headers for SSE servers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Per-server retry bound; defaults to [`DEFAULT_MAX_RETRIES`].
    #[serde(rename = "maxRetries", default)]
    pub max_retries: Option<u32>,
}

impl McpServerConfig {
    pub fn is_sse(&self) -> bool {
        self.transport == "sse"
    }

    pub fn retry_bound(&self) -> u32 {
        match self.max_retries {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_MAX_RETRIES,
        }
    }
}

impl McpConfig {
    /// Load an `mcpServers` configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_parses_stdio_and_sse_servers() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("mcp.json");
        std::fs::write(
            &path,
            r#"{
                "mcpServers": {
                    "local": {
                        "type": "stdio",
                        "command": "node",
                        "args": ["server.js"],
                        "env": { "DEBUG": "1" }
                    },
                    "remote": {
                        "type": "sse",
                        "url": "https://mcp.example.com/sse",
                        "headers": { "Authorization": "Bearer token" },
                        "maxRetries": 5
                    }
                }
            }"#,
        )
        .expect("config should be written");

        let config = McpConfig::load(&path).expect("config should load");
        assert_eq!(config.servers.len(), 2);

        let local = &config.servers["local"];
        assert!(!local.is_sse());
        assert_eq!(local.command, "node");
        assert_eq!(local.args, vec!["server.js"]);
        assert_eq!(local.env["DEBUG"], "1");
        assert_eq!(local.retry_bound(), DEFAULT_MAX_RETRIES);

        let remote = &config.servers["remote"];
        assert!(remote.is_sse());
        assert_eq!(remote.url, "https://mcp.example.com/sse");
        assert_eq!(remote.headers["Authorization"], "Bearer token");
        assert_eq!(remote.retry_bound(), 5);
    }

    #[test]
    fn an_omitted_type_defaults_to_stdio() {
        let config: McpConfig = serde_json::from_str(
            r#"{ "mcpServers": { "plain": { "command": "mcp-server" } } }"#,
        )
        .expect("config should parse");
        assert!(!config.servers["plain"].is_sse());
    }

    #[test]
    fn a_zero_retry_bound_falls_back_to_the_default() {
        let server = McpServerConfig {
            max_retries: Some(0),
            ..McpServerConfig::default()
        };
        assert_eq!(server.retry_bound(), DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn load_fails_on_malformed_json() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("mcp.json");
        std::fs::write(&path, "{ not json").expect("config should be written");
        assert!(McpConfig::load(&path).is_err());
    }
}
