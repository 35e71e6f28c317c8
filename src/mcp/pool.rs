//! Multi-server MCP session pool with retry and reconnection.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, ClientInfo, Content, Implementation, ProtocolVersion,
};
use rmcp::service::{DynService, RoleClient, RunningService, ServiceError, ServiceExt};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use tokio::process::Command;
use tracing::{info, warn};

use super::config::{McpConfig, McpServerConfig};
use crate::error::{Result, RunnerError};
use crate::tools::ToolDefinition;

pub type DynClientService = Box<dyn DynService<RoleClient>>;
pub type McpRunningService = RunningService<RoleClient, DynClientService>;

/// Manages one open session per configured MCP server.
///
/// Construction connects to every server; individual failures are logged
/// and that server's tools are simply absent for the run. Reconnection
/// always builds a fresh session from the original server config.
pub struct McpClientPool {
    sessions: HashMap<String, McpRunningService>,
    config: McpConfig,
}

fn client_info() -> ClientInfo {
    ClientInfo {
        protocol_version: ProtocolVersion::LATEST,
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
            ..Implementation::default()
        },
        ..Default::default()
    }
}

async fn connect(name: &str, server: &McpServerConfig) -> Result<McpRunningService> {
    if server.is_sse() {
        let config = StreamableHttpClientTransportConfig::with_uri(server.url.clone());
        let mut client_builder = reqwest::ClientBuilder::new();
        if !server.headers.is_empty() {
            let mut headers = reqwest::header::HeaderMap::new();
            for (key, value) in &server.headers {
                let header_name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                    .map_err(|error| {
                        RunnerError::Configuration(format!(
                            "invalid header name '{key}' for MCP server '{name}': {error}"
                        ))
                    })?;
                let header_value =
                    reqwest::header::HeaderValue::from_str(value).map_err(|error| {
                        RunnerError::Configuration(format!(
                            "invalid header value for '{key}' on MCP server '{name}': {error}"
                        ))
                    })?;
                headers.insert(header_name, header_value);
            }
            client_builder = client_builder.default_headers(headers);
        }
        let client = client_builder.build().map_err(|error| {
            RunnerError::Mcp(format!("failed to build HTTP client for server '{name}': {error}"))
        })?;
        let transport = StreamableHttpClientTransport::with_client(client, config);
        client_info()
            .into_dyn()
            .serve(transport)
            .await
            .map_err(|error| {
                RunnerError::Mcp(format!("failed to connect to server '{name}': {error}"))
            })
    } else {
        let mut command = Command::new(&server.command);
        command
            .args(&server.args)
            .envs(&server.env)
            .stderr(Stdio::inherit());
        let transport = TokioChildProcess::new(command).map_err(|error| {
            RunnerError::Mcp(format!("failed to spawn server '{name}': {error}"))
        })?;
        client_info()
            .into_dyn()
            .serve(transport)
            .await
            .map_err(|error| {
                RunnerError::Mcp(format!("failed to connect to server '{name}': {error}"))
            })
    }
}

impl McpClientPool {
    /// Connect to every configured server, skipping failures.
    pub async fn new(config: McpConfig) -> Self {
        let mut sessions = HashMap::new();
        for (name, server) in &config.servers {
            match connect(name, server).await {
                Ok(session) => {
                    info!(server = %name, "mcp session established");
                    sessions.insert(name.clone(), session);
                }
                Err(error) => {
                    warn!(server = %name, %error, "skipping unreachable mcp server");
                }
            }
        }
        Self { sessions, config }
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// List every remote tool, name-spaced `<server>__<tool>`.
    ///
    /// Servers iterate in sorted name order so catalogs are deterministic;
    /// listing failures are logged and that server is skipped.
    pub async fn get_tools(&self) -> Vec<ToolDefinition> {
        let mut server_names: Vec<&String> = self.sessions.keys().collect();
        server_names.sort();

        let mut tools = Vec::new();
        for server_name in server_names {
            let session = &self.sessions[server_name];
            let listed = match session.list_all_tools().await {
                Ok(listed) => listed,
                Err(error) => {
                    warn!(server = %server_name, %error, "failed to list mcp tools");
                    continue;
                }
            };
            for tool in listed {
                tools.push(ToolDefinition::new(
                    format!("{server_name}__{}", tool.name),
                    tool.description.map(|d| d.to_string()).unwrap_or_default(),
                    serde_json::Value::Object((*tool.input_schema).clone()),
                ));
            }
        }
        tools
    }

    /// Invoke a name-spaced remote tool, reconnecting on connection errors.
    pub async fn call_tool(&mut self, name: &str, arguments: serde_json::Value) -> Result<String> {
        let (server_name, tool_name) = parse_tool_name(name)?;
        let server = self
            .config
            .servers
            .get(server_name)
            .cloned()
            .ok_or_else(|| RunnerError::UnknownServer(server_name.to_string()))?;
        let arguments = coerce_arguments(name, arguments)?;
        let max_retries = server.retry_bound();

        for attempt in 0..max_retries {
            let outcome = {
                let session = self.sessions.get(server_name).ok_or_else(|| {
                    RunnerError::Mcp(format!("no open session for server '{server_name}'"))
                })?;
                session
                    .call_tool(CallToolRequestParam {
                        name: tool_name.to_string().into(),
                        arguments: arguments.clone(),
                    })
                    .await
            };

            match outcome {
                Ok(result) => return render_call_result(name, result),
                Err(error) if is_connection_error(&error) => {
                    warn!(
                        server = %server_name,
                        attempt = attempt + 1,
                        max_retries,
                        %error,
                        "mcp connection error, reconnecting"
                    );
                    if let Some(session) = self.sessions.remove(server_name) {
                        let _ = session.cancel().await;
                    }
                    if attempt + 1 < max_retries {
                        tokio::time::sleep(Duration::from_secs(u64::from(attempt) + 1)).await;
                        match connect(server_name, &server).await {
                            Ok(session) => {
                                info!(server = %server_name, "mcp reconnection successful");
                                self.sessions.insert(server_name.to_string(), session);
                            }
                            Err(reconnect_error) => {
                                warn!(server = %server_name, error = %reconnect_error, "mcp reconnection failed");
                            }
                        }
                    }
                }
                Err(error) => {
                    return Err(RunnerError::Mcp(format!(
                        "failed to call tool '{tool_name}' on server '{server_name}': {error}"
                    )));
                }
            }
        }

        Err(RunnerError::CallFailedAfterRetries {
            server: server_name.to_string(),
            attempts: max_retries,
        })
    }

    /// Close every session, aggregating shutdown errors.
    pub async fn shutdown(mut self) -> Result<()> {
        let mut failures = Vec::new();
        for (name, session) in self.sessions.drain() {
            if let Err(error) = session.cancel().await {
                failures.push(format!("{name}: {error}"));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(RunnerError::Mcp(format!(
                "failed to close some connections: {}",
                failures.join("; ")
            )))
        }
    }
}

/// Split `server__tool` into its two parts.
fn parse_tool_name(name: &str) -> Result<(&str, &str)> {
    match name.split_once("__") {
        Some((server, tool))
            if !server.is_empty() && !tool.is_empty() && !tool.contains("__") =>
        {
            Ok((server, tool))
        }
        _ => Err(RunnerError::BadToolName(name.to_string())),
    }
}

fn coerce_arguments(
    name: &str,
    arguments: serde_json::Value,
) -> Result<Option<rmcp::model::JsonObject>> {
    match arguments {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        other => Err(RunnerError::BadArguments {
            tool_name: name.to_string(),
            message: format!("MCP tool arguments must be a JSON object; got {other}"),
        }),
    }
}

fn extract_text_content(content: &[Content]) -> Option<String> {
    let lines: Vec<String> = content
        .iter()
        .filter_map(|item| item.as_text().map(|text| text.text.clone()))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Flatten a remote call result into the string fed back to the model.
fn render_call_result(name: &str, result: CallToolResult) -> Result<String> {
    let text = extract_text_content(&result.content);

    if result.is_error.unwrap_or(false) {
        let message = result
            .structured_content
            .as_ref()
            .map(|value| value.to_string())
            .or(text)
            .unwrap_or_else(|| "MCP tool returned an error result".to_string());
        return Err(RunnerError::tool(name, message));
    }

    if let Some(structured) = result.structured_content {
        return Ok(structured.to_string());
    }
    if let Some(text) = text {
        return Ok(text);
    }
    Ok(serde_json::to_string(&result.content)?)
}

/// Classify an rmcp failure as a transient connection error.
fn is_connection_error(error: &ServiceError) -> bool {
    if matches!(
        error,
        ServiceError::TransportClosed | ServiceError::TransportSend(_)
    ) {
        return true;
    }
    is_connection_error_message(&error.to_string())
}

fn is_connection_error_message(message: &str) -> bool {
    ["connection closed", "EOF", "broken pipe", "connection reset"]
        .iter()
        .any(|needle| message.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_tool_name_splits_server_and_tool() {
        let (server, tool) = parse_tool_name("weather__lookup").expect("name should split");
        assert_eq!(server, "weather");
        assert_eq!(tool, "lookup");
    }

    #[test]
    fn parse_tool_name_rejects_missing_separator() {
        assert!(matches!(
            parse_tool_name("weatherlookup"),
            Err(RunnerError::BadToolName(_))
        ));
    }

    #[test]
    fn parse_tool_name_rejects_extra_separators() {
        assert!(matches!(
            parse_tool_name("a__b__c"),
            Err(RunnerError::BadToolName(_))
        ));
    }

    #[test]
    fn parse_tool_name_rejects_empty_parts() {
        assert!(parse_tool_name("__tool").is_err());
        assert!(parse_tool_name("server__").is_err());
    }

    #[test]
    fn connection_error_messages_are_classified() {
        assert!(is_connection_error_message("unexpected EOF while reading"));
        assert!(is_connection_error_message("connection closed by server"));
        assert!(is_connection_error_message("write failed: broken pipe"));
        assert!(is_connection_error_message("connection reset by peer"));
        assert!(!is_connection_error_message("invalid params"));
    }

    #[test]
    fn coerce_arguments_accepts_objects_and_null() {
        let object = coerce_arguments("srv__tool", json!({"q": "x"}))
            .expect("object should coerce")
            .expect("object should be present");
        assert_eq!(object["q"], "x");

        assert!(coerce_arguments("srv__tool", serde_json::Value::Null)
            .expect("null should coerce")
            .is_none());
    }

    #[test]
    fn coerce_arguments_rejects_non_objects() {
        assert!(matches!(
            coerce_arguments("srv__tool", json!(["array"])),
            Err(RunnerError::BadArguments { .. })
        ));
    }

    #[tokio::test]
    async fn an_unreachable_server_is_skipped_at_startup() {
        let config: McpConfig = serde_json::from_str(
            r#"{ "mcpServers": { "ghost": { "command": "/nonexistent/mcp-server-binary" } } }"#,
        )
        .expect("config should parse");

        let pool = McpClientPool::new(config).await;
        assert_eq!(pool.session_count(), 0);
        assert!(pool.get_tools().await.is_empty());
    }

    #[tokio::test]
    async fn calling_an_unconfigured_server_fails_with_unknown_server() {
        let mut pool = McpClientPool::new(McpConfig::default()).await;
        let err = pool
            .call_tool("missing__tool", json!({}))
            .await
            .expect_err("unconfigured server must fail");
        assert!(matches!(err, RunnerError::UnknownServer(server) if server == "missing"));
    }

    #[tokio::test]
    async fn calling_a_configured_but_disconnected_server_fails() {
        let config: McpConfig = serde_json::from_str(
            r#"{ "mcpServers": { "ghost": { "command": "/nonexistent/mcp-server-binary" } } }"#,
        )
        .expect("config should parse");

        let mut pool = McpClientPool::new(config).await;
        let err = pool
            .call_tool("ghost__tool", json!({}))
            .await
            .expect_err("disconnected server must fail");
        assert!(matches!(err, RunnerError::Mcp(message) if message.contains("no open session")));
    }
}
