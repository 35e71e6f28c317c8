//! The agent loop: skill selection, system-prompt composition, and the
//! bounded tool-use state machine.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::error::{Result, RunnerError};
use crate::mcp::McpClientPool;
use crate::provider::{AssistantReply, ChatClient, ChatRequest, OpenAiChatClient};
use crate::skills::{parse_skill_packages, SkillPackage};
use crate::tools::builtin::BuiltinOp;
use crate::tools::{
    build_catalog, file, python, shell, web, DispatchKind, ScriptLanguage, ToolCatalog,
};

use super::message::{ChatMessage, ToolCall};
use super::prompts;

/// Hard bound on tool-use iterations within one conversation turn.
pub const MAX_TOOL_ITERATIONS: usize = 20;

const LOG_TRUNCATE_CHARS: usize = 500;

/// Operator approval gate; returns `false` to deny a tool execution.
pub type ApprovalHandler = Arc<dyn Fn(&ToolCall) -> bool + Send + Sync>;

/// Drives skill discovery, selection, and the tool-use conversation.
pub struct Agent {
    client: Arc<dyn ChatClient>,
    config: RunnerConfig,
    messages: Vec<ChatMessage>,
    mcp: Option<McpClientPool>,
    approval: ApprovalHandler,
}

impl Agent {
    /// Create an agent backed by the OpenAI-compatible HTTP client.
    pub fn new(config: RunnerConfig, mcp: Option<McpClientPool>) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(RunnerError::Configuration("API key is not set".to_string()));
        }
        let client = Arc::new(OpenAiChatClient::new(
            config.api_key.clone(),
            config.api_base.clone(),
        ));
        Ok(Self::with_client(config, client, mcp))
    }

    /// Create an agent with an injected chat client.
    pub fn with_client(
        config: RunnerConfig,
        client: Arc<dyn ChatClient>,
        mcp: Option<McpClientPool>,
    ) -> Self {
        Self {
            client,
            config,
            messages: Vec::new(),
            mcp,
            approval: Arc::new(stdin_approval),
        }
    }

    /// Replace the operator approval gate (used when embedding the agent).
    pub fn with_approval_handler(mut self, approval: ApprovalHandler) -> Self {
        self.approval = approval;
        self
    }

    /// The append-only conversation history.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Clear the conversation history.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Close the MCP pool, if one was configured.
    pub async fn shutdown(self) -> Result<()> {
        match self.mcp {
            Some(pool) => pool.shutdown().await,
            None => Ok(()),
        }
    }

    /// Execute one full run: select a skill, then converse until the model
    /// answers or the iteration bound is hit.
    pub async fn run(&mut self, prompt: &str) -> Result<String> {
        let skill = self.select_and_prepare_skill(prompt).await?;
        info!(skill = %skill.meta.name, "executing skill");
        self.messages
            .push(ChatMessage::system(prompts::skill_system_prompt(&skill)));
        self.continue_with_tools(prompt, &skill).await
    }

    /// Interactive session: the skill and history persist across prompts.
    pub async fn run_loop(&mut self, initial_prompt: &str) -> Result<()> {
        let skill = self.select_and_prepare_skill(initial_prompt).await?;
        info!(skill = %skill.meta.name, "entering interactive loop");
        self.messages
            .push(ChatMessage::system(prompts::skill_system_prompt(&skill)));

        let mut current_prompt = initial_prompt.to_string();
        loop {
            match self.continue_with_tools(&current_prompt, &skill).await {
                Ok(final_text) => println!("{final_text}"),
                Err(run_error) => error!(error = %run_error, "error during execution"),
            }

            print!("\nContinue in loop? (y/N) or enter new prompt: ");
            let _ = std::io::stdout().flush();
            let Some(answer) = read_stdin_line()? else {
                break;
            };
            let answer = answer.trim().to_string();

            if answer.eq_ignore_ascii_case("n") {
                break;
            }
            if answer.eq_ignore_ascii_case("y") {
                print!("Next prompt: ");
                let _ = std::io::stdout().flush();
                let Some(next) = read_stdin_line()? else {
                    break;
                };
                current_prompt = next.trim().to_string();
            } else {
                current_prompt = answer;
            }
        }
        Ok(())
    }

    /// Discover the skill corpus and resolve the skill for this run.
    async fn select_and_prepare_skill(&self, prompt: &str) -> Result<SkillPackage> {
        info!(dir = %self.config.skills_dir.display(), "discovering skills");
        let skills = parse_skill_packages(&self.config.skills_dir)?;
        if skills.is_empty() {
            return Err(RunnerError::NoSkillsFound(self.config.skills_dir.clone()));
        }
        info!(count = skills.len(), "skills discovered");

        let selected_name = match &self.config.skill_name {
            Some(name) => name.clone(),
            None => self.select_skill(prompt, &skills).await?,
        };

        skills
            .iter()
            .find(|skill| skill.meta.name == selected_name)
            .cloned()
            .ok_or_else(|| RunnerError::SkillNotFound {
                name: selected_name,
                available: skills.iter().map(|skill| skill.meta.name.clone()).collect(),
            })
    }

    /// Ask the model to choose a skill by name, at temperature zero.
    async fn select_skill(&self, prompt: &str, skills: &[SkillPackage]) -> Result<String> {
        let messages = vec![
            ChatMessage::system(prompts::SELECTION_SYSTEM_PROMPT),
            ChatMessage::user(prompts::selection_prompt(prompt, skills)),
        ];
        self.dump_request(&messages, 0);

        let reply = self
            .client
            .chat_completion(ChatRequest {
                model: self.config.model.clone(),
                messages,
                tools: Vec::new(),
                temperature: Some(0.0),
            })
            .await?;
        self.dump_reply(&reply);

        let content = reply.content.trim().trim_matches(['\'', '"']).to_string();
        Ok(extract_skill_name(&content, skills))
    }

    /// Run the bounded tool-use conversation for one user prompt.
    async fn continue_with_tools(
        &mut self,
        prompt: &str,
        skill: &SkillPackage,
    ) -> Result<String> {
        self.messages.push(ChatMessage::user(prompt));

        let mcp_tools = match &self.mcp {
            Some(pool) => pool.get_tools().await,
            None => Vec::new(),
        };
        let catalog = build_catalog(skill, mcp_tools);
        debug!(tools = catalog.len(), "tool catalog assembled");

        for _ in 0..MAX_TOOL_ITERATIONS {
            self.dump_request(&self.messages, catalog.len());
            let reply = self
                .client
                .chat_completion(ChatRequest {
                    model: self.config.model.clone(),
                    messages: self.messages.clone(),
                    tools: catalog.definitions().to_vec(),
                    temperature: None,
                })
                .await?;
            self.dump_reply(&reply);

            self.messages.push(ChatMessage::Assistant {
                content: reply.content.clone(),
                tool_calls: reply.tool_calls.clone(),
            });

            if reply.tool_calls.is_empty() {
                return Ok(reply.content);
            }

            for call in &reply.tool_calls {
                info!(tool = %call.name, args = %call.arguments, "calling tool");

                if !self.config.auto_approve_tools && !(self.approval)(call) {
                    warn!(tool = %call.name, "tool execution denied by operator");
                    self.messages
                        .push(ChatMessage::tool(&call.id, prompts::DENIED_MESSAGE));
                    continue;
                }

                // Dispatch errors become tool messages; only LLM errors
                // abort the run.
                match self.dispatch_tool_call(call, &catalog, &skill.path).await {
                    Ok(output) => {
                        self.messages.push(ChatMessage::tool(&call.id, output));
                    }
                    Err(dispatch_error) => {
                        error!(tool = %call.name, error = %dispatch_error, "tool call failed");
                        self.messages.push(ChatMessage::tool(
                            &call.id,
                            prompts::tool_failure_message(
                                &call.name,
                                &call.arguments,
                                &dispatch_error.to_string(),
                            ),
                        ));
                    }
                }
            }
        }

        Err(RunnerError::IterationLimitExceeded(MAX_TOOL_ITERATIONS))
    }

    /// Resolve a tool call to an executable action and run it.
    async fn dispatch_tool_call(
        &mut self,
        call: &ToolCall,
        catalog: &ToolCatalog,
        skill_root: &Path,
    ) -> Result<String> {
        if call.name.contains("__") {
            if let Some(pool) = self.mcp.as_mut() {
                let arguments = parse_raw_arguments(&call.name, &call.arguments)?;
                return pool.call_tool(&call.name, arguments).await;
            }
        }

        match catalog.dispatch_entry(&call.name) {
            Some(DispatchKind::Builtin(op)) => self.execute_builtin(*op, call, skill_root).await,
            Some(DispatchKind::SkillScript { path, language }) => {
                let params: ScriptArgs = parse_args(&call.name, &call.arguments)?;
                match language {
                    ScriptLanguage::Python => python::run_python_script(path, &params.args).await,
                    ScriptLanguage::Shell => shell::run_shell_script(path, &params.args).await,
                }
            }
            Some(DispatchKind::McpRemote { .. }) => Err(RunnerError::Mcp(
                "MCP tools are unavailable without a configured client".to_string(),
            )),
            None => Err(RunnerError::UnknownTool(call.name.clone())),
        }
    }

    async fn execute_builtin(
        &self,
        op: BuiltinOp,
        call: &ToolCall,
        skill_root: &Path,
    ) -> Result<String> {
        match op {
            BuiltinOp::RunShellCode => {
                let params: CodeParams = parse_args(&call.name, &call.arguments)?;
                shell::run_shell_code(&params.code, &params.args).await
            }
            BuiltinOp::RunShellScript => {
                let params: ScriptParams = parse_args(&call.name, &call.arguments)?;
                shell::run_shell_script(Path::new(&params.script_path), &params.args).await
            }
            BuiltinOp::RunPythonCode => {
                let params: CodeParams = parse_args(&call.name, &call.arguments)?;
                python::run_python_code(&params.code, &params.args).await
            }
            BuiltinOp::RunPythonScript => {
                let params: ScriptParams = parse_args(&call.name, &call.arguments)?;
                python::run_python_script(Path::new(&params.script_path), &params.args).await
            }
            BuiltinOp::ReadFile => {
                let params: FilePathParams = parse_args(&call.name, &call.arguments)?;
                let path = resolve_read_path(&params.file_path, skill_root);
                file::read_file(&path).await
            }
            BuiltinOp::WriteFile => {
                let params: WriteFileParams = parse_args(&call.name, &call.arguments)?;
                file::write_file(Path::new(&params.file_path), &params.content).await
            }
            BuiltinOp::WikipediaSearch => {
                let params: QueryParams = parse_args(&call.name, &call.arguments)?;
                web::wikipedia_search(&params.query).await
            }
            BuiltinOp::TavilySearch => {
                let params: QueryParams = parse_args(&call.name, &call.arguments)?;
                web::tavily_search(&params.query).await
            }
            BuiltinOp::WebFetch => {
                let params: UrlParams = parse_args(&call.name, &call.arguments)?;
                web::web_fetch(&params.url).await
            }
        }
    }

    fn dump_request(&self, messages: &[ChatMessage], tool_count: usize) {
        if self.config.verbose < 2 {
            return;
        }
        for (index, message) in messages.iter().enumerate() {
            debug!(
                index,
                role = message.role(),
                content = %truncate_for_log(message.content()),
                "llm request message"
            );
        }
        debug!(tools = tool_count, "llm request tools");
    }

    fn dump_reply(&self, reply: &AssistantReply) {
        if self.config.verbose < 2 {
            return;
        }
        if let Some(usage) = reply.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "llm usage"
            );
        }
        debug!(content = %truncate_for_log(&reply.content), "llm reply");
        for call in &reply.tool_calls {
            debug!(tool = %call.name, args = %truncate_for_log(&call.arguments), "llm tool call");
        }
    }
}

#[derive(Deserialize)]
struct CodeParams {
    code: String,
    #[serde(default)]
    args: serde_json::Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptParams {
    script_path: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ScriptArgs {
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilePathParams {
    file_path: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteFileParams {
    file_path: String,
    content: String,
}

#[derive(Deserialize)]
struct QueryParams {
    query: String,
}

#[derive(Deserialize)]
struct UrlParams {
    url: String,
}

/// Parse tool-call arguments; an empty string counts as an empty object.
fn parse_args<T: DeserializeOwned>(tool_name: &str, raw: &str) -> Result<T> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(|error| RunnerError::BadArguments {
        tool_name: tool_name.to_string(),
        message: error.to_string(),
    })
}

fn parse_raw_arguments(tool_name: &str, raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw).map_err(|error| RunnerError::BadArguments {
        tool_name: tool_name.to_string(),
        message: error.to_string(),
    })
}

/// Match a selection reply against the known skill names.
fn extract_skill_name(content: &str, skills: &[SkillPackage]) -> String {
    if skills.iter().any(|skill| skill.meta.name == content) {
        return content.to_string();
    }

    let lower_content = content.to_lowercase();
    for skill in skills {
        if lower_content.contains(&skill.meta.name.to_lowercase()) {
            return skill.meta.name.clone();
        }
    }

    content.to_string()
}

/// Resolve a `read_file` path against the skill root when it is relative
/// and the joined path exists.
fn resolve_read_path(raw: &str, skill_root: &Path) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_relative() {
        let joined = skill_root.join(&path);
        if joined.exists() {
            return joined;
        }
    }
    path
}

fn truncate_for_log(text: &str) -> String {
    if text.chars().count() <= LOG_TRUNCATE_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(LOG_TRUNCATE_CHARS).collect();
    truncated.push_str("...");
    truncated
}

fn stdin_approval(_call: &ToolCall) -> bool {
    print!("Allow this tool execution? [y/N]: ");
    let _ = std::io::stdout().flush();
    match read_stdin_line() {
        Ok(Some(line)) => line.trim().eq_ignore_ascii_case("y"),
        _ => false,
    }
}

/// Read one line from stdin; `None` on end of input.
fn read_stdin_line() -> Result<Option<String>> {
    let mut line = String::new();
    let bytes = std::io::stdin().read_line(&mut line)?;
    if bytes == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
