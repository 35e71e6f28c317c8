//! Runtime configuration resolved once at process start.
//!
//! Resolution order for every option: CLI flag > environment variable >
//! built-in default. The resulting [`RunnerConfig`] is immutable for the
//! lifetime of the agent.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Result, RunnerError};

/// Default chat model when neither flag nor `OPENAI_MODEL` is set.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default skills directory, relative to the user's home.
pub const DEFAULT_SKILLS_DIR: &str = "~/.skillrunner/skills";

/// Immutable runtime configuration for one agent run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// API key for the chat-completion endpoint.
    pub api_key: String,
    /// Base URL override for the endpoint (no trailing slash).
    pub api_base: Option<String>,
    /// Chat model identifier.
    pub model: String,
    /// Absolute path of the skill corpus root.
    pub skills_dir: PathBuf,
    /// Optional skill name override, bypassing LLM selection.
    pub skill_name: Option<String>,
    /// Verbosity: 0 silent, 1 progress, 2 request/response dumps.
    pub verbose: u8,
    /// Execute tool calls without asking the operator.
    pub auto_approve_tools: bool,
    /// Advisory list of scripts the operator considers safe.
    pub allowed_scripts: Vec<String>,
    /// Interactive loop mode.
    pub loop_mode: bool,
    /// Path of the MCP server configuration file, if any.
    pub mcp_config: Option<PathBuf>,
}

/// Unresolved options collected from CLI flags.
///
/// Every `None` falls through to the environment and then the default.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub skills_dir: Option<PathBuf>,
    pub skill_name: Option<String>,
    pub verbose: u8,
    pub auto_approve_tools: Option<bool>,
    pub allowed_scripts: Vec<String>,
    pub loop_mode: bool,
    pub mcp_config: Option<PathBuf>,
}

impl RunnerConfig {
    /// Resolve the final configuration from overrides, environment, and defaults.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let api_key = overrides
            .api_key
            .or_else(|| env_non_empty("OPENAI_API_KEY"))
            .ok_or_else(|| RunnerError::Configuration("API key is not set".to_string()))?;

        let api_base = overrides
            .api_base
            .or_else(|| env_non_empty("OPENAI_API_BASE"))
            .map(|base| base.trim_end_matches('/').to_string());

        let model = overrides
            .model
            .or_else(|| env_non_empty("OPENAI_MODEL"))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let skills_dir = overrides
            .skills_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SKILLS_DIR));
        let skills_dir = absolutize(&skills_dir);

        let mcp_config = overrides
            .mcp_config
            .or_else(|| env_non_empty("MCP_CONFIG").map(PathBuf::from))
            .or_else(default_mcp_config);

        Ok(Self {
            api_key,
            api_base,
            model,
            skills_dir,
            skill_name: overrides.skill_name,
            verbose: overrides.verbose,
            auto_approve_tools: overrides.auto_approve_tools.unwrap_or(true),
            allowed_scripts: overrides.allowed_scripts,
            loop_mode: overrides.loop_mode,
            mcp_config,
        })
    }
}

/// Expand `~` and resolve a relative path against the current working directory.
fn absolutize(path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let expanded = PathBuf::from(expanded);
    if expanded.is_absolute() {
        expanded
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

/// Use `./mcp.json` when present and nothing else was configured.
fn default_mcp_config() -> Option<PathBuf> {
    let local = PathBuf::from("mcp.json");
    local.exists().then_some(local)
}
