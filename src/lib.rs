//! skillrunner: a skill-driven agent runtime.
//!
//! Given a natural-language request, the runtime discovers declarative skill
//! packages on disk, asks an OpenAI-compatible model to pick one, and drives
//! a bounded tool-use loop in which the model's structured tool calls are
//! executed locally (shell, Python, file I/O, web search) or proxied to
//! remote Model Context Protocol servers, with every output streamed back
//! into the conversation until the model produces a final answer.
//!
//! # Example
//!
//! ```rust,no_run
//! use skillrunner::agent::Agent;
//! use skillrunner::config::{ConfigOverrides, RunnerConfig};
//!
//! # async fn run() -> skillrunner::error::Result<()> {
//! let config = RunnerConfig::resolve(ConfigOverrides::default())?;
//! let mut agent = Agent::new(config, None)?;
//! let answer = agent.run("Summarize the quarterly report").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod mcp;
pub mod provider;
pub mod skills;
pub mod tools;

pub use agent::{Agent, ChatMessage, ToolCall};
pub use config::{ConfigOverrides, RunnerConfig};
pub use error::{Result, RunnerError};
pub use skills::{parse_skill_package, parse_skill_packages, SkillPackage};
