//! skillrunner CLI binary entry point.

use std::io::Read as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skillrunner::agent::Agent;
use skillrunner::config::{ConfigOverrides, RunnerConfig};
use skillrunner::mcp::{McpClientPool, McpConfig};

/// Run a user request through the skill-use workflow with an
/// OpenAI-compatible model.
#[derive(Debug, Parser)]
#[command(name = "skillrunner", version, about)]
struct Cli {
    /// The user request; read from stdin when omitted.
    prompt: Vec<String>,

    /// Chat model identifier (env: OPENAI_MODEL).
    #[arg(long)]
    model: Option<String>,

    /// API base URL override (env: OPENAI_API_BASE).
    #[arg(long)]
    api_base: Option<String>,

    /// API key (env: OPENAI_API_KEY).
    #[arg(long)]
    api_key: Option<String>,

    /// Root directory of the skill corpus.
    #[arg(long)]
    skills_dir: Option<PathBuf>,

    /// Use this skill instead of asking the model to select one.
    #[arg(long)]
    skill: Option<String>,

    /// MCP server configuration file (env: MCP_CONFIG; default ./mcp.json).
    #[arg(long)]
    mcp_config: Option<PathBuf>,

    /// Ask before every tool execution.
    #[arg(long)]
    no_auto_approve: bool,

    /// Scripts the operator considers safe to run.
    #[arg(long = "allowed-script")]
    allowed_scripts: Vec<String>,

    /// Keep the session open for follow-up prompts.
    #[arg(long = "loop")]
    loop_mode: bool,

    /// Increase verbosity (-v progress, -vv request/response dumps).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("skillrunner={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_prompt(words: &[String]) -> std::io::Result<String> {
    if !words.is_empty() {
        return Ok(words.join(" "));
    }
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer.trim().to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let prompt = read_prompt(&cli.prompt)?;
    if prompt.is_empty() {
        return Err("no prompt given; pass one as arguments or on stdin".into());
    }

    let config = RunnerConfig::resolve(ConfigOverrides {
        api_key: cli.api_key,
        api_base: cli.api_base,
        model: cli.model,
        skills_dir: cli.skills_dir,
        skill_name: cli.skill,
        verbose: cli.verbose,
        auto_approve_tools: cli.no_auto_approve.then_some(false),
        allowed_scripts: cli.allowed_scripts,
        loop_mode: cli.loop_mode,
        mcp_config: cli.mcp_config,
    })?;

    let mcp = match &config.mcp_config {
        Some(path) => {
            info!(path = %path.display(), "loading mcp config");
            match McpConfig::load(path) {
                Ok(mcp_config) => {
                    let pool = McpClientPool::new(mcp_config).await;
                    info!(sessions = pool.session_count(), "mcp client initialized");
                    Some(pool)
                }
                Err(error) => {
                    warn!(%error, "failed to load mcp config");
                    None
                }
            }
        }
        None => None,
    };

    let loop_mode = config.loop_mode;
    let mut agent = Agent::new(config, mcp)?;

    let outcome: Result<(), Box<dyn std::error::Error>> = if loop_mode {
        agent.run_loop(&prompt).await.map_err(Into::into)
    } else {
        match agent.run(&prompt).await {
            Ok(answer) => {
                println!("{answer}");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    };

    if let Err(error) = agent.shutdown().await {
        warn!(%error, "mcp shutdown reported errors");
    }

    outcome
}
