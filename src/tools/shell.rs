//! Shell execution tools.

use std::path::Path;

use serde_json::Value;
use tokio::process::Command;

use super::template;
use crate::error::{Result, RunnerError};

/// Run a command to completion and return its combined stdout and stderr.
///
/// The child is spawned with `kill_on_drop` so a cancelled agent run cannot
/// leave orphaned processes behind. A non-zero exit status is an error
/// carrying the captured output.
pub(crate) async fn run_command(
    tool_name: &str,
    program: &str,
    args: &[String],
) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|error| RunnerError::tool(tool_name, format!("failed to spawn {program}: {error}")))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(RunnerError::tool(
            tool_name,
            format!("exited with status {code}: {}", combined.trim_end()),
        ));
    }

    Ok(combined)
}

/// Execute an inline shell snippet after `{{.key}}` substitution.
pub async fn run_shell_code(code: &str, args: &serde_json::Map<String, Value>) -> Result<String> {
    let rendered = template::render(code, args)?;
    run_command(
        "run_shell_code",
        "sh",
        &["-c".to_string(), rendered],
    )
    .await
}

/// Execute a shell script with positional arguments.
pub async fn run_shell_script(script_path: &Path, args: &[String]) -> Result<String> {
    if !script_path.is_file() {
        return Err(RunnerError::tool(
            "run_shell_script",
            format!("script not found: {}", script_path.display()),
        ));
    }

    let mut argv = vec![script_path.to_string_lossy().into_owned()];
    argv.extend_from_slice(args);
    run_command("run_shell_script", "sh", &argv).await
}
