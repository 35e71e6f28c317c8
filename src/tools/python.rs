//! Python execution tools.

use std::path::Path;

use serde_json::Value;

use super::shell::run_command;
use super::template;
use crate::error::{Result, RunnerError};

const PYTHON: &str = "python3";

/// Execute an inline Python snippet after `{{.key}}` substitution.
pub async fn run_python_code(code: &str, args: &serde_json::Map<String, Value>) -> Result<String> {
    let rendered = template::render(code, args)?;
    run_command(
        "run_python_code",
        PYTHON,
        &["-c".to_string(), rendered],
    )
    .await
}

/// Execute a Python script with positional arguments.
pub async fn run_python_script(script_path: &Path, args: &[String]) -> Result<String> {
    if !script_path.is_file() {
        return Err(RunnerError::tool(
            "run_python_script",
            format!("script not found: {}", script_path.display()),
        ));
    }

    let mut argv = vec![script_path.to_string_lossy().into_owned()];
    argv.extend_from_slice(args);
    run_command("run_python_script", PYTHON, &argv).await
}
