//! Base tool definitions available to every skill.

use serde_json::json;

use super::definition::ToolDefinition;

/// Opcodes for the built-in tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinOp {
    RunShellCode,
    RunShellScript,
    RunPythonCode,
    RunPythonScript,
    ReadFile,
    WriteFile,
    WikipediaSearch,
    TavilySearch,
    WebFetch,
}

impl BuiltinOp {
    /// The tool name this opcode is exposed under.
    pub fn name(self) -> &'static str {
        match self {
            Self::RunShellCode => "run_shell_code",
            Self::RunShellScript => "run_shell_script",
            Self::RunPythonCode => "run_python_code",
            Self::RunPythonScript => "run_python_script",
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::WikipediaSearch => "wikipedia_search",
            Self::TavilySearch => "tavily_search",
            Self::WebFetch => "web_fetch",
        }
    }

    /// All opcodes in catalog order.
    pub fn all() -> [BuiltinOp; 9] {
        [
            Self::RunShellCode,
            Self::RunShellScript,
            Self::RunPythonCode,
            Self::RunPythonScript,
            Self::ReadFile,
            Self::WriteFile,
            Self::WikipediaSearch,
            Self::TavilySearch,
            Self::WebFetch,
        ]
    }
}

fn script_path_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "scriptPath": {
                "type": "string",
                "description": "The path to the script to execute."
            },
            "args": {
                "type": "array",
                "description": "A list of string arguments to pass to the script.",
                "items": { "type": "string" }
            }
        },
        "required": ["scriptPath"]
    })
}

fn inline_code_schema(language: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "code": {
                "type": "string",
                "description": format!("The {language} code to execute. May contain {{{{.key}}}} placeholders filled from args."),
            },
            "args": {
                "type": "object",
                "description": "Values substituted into the code template.",
                "additionalProperties": true
            }
        },
        "required": ["code"]
    })
}

fn query_schema(description: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "query": { "type": "string", "description": description }
        },
        "required": ["query"]
    })
}

/// The fixed list of base tool definitions, in catalog order.
pub fn base_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            BuiltinOp::RunShellCode.name(),
            "Executes an inline shell snippet and returns its combined stdout and stderr.",
            inline_code_schema("shell"),
        ),
        ToolDefinition::new(
            BuiltinOp::RunShellScript.name(),
            "Executes a shell script and returns its combined stdout and stderr.",
            script_path_schema(),
        ),
        ToolDefinition::new(
            BuiltinOp::RunPythonCode.name(),
            "Executes an inline Python snippet and returns its combined stdout and stderr.",
            inline_code_schema("Python"),
        ),
        ToolDefinition::new(
            BuiltinOp::RunPythonScript.name(),
            "Executes a Python script and returns its combined stdout and stderr.",
            script_path_schema(),
        ),
        ToolDefinition::new(
            BuiltinOp::ReadFile.name(),
            "Reads the content of a file and returns it as a string.",
            json!({
                "type": "object",
                "properties": {
                    "filePath": {
                        "type": "string",
                        "description": "The path to the file to read."
                    }
                },
                "required": ["filePath"]
            }),
        ),
        ToolDefinition::new(
            BuiltinOp::WriteFile.name(),
            "Writes the given content to a file, creating it if needed and truncating it otherwise.",
            json!({
                "type": "object",
                "properties": {
                    "filePath": {
                        "type": "string",
                        "description": "The path to the file to write."
                    },
                    "content": {
                        "type": "string",
                        "description": "The content to write to the file."
                    }
                },
                "required": ["filePath", "content"]
            }),
        ),
        ToolDefinition::new(
            BuiltinOp::WikipediaSearch.name(),
            "Searches Wikipedia for the given query and returns a summary of the relevant entry.",
            query_schema("The search query for Wikipedia."),
        ),
        ToolDefinition::new(
            BuiltinOp::TavilySearch.name(),
            "Searches the web via the Tavily API and returns formatted results.",
            query_schema("The web search query."),
        ),
        ToolDefinition::new(
            BuiltinOp::WebFetch.name(),
            "Fetches a URL and returns the readable text extracted from the page.",
            json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "The URL to fetch." }
                },
                "required": ["url"]
            }),
        ),
    ]
}

/// Look up the opcode for a base tool name.
pub fn builtin_op(name: &str) -> Option<BuiltinOp> {
    BuiltinOp::all().into_iter().find(|op| op.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_tools_match_opcodes_one_to_one() {
        let tools = base_tools();
        assert_eq!(tools.len(), BuiltinOp::all().len());
        for (tool, op) in tools.iter().zip(BuiltinOp::all()) {
            assert_eq!(tool.name, op.name());
        }
    }

    #[test]
    fn every_base_tool_name_is_resolvable() {
        for tool in base_tools() {
            assert!(builtin_op(&tool.name).is_some(), "unresolvable: {}", tool.name);
        }
    }

    #[test]
    fn every_base_tool_has_an_object_schema() {
        for tool in base_tools() {
            assert_eq!(tool.parameters["type"], "object", "tool: {}", tool.name);
        }
    }

    #[test]
    fn builtin_op_rejects_unknown_names() {
        assert!(builtin_op("telepathy").is_none());
    }
}
