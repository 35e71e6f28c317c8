//! Merging base tools, skill script tools, and MCP tools into one
//! collision-free catalog with a dispatch table.

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::json;

use super::builtin::{base_tools, builtin_op, BuiltinOp};
use super::definition::ToolDefinition;
use crate::skills::SkillPackage;

/// Script interpreter, inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLanguage {
    Python,
    Shell,
}

impl ScriptLanguage {
    /// `.py` runs as Python; anything else runs as shell.
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => Self::Python,
            _ => Self::Shell,
        }
    }
}

/// Runtime binding for one exposed tool name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchKind {
    /// A fixed built-in opcode.
    Builtin(BuiltinOp),
    /// A script bundled with the selected skill.
    SkillScript {
        path: PathBuf,
        language: ScriptLanguage,
    },
    /// A tool proxied from a remote MCP server.
    McpRemote { server: String, tool: String },
}

/// The merged tool surface for one invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    definitions: Vec<ToolDefinition>,
    dispatch: HashMap<String, DispatchKind>,
}

impl ToolCatalog {
    /// Tool definitions in catalog order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Resolve a name to its dispatch entry.
    pub fn dispatch_entry(&self, name: &str) -> Option<&DispatchKind> {
        self.dispatch.get(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn insert(&mut self, definition: ToolDefinition, kind: DispatchKind) {
        if let Some(existing) = self
            .definitions
            .iter()
            .position(|tool| tool.name == definition.name)
        {
            // Later sources shadow earlier ones for the same name.
            self.definitions.remove(existing);
        }
        self.dispatch.insert(definition.name.clone(), kind);
        self.definitions.push(definition);
    }
}

/// Normalize a script's relative path into a tool name.
///
/// `scripts/test.py` becomes `run_scripts_test_py`; every character outside
/// `[A-Za-z0-9]` maps to `_`.
pub fn script_tool_name(relative_path: &std::path::Path) -> String {
    let normalized: String = relative_path
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("run_{normalized}")
}

fn script_tool_definition(relative_path: &std::path::Path) -> ToolDefinition {
    let relative = relative_path.to_string_lossy();
    let description = match ScriptLanguage::from_path(relative_path) {
        ScriptLanguage::Python => format!("Executes the python script '{relative}'."),
        ScriptLanguage::Shell => format!("Executes the shell script '{relative}'."),
    };

    ToolDefinition::new(
        script_tool_name(relative_path),
        description,
        json!({
            "type": "object",
            "properties": {
                "args": {
                    "type": "array",
                    "description": "Arguments to pass to the script.",
                    "items": { "type": "string" }
                }
            }
        }),
    )
}

/// Assemble the merged tool surface for one skill invocation.
///
/// Base tools are filtered by the skill's `allowed_tools` when the list is
/// non-empty; each skill script contributes a generated tool bound to its
/// absolute path; MCP definitions (already name-spaced `server__tool`) come
/// last. Script-derived names shadow base tools on collision.
pub fn build_catalog(skill: &SkillPackage, mcp_tools: Vec<ToolDefinition>) -> ToolCatalog {
    let mut catalog = ToolCatalog::default();

    for definition in base_tools() {
        if !skill.meta.allowed_tools.is_empty()
            && !skill.meta.allowed_tools.contains(&definition.name)
        {
            continue;
        }
        let op = builtin_op(&definition.name)
            .expect("base tool definitions and opcodes are defined together");
        catalog.insert(definition, DispatchKind::Builtin(op));
    }

    for relative_path in &skill.resources.scripts {
        let definition = script_tool_definition(relative_path);
        let kind = DispatchKind::SkillScript {
            path: skill.path.join(relative_path),
            language: ScriptLanguage::from_path(relative_path),
        };
        catalog.insert(definition, kind);
    }

    for definition in mcp_tools {
        let Some((server, tool)) = definition.name.split_once("__") else {
            continue;
        };
        let kind = DispatchKind::McpRemote {
            server: server.to_string(),
            tool: tool.to_string(),
        };
        catalog.insert(definition, kind);
    }

    catalog
}
