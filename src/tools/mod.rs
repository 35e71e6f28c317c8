//! Tool surface: definitions, the dispatch catalog, and the built-in
//! tool implementations.

mod catalog;
mod definition;
mod template;

pub mod builtin;
pub mod file;
pub mod python;
pub mod shell;
pub mod web;

pub use catalog::{build_catalog, script_tool_name, DispatchKind, ScriptLanguage, ToolCatalog};
pub use definition::ToolDefinition;
