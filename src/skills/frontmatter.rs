//! YAML frontmatter parsing for the formal skill authoring convention.

use std::path::Path;

use serde::Deserialize;

use crate::error::RunnerError;
use crate::skills::model::SkillMeta;

#[derive(Debug, Deserialize)]
struct SkillFrontmatter {
    name: Option<String>,
    description: Option<String>,
    #[serde(rename = "allowed-tools")]
    allowed_tools: Option<Vec<String>>,
    model: Option<String>,
    author: Option<String>,
    version: Option<String>,
    license: Option<String>,
}

/// Split a descriptor into its frontmatter text and body.
///
/// Returns `None` when the first non-empty line is not a `---` delimiter or
/// no closing delimiter exists.
pub(crate) fn split_frontmatter(content: &str) -> Option<(String, String)> {
    let mut lines = content.lines();
    let mut consumed = 0usize;

    // Skip leading blank lines before the opening delimiter.
    let mut opener = None;
    for line in lines.by_ref() {
        consumed += line.len() + 1;
        if line.trim().is_empty() {
            continue;
        }
        opener = Some(line);
        break;
    }
    if opener?.trim() != "---" {
        return None;
    }

    let mut frontmatter = Vec::new();
    for line in lines {
        consumed += line.len() + 1;
        if line.trim() == "---" {
            let body = content.get(consumed..).unwrap_or("").to_string();
            return Some((frontmatter.join("\n"), body));
        }
        frontmatter.push(line);
    }

    None
}

/// Parse frontmatter text into [`SkillMeta`].
pub(crate) fn parse_frontmatter(path: &Path, text: &str) -> Result<SkillMeta, RunnerError> {
    let parsed: SkillFrontmatter =
        serde_yaml::from_str(text).map_err(|source| RunnerError::InvalidFrontmatter {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(SkillMeta {
        name: parsed.name.unwrap_or_default(),
        description: parsed.description.unwrap_or_default(),
        allowed_tools: parsed.allowed_tools.unwrap_or_default(),
        model: parsed.model,
        author: parsed.author,
        version: parsed.version,
        license: parsed.license,
    })
}
