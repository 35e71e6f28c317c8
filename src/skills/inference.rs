//! Metadata inference for skills authored without frontmatter.

use crate::skills::model::SkillMeta;

/// Keyword rules mapping descriptor content to base tool grants.
const INFERENCE_RULES: &[(&[&str], &[&str])] = &[
    (
        &["xlsx", "csv", "spreadsheet"],
        &["read_file", "write_file", "run_python_code", "run_python_script"],
    ),
    (
        &["pdf", "pdftoppm"],
        &["read_file", "write_file", "run_shell_code", "run_python_script"],
    ),
    (
        &["docx", "libreoffice", "doc"],
        &["read_file", "write_file", "run_shell_code"],
    ),
    (
        &["web", "fetch", "search", "api", "internet"],
        &[
            "read_file",
            "write_file",
            "web_fetch",
            "tavily_search",
            "wikipedia_search",
        ],
    ),
];

/// Marker separating the injected guidance from the original descriptor.
pub(crate) const ORIGINAL_CONTENT_MARKER: &str = "## Original Skill Content";

/// Guidance prepended to skills that carry no tool mapping of their own.
pub(crate) const ENVIRONMENT_GUIDANCE: &str = "\
## Tool Usage

This skill was authored for a different runtime. Based on your own \
experience, map any environment or tool usage it describes onto the tools \
available in this conversation: use the file tools for reading and writing, \
the shell and python tools for commands and code, and the search tools for \
anything that requires the web. Prefer the closest available tool over \
refusing a step.";

/// Infer base tool grants from descriptor text and the directory name.
///
/// The haystack is the lowercased descriptor plus the directory name; every
/// matching rule contributes its tools, `read_file`/`write_file` are always
/// granted, and duplicates collapse in first-insertion order.
pub fn infer_allowed_tools(text: &str, dir_name: &str) -> Vec<String> {
    let haystack = format!("{} {}", text.to_lowercase(), dir_name.to_lowercase());

    let mut tools: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !tools.iter().any(|existing| existing == name) {
            tools.push(name.to_string());
        }
    };

    for (triggers, granted) in INFERENCE_RULES {
        if triggers.iter().any(|trigger| haystack.contains(trigger)) {
            for name in *granted {
                push(name);
            }
        }
    }
    push("read_file");
    push("write_file");

    tools
}

/// Derive a skill name from its directory base name.
pub(crate) fn name_from_dir(dir_name: &str) -> String {
    dir_name.to_lowercase().replace(['-', '_'], " ")
}

/// Extract the description paragraph between the first `#` heading and the
/// first `##` heading.
pub(crate) fn description_between_headings(content: &str) -> Option<String> {
    let mut in_section = false;
    let mut collected = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("##") {
            if in_section {
                break;
            }
            continue;
        }
        if trimmed.starts_with('#') {
            in_section = true;
            continue;
        }
        if in_section {
            collected.push(line);
        }
    }

    let description = collected.join("\n").trim().to_string();
    (!description.is_empty()).then_some(description)
}

/// Build inferred metadata and the rewritten body for a frontmatter-less skill.
pub(crate) fn inferred_meta_and_body(dir_name: &str, content: &str) -> (SkillMeta, String) {
    let name = name_from_dir(dir_name);
    let description = description_between_headings(content).unwrap_or_else(|| name.clone());
    let allowed_tools = infer_allowed_tools(content, dir_name);

    let body = format!("{ENVIRONMENT_GUIDANCE}\n\n{ORIGINAL_CONTENT_MARKER}\n\n{content}");

    (
        SkillMeta {
            name,
            description,
            allowed_tools,
            ..SkillMeta::default()
        },
        body,
    )
}
