//! Prompt composition for skill selection and execution.

use crate::skills::SkillPackage;

/// System prompt for the skill selection round.
pub(crate) const SELECTION_SYSTEM_PROMPT: &str = "You are an expert assistant that selects the \
most appropriate skill to handle a user's request.";

/// Fixed guidance appended to the selection request.
const SELECTION_GUIDANCE: &str = "\
Based on the user request, which single skill is the most appropriate to use?
Prefer a dedicated calculator-type skill over spreadsheet skills for pure \
arithmetic; only pick a spreadsheet skill when the task requires creating or \
reading a spreadsheet file. Select exactly one skill and respond with only \
the name of the skill.";

/// Build the user message for the selection round.
pub(crate) fn selection_prompt(user_prompt: &str, skills: &[SkillPackage]) -> String {
    let mut prompt = format!("User Request: {user_prompt}\n\nAvailable Skills:\n");
    for skill in skills {
        prompt.push_str(&format!("- {}: {}\n", skill.meta.name, skill.meta.description));
    }
    prompt.push('\n');
    prompt.push_str(SELECTION_GUIDANCE);
    prompt
}

/// Compose the single system message injected for the selected skill.
pub(crate) fn skill_system_prompt(skill: &SkillPackage) -> String {
    format!(
        "{}\n\n\
         ## If the skill does not require invoking any script, do not call tools \
         (in particular, do not call run_shell_script) and answer directly from \
         the skill's guidance.\n\n\
         ## SKILL CONTEXT\n\
         Skill Root Path: {}\n",
        skill.body,
        skill.path.display()
    )
}

/// Tool-role content appended when the operator denies a tool execution.
pub(crate) const DENIED_MESSAGE: &str = "Error: User denied tool execution.";

/// Structured tool-role content for a failed dispatch.
///
/// Names the tool, restates the arguments verbatim, describes the failure,
/// and offers the recovery options the model can take.
pub(crate) fn tool_failure_message(tool_name: &str, arguments: &str, error: &str) -> String {
    format!(
        "Tool execution failed: {tool_name}\n\
         Arguments: {arguments}\n\
         Error: {error}\n\
         You can retry with different parameters, use a different tool, or \
         modify your approach."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::{SkillMeta, SkillResources};
    use std::path::PathBuf;

    fn skill(name: &str, description: &str) -> SkillPackage {
        SkillPackage {
            path: PathBuf::from("/skills").join(name),
            meta: SkillMeta {
                name: name.to_string(),
                description: description.to_string(),
                ..SkillMeta::default()
            },
            body: format!("# {name}\n\nInstructions."),
            resources: SkillResources::default(),
        }
    }

    #[test]
    fn selection_prompt_lists_every_skill() {
        let skills = vec![skill("pdf", "PDF toolkit"), skill("xlsx", "Spreadsheets")];
        let prompt = selection_prompt("extract text", &skills);
        assert!(prompt.starts_with("User Request: extract text"));
        assert!(prompt.contains("- pdf: PDF toolkit"));
        assert!(prompt.contains("- xlsx: Spreadsheets"));
        assert!(prompt.contains("respond with only"));
    }

    #[test]
    fn skill_system_prompt_carries_body_and_root_path() {
        let skill = skill("pdf", "PDF toolkit");
        let prompt = skill_system_prompt(&skill);
        assert!(prompt.starts_with("# pdf"));
        assert!(prompt.contains("## SKILL CONTEXT"));
        assert!(prompt.contains("Skill Root Path: /skills/pdf"));
        assert!(prompt.contains("do not call run_shell_script"));
    }

    #[test]
    fn tool_failure_message_contains_all_required_parts() {
        let message = tool_failure_message("read_file", r#"{"filePath":"/x"}"#, "file missing");
        assert!(message.starts_with("Tool execution failed: read_file"));
        assert!(message.contains(r#"{"filePath":"/x"}"#));
        assert!(message.contains("file missing"));
        assert!(message.contains("retry with different parameters"));
        assert!(message.contains("use a different tool"));
        assert!(message.contains("modify your approach"));
    }
}
