//! End-to-end agent loop scenarios against a scripted chat client.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use skillrunner::agent::{Agent, ChatMessage, ToolCall, MAX_TOOL_ITERATIONS};
use skillrunner::config::RunnerConfig;
use skillrunner::error::{Result, RunnerError};
use skillrunner::provider::{AssistantReply, ChatClient, ChatRequest};

/// Chat client that replays a scripted sequence of assistant replies.
struct ScriptedChatClient {
    responses: Mutex<VecDeque<AssistantReply>>,
    repeat_last: bool,
}

impl ScriptedChatClient {
    fn new(responses: Vec<AssistantReply>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            repeat_last: false,
        }
    }

    fn repeating(response: AssistantReply) -> Self {
        Self {
            responses: Mutex::new(vec![response].into()),
            repeat_last: true,
        }
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat_completion(&self, _request: ChatRequest) -> Result<AssistantReply> {
        let mut responses = self.responses.lock().expect("response lock");
        if self.repeat_last && responses.len() == 1 {
            return Ok(responses.front().expect("repeating response").clone());
        }
        responses
            .pop_front()
            .ok_or_else(|| RunnerError::api(500, "no more responses"))
    }
}

fn text_reply(content: &str) -> AssistantReply {
    AssistantReply {
        content: content.to_string(),
        ..AssistantReply::default()
    }
}

fn tool_call_reply(id: &str, name: &str, arguments: &str) -> AssistantReply {
    AssistantReply {
        content: String::new(),
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }],
        ..AssistantReply::default()
    }
}

/// Create a skills directory with one frontmatter skill named `test skill`.
fn write_test_skill(dir: &TempDir) -> PathBuf {
    let skill_dir = dir.path().join("test-skill");
    std::fs::create_dir_all(&skill_dir).expect("skill dir should be created");
    std::fs::write(
        skill_dir.join("SKILL.md"),
        "---\nname: test skill\ndescription: A skill used by loop tests.\n---\n# Test Skill\n\nDo the thing.\n",
    )
    .expect("descriptor should be written");
    skill_dir
}

fn test_config(skills_dir: &Path, skill_name: Option<&str>) -> RunnerConfig {
    RunnerConfig {
        api_key: "test-key".to_string(),
        api_base: None,
        model: "test-model".to_string(),
        skills_dir: skills_dir.to_path_buf(),
        skill_name: skill_name.map(String::from),
        verbose: 0,
        auto_approve_tools: true,
        allowed_scripts: Vec::new(),
        loop_mode: false,
        mcp_config: None,
    }
}

fn agent_with(
    config: RunnerConfig,
    client: ScriptedChatClient,
) -> Agent {
    Agent::with_client(config, Arc::new(client), None)
}

#[tokio::test]
async fn a_reply_without_tool_calls_is_the_final_answer() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_test_skill(&dir);

    let client = ScriptedChatClient::new(vec![text_reply("All done.")]);
    let mut agent = agent_with(test_config(dir.path(), Some("test skill")), client);

    let answer = agent.run("do the thing").await.expect("run should succeed");
    assert_eq!(answer, "All done.");

    let roles: Vec<&str> = agent.messages().iter().map(ChatMessage::role).collect();
    assert_eq!(roles, vec!["system", "user", "assistant"]);
}

#[tokio::test]
async fn a_failed_dispatch_surfaces_to_the_model_and_the_run_recovers() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_test_skill(&dir);

    let client = ScriptedChatClient::new(vec![
        tool_call_reply("call_1", "read_file", r#"{"filePath":"/nonexistent"}"#),
        text_reply("File not found"),
    ]);
    let mut agent = agent_with(test_config(dir.path(), Some("test skill")), client);

    let answer = agent.run("read it").await.expect("run should succeed");
    assert_eq!(answer, "File not found");

    let messages = agent.messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].role(), "system");
    assert_eq!(messages[1].role(), "user");
    assert_eq!(messages[2].role(), "assistant");
    assert_eq!(messages[2].tool_calls().len(), 1);

    match &messages[3] {
        ChatMessage::Tool {
            tool_call_id,
            content,
        } => {
            assert_eq!(tool_call_id, "call_1");
            assert!(
                content.starts_with("Tool execution failed: read_file"),
                "unexpected tool content: {content}"
            );
            assert!(content.contains(r#"{"filePath":"/nonexistent"}"#));
            assert!(content.contains("retry with different parameters"));
            assert!(content.contains("use a different tool"));
            assert!(content.contains("modify your approach"));
        }
        other => panic!("expected a tool message, got {other:?}"),
    }

    assert_eq!(messages[4].role(), "assistant");
    assert!(messages[4].tool_calls().is_empty());
}

#[tokio::test]
async fn the_iteration_bound_terminates_an_endless_tool_loop() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_test_skill(&dir);

    let client = ScriptedChatClient::repeating(tool_call_reply(
        "call_loop",
        "run_shell_code",
        r#"{"code":"echo test"}"#,
    ));
    let mut agent = agent_with(test_config(dir.path(), Some("test skill")), client);

    let err = agent.run("loop forever").await.expect_err("run must hit the bound");
    assert!(matches!(err, RunnerError::IterationLimitExceeded(MAX_TOOL_ITERATIONS)));

    // 1 system + 1 user + 20 x (assistant + tool).
    assert_eq!(agent.messages().len(), 2 + 2 * MAX_TOOL_ITERATIONS);
}

#[tokio::test]
async fn every_assistant_tool_call_is_answered_one_to_one() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_test_skill(&dir);

    let client = ScriptedChatClient::repeating(tool_call_reply(
        "call_loop",
        "run_shell_code",
        r#"{"code":"echo test"}"#,
    ));
    let mut agent = agent_with(test_config(dir.path(), Some("test skill")), client);
    let _ = agent.run("loop forever").await;

    let messages = agent.messages();
    for (index, message) in messages.iter().enumerate() {
        for call in message.tool_calls() {
            let answered = messages[index + 1..].iter().any(|candidate| {
                matches!(
                    candidate,
                    ChatMessage::Tool { tool_call_id, .. } if tool_call_id == &call.id
                )
            });
            assert!(answered, "tool call {} has no reply", call.id);
        }
    }
}

#[tokio::test]
async fn the_model_selects_a_skill_by_name() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_test_skill(&dir);

    let client = ScriptedChatClient::new(vec![
        text_reply("test skill"),
        text_reply("Selected and answered."),
    ]);
    let mut agent = agent_with(test_config(dir.path(), None), client);

    let answer = agent.run("please help").await.expect("run should succeed");
    assert_eq!(answer, "Selected and answered.");
}

#[tokio::test]
async fn a_quoted_or_wordy_selection_reply_still_resolves() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_test_skill(&dir);

    let client = ScriptedChatClient::new(vec![
        text_reply("I would pick \"Test Skill\" for this request."),
        text_reply("Done."),
    ]);
    let mut agent = agent_with(test_config(dir.path(), None), client);

    let answer = agent.run("please help").await.expect("run should succeed");
    assert_eq!(answer, "Done.");
}

#[tokio::test]
async fn an_unresolvable_selection_fails_with_skill_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_test_skill(&dir);

    let client = ScriptedChatClient::new(vec![text_reply("no such capability")]);
    let mut agent = agent_with(test_config(dir.path(), None), client);

    let err = agent.run("please help").await.expect_err("selection must fail");
    match err {
        RunnerError::SkillNotFound { name, available } => {
            assert_eq!(name, "no such capability");
            assert_eq!(available, vec!["test skill".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn an_empty_skills_directory_fails_with_no_skills_found() {
    let dir = tempfile::tempdir().expect("temp dir");

    let client = ScriptedChatClient::new(Vec::new());
    let mut agent = agent_with(test_config(dir.path(), None), client);

    let err = agent.run("anything").await.expect_err("empty corpus must fail");
    assert!(matches!(err, RunnerError::NoSkillsFound(_)));
}

#[tokio::test]
async fn a_denied_tool_call_feeds_the_fixed_denial_message_back() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_test_skill(&dir);

    let client = ScriptedChatClient::new(vec![
        tool_call_reply("call_1", "run_shell_code", r#"{"code":"rm -rf /"}"#),
        text_reply("Understood, stopping."),
    ]);
    let mut config = test_config(dir.path(), Some("test skill"));
    config.auto_approve_tools = false;

    let mut agent =
        agent_with(config, client).with_approval_handler(Arc::new(|_call| false));

    let answer = agent.run("dangerous request").await.expect("run should succeed");
    assert_eq!(answer, "Understood, stopping.");

    let denial = agent
        .messages()
        .iter()
        .find_map(|message| match message {
            ChatMessage::Tool { content, .. } => Some(content.clone()),
            _ => None,
        })
        .expect("a tool message should exist");
    assert_eq!(denial, "Error: User denied tool execution.");
}

#[tokio::test]
async fn an_unknown_tool_name_becomes_a_dispatch_error_message() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_test_skill(&dir);

    let client = ScriptedChatClient::new(vec![
        tool_call_reply("call_1", "telepathy", "{}"),
        text_reply("I will use something else."),
    ]);
    let mut agent = agent_with(test_config(dir.path(), Some("test skill")), client);

    let answer = agent.run("use your mind").await.expect("run should succeed");
    assert_eq!(answer, "I will use something else.");

    let failure = agent
        .messages()
        .iter()
        .find_map(|message| match message {
            ChatMessage::Tool { content, .. } => Some(content.clone()),
            _ => None,
        })
        .expect("a tool message should exist");
    assert!(failure.starts_with("Tool execution failed: telepathy"));
    assert!(failure.contains("unknown tool"));
}

#[tokio::test]
async fn a_successful_tool_call_feeds_output_back_and_converges() {
    let dir = tempfile::tempdir().expect("temp dir");
    let skill_dir = write_test_skill(&dir);
    std::fs::write(skill_dir.join("notes.txt"), "skill-local data").expect("file written");

    // A relative read_file path resolves against the skill root.
    let client = ScriptedChatClient::new(vec![
        tool_call_reply("call_1", "read_file", r#"{"filePath":"notes.txt"}"#),
        text_reply("The notes say: skill-local data"),
    ]);
    let mut agent = agent_with(test_config(dir.path(), Some("test skill")), client);

    let answer = agent.run("read the notes").await.expect("run should succeed");
    assert_eq!(answer, "The notes say: skill-local data");

    let output = agent
        .messages()
        .iter()
        .find_map(|message| match message {
            ChatMessage::Tool { content, .. } => Some(content.clone()),
            _ => None,
        })
        .expect("a tool message should exist");
    assert_eq!(output, "skill-local data");
}

#[tokio::test]
async fn a_skill_script_tool_executes_the_bundled_script() {
    let dir = tempfile::tempdir().expect("temp dir");
    let skill_dir = write_test_skill(&dir);
    let scripts = skill_dir.join("scripts");
    std::fs::create_dir_all(&scripts).expect("scripts dir created");
    std::fs::write(scripts.join("greet.sh"), "echo \"hello $1\"").expect("script written");

    let client = ScriptedChatClient::new(vec![
        tool_call_reply("call_1", "run_scripts_greet_sh", r#"{"args":["world"]}"#),
        text_reply("Script ran."),
    ]);
    let mut agent = agent_with(test_config(dir.path(), Some("test skill")), client);

    let answer = agent.run("run the script").await.expect("run should succeed");
    assert_eq!(answer, "Script ran.");

    let output = agent
        .messages()
        .iter()
        .find_map(|message| match message {
            ChatMessage::Tool { content, .. } => Some(content.clone()),
            _ => None,
        })
        .expect("a tool message should exist");
    assert_eq!(output.trim(), "hello world");
}

#[tokio::test]
async fn upstream_llm_errors_abort_the_run() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_test_skill(&dir);

    // The script is exhausted immediately, standing in for an upstream failure.
    let client = ScriptedChatClient::new(Vec::new());
    let mut agent = agent_with(test_config(dir.path(), Some("test skill")), client);

    let err = agent.run("anything").await.expect_err("run must fail");
    assert!(matches!(err, RunnerError::Api { status: 500, .. }));
}
