use super::MAX_CONTEXT_CHARS_PER_FILE;
use crate::llm::parse::parse_json_response;
use crate::llm::prompts::CHAT_SYSTEM;
use crate::llm::TextGenerator;
use crate::project::{render_context, ProjectFile};
use serde::Deserialize;

#[derive(Deserialize)]
struct ChatReply {
    response: String,
}

/// Answer a free-form message, optionally grounded in project files
pub async fn chat(
    generator: &dyn TextGenerator,
    message: &str,
    project_files: Option<&[ProjectFile]>,
) -> anyhow::Result<String> {
    let mut user = String::new();
    if let Some(files) = project_files.filter(|files| !files.is_empty()) {
        user.push_str("You have access to the following project files:\n\n");
        user.push_str(&render_context(files, MAX_CONTEXT_CHARS_PER_FILE));
        user.push('\n');
    }
    user.push_str("User message: ");
    user.push_str(message);

    let response = generator.complete(CHAT_SYSTEM, &user, true).await?;
    let reply: ChatReply = parse_json_response(&response.content, "chat")?;
    Ok(reply.response)
}
