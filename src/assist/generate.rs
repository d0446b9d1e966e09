use super::MAX_CHUNK_CHARS;
use crate::llm::parse::parse_json_response;
use crate::llm::prompts::CODE_GENERATOR_SYSTEM;
use crate::llm::TextGenerator;
use crate::util::truncate_content;
use serde::Deserialize;

#[derive(Deserialize)]
struct SnippetReply {
    #[serde(rename = "codeSnippet", alias = "code_snippet")]
    code_snippet: String,
}

/// Generate a snippet from a description, optionally shaped by project context
pub async fn generate_code_snippet(
    generator: &dyn TextGenerator,
    prompt: &str,
    project_context: Option<&str>,
) -> anyhow::Result<String> {
    let mut user = format!("Description:\n{}\n", prompt);
    if let Some(context) = project_context.filter(|c| !c.trim().is_empty()) {
        user.push_str("\nProject context:\n");
        user.push_str(&truncate_content(context, MAX_CHUNK_CHARS));
        user.push('\n');
    }

    let response = generator.complete(CODE_GENERATOR_SYSTEM, &user, true).await?;
    let reply: SnippetReply = parse_json_response(&response.content, "code generation")?;
    Ok(reply.code_snippet)
}
