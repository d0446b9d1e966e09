use super::MAX_CHUNK_CHARS;
use crate::llm::parse::parse_json_response;
use crate::llm::prompts::CHUNK_ANALYZER_SYSTEM;
use crate::llm::TextGenerator;
use crate::util::truncate_content;
use serde::{Deserialize, Serialize};

/// A suspected problem somewhere in a reviewed chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub location: String,
    pub description: String,
}

#[derive(Deserialize)]
struct ChunkReply {
    #[serde(default, rename = "errorLocations", alias = "error_locations")]
    error_locations: Vec<ErrorLocation>,
}

/// Review a large block of code for likely error locations
pub async fn analyze_long_code_chunk(
    generator: &dyn TextGenerator,
    code: &str,
    project_context: Option<&str>,
) -> anyhow::Result<Vec<ErrorLocation>> {
    let numbered: String = code
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{:>5} | {}\n", i + 1, line))
        .collect();

    let mut user = format!("CODE:\n{}", truncate_content(&numbered, MAX_CHUNK_CHARS));
    if let Some(context) = project_context.filter(|c| !c.trim().is_empty()) {
        user.push_str("\nProject context:\n");
        user.push_str(&truncate_content(context, MAX_CHUNK_CHARS / 4));
        user.push('\n');
    }

    let response = generator.complete(CHUNK_ANALYZER_SYSTEM, &user, true).await?;
    let reply: ChunkReply = parse_json_response(&response.content, "chunk analysis")?;
    Ok(reply
        .error_locations
        .into_iter()
        .filter(|loc| !loc.description.trim().is_empty())
        .collect())
}
