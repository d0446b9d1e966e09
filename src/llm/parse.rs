use crate::util::truncate;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

/// Strip markdown code fences from a response
pub(crate) fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let clean = clean.strip_suffix("```").unwrap_or(clean);
    clean.trim()
}

/// Extract the outermost JSON object from a response
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let clean = strip_markdown_fences(text);
    let start = clean.find('{')?;
    let end = clean.rfind('}')?;
    (start <= end).then(|| &clean[start..=end])
}

fn trailing_comma_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[\]}])").ok()).as_ref()
}

/// Try to fix common JSON issues from LLM responses
pub(crate) fn fix_json_issues(json: &str) -> String {
    // Remove trailing commas before ] or }, including across whitespace
    let fixed = match trailing_comma_re() {
        Some(re) => re.replace_all(json, "$1").into_owned(),
        None => json.replace(",]", "]").replace(",}", "}"),
    };

    // Smart quotes to regular quotes
    let fixed = fixed
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // Stray control characters (escaped newlines inside strings are untouched)
    fixed
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
        .collect()
}

/// Parse a JSON object out of an LLM response.
///
/// Accepts fenced output and repairs trailing commas and smart quotes. There is
/// no self-correction round trip: a response that still does not parse is an
/// error for the caller to report.
pub(crate) fn parse_json_response<T>(response: &str, context_hint: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let json_str = extract_json_object(response).ok_or_else(|| {
        anyhow::anyhow!(
            "No JSON object found in {} response: {}",
            context_hint,
            truncate(response, 200)
        )
    })?;

    match serde_json::from_str::<T>(json_str) {
        Ok(parsed) => Ok(parsed),
        Err(initial_error) => {
            let fixed = fix_json_issues(json_str);
            serde_json::from_str::<T>(&fixed).map_err(|_| {
                anyhow::anyhow!(
                    "Invalid JSON in {} response ({}): {}",
                    context_hint,
                    initial_error,
                    truncate(json_str, 200)
                )
            })
        }
    }
}
