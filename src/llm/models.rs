use serde::{Deserialize, Serialize};

/// Text-generation providers reachable through an OpenAI-compatible
/// chat-completions endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google AI (Gemini) - the default
    #[default]
    #[serde(rename = "googleai")]
    GoogleAi,
    #[serde(rename = "openai")]
    OpenAi,
    Groq,
    #[serde(rename = "deepseek")]
    DeepSeek,
}

/// Maximum completion tokens requested from any provider
const MODEL_MAX_TOKENS: u32 = 8192;

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::GoogleAi,
        Provider::OpenAi,
        Provider::Groq,
        Provider::DeepSeek,
    ];

    /// Resolve a provider name; `None` when the name is not recognized.
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "googleai" => Some(Provider::GoogleAi),
            "openai" => Some(Provider::OpenAi),
            "groq" => Some(Provider::Groq),
            "deepseek" => Some(Provider::DeepSeek),
            _ => None,
        }
    }

    /// Resolve a provider name; unknown names fall back to Google AI.
    pub fn from_name(name: &str) -> Self {
        Self::parse_name(name).unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::GoogleAi => "googleai",
            Provider::OpenAi => "openai",
            Provider::Groq => "groq",
            Provider::DeepSeek => "deepseek",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            Provider::GoogleAi => {
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
            }
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
            Provider::Groq => "https://api.groq.com/openai/v1/chat/completions",
            Provider::DeepSeek => "https://api.deepseek.com/chat/completions",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::GoogleAi => "gemini-2.0-flash",
            Provider::OpenAi => "gpt-3.5-turbo",
            Provider::Groq => "mixtral-8x7b-32768",
            Provider::DeepSeek => "deepseek-chat",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::GoogleAi => "GOOGLE_GENAI_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Groq => "GROQ_API_KEY",
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    pub fn max_tokens(&self) -> u32 {
        MODEL_MAX_TOKENS
    }

    /// Whether the endpoint accepts `response_format: json_object`.
    pub fn supports_json_mode(&self) -> bool {
        !matches!(self, Provider::Groq)
    }
}

/// API usage information reported by the backend
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
