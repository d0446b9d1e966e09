//! Configuration management for codepilot
//!
//! Stores settings in ~/.config/codepilot/config.json. API keys may also come
//! from the environment, which takes precedence over the file.

use crate::llm::Provider;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Quiet period before a code-change triggered analysis runs.
pub const DEFAULT_DEBOUNCE_MS: u64 = 5000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Upper bound on `max_retries`, whatever the file says
pub const MAX_RETRIES_LIMIT: u32 = 10;
const DEFAULT_MAX_FILE_BYTES: u64 = 256 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend provider; `AI_MODEL` overrides it when set
    pub provider: Option<Provider>,
    /// Model id override for the selected provider
    pub model: Option<String>,
    pub google_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    /// Quiet period for debounced analysis, in milliseconds
    pub debounce_ms: u64,
    /// Per-request HTTP timeout, in seconds
    pub request_timeout_secs: u64,
    /// Transport retries on HTTP 429
    pub max_retries: u32,
    /// Files larger than this are skipped by the project analyzer
    pub max_file_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            google_api_key: None,
            openai_api_key: None,
            groq_api_key: None,
            deepseek_api_key: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl Config {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("codepilot"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load config from a specific file. A missing file yields defaults; a
    /// corrupt one is backed up and also yields defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(config) => config.clamped(),
            Err(err) => {
                preserve_corrupt_config(path, &content);
                warn!(
                    path = %path.display(),
                    error = %err,
                    "config file was corrupted; a backup was saved and defaults were loaded"
                );
                Self::default()
            }
        }
    }

    fn clamped(mut self) -> Self {
        if self.max_retries > MAX_RETRIES_LIMIT {
            warn!(
                requested = self.max_retries,
                limit = MAX_RETRIES_LIMIT,
                "max_retries is too large; using the limit"
            );
            self.max_retries = MAX_RETRIES_LIMIT;
        }
        self
    }

    /// Save config to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| anyhow::anyhow!("Failed to create config directory: {}", e))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
                    warn!(error = %e, "failed to set config directory permissions");
                }
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .map_err(|e| anyhow::anyhow!("Failed to write config: {}", e))?;
        fs::rename(&tmp, path).map_err(|e| anyhow::anyhow!("Failed to write config: {}", e))?;
        Ok(())
    }

    /// The provider to use: `AI_MODEL` first, then the config file, then Google AI.
    pub fn selected_provider(&self) -> Provider {
        if let Ok(name) = std::env::var("AI_MODEL") {
            return Provider::from_name(&name);
        }
        self.provider.unwrap_or_default()
    }

    /// Model id for the selected provider
    pub fn selected_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.selected_provider().default_model().to_string())
    }

    /// API key for a provider (environment variable wins over the config file)
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        if let Ok(key) = std::env::var(provider.api_key_env()) {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
        let stored = match provider {
            Provider::GoogleAi => &self.google_api_key,
            Provider::OpenAi => &self.openai_api_key,
            Provider::Groq => &self.groq_api_key,
            Provider::DeepSeek => &self.deepseek_api_key,
        };
        stored.clone().filter(|k| !k.trim().is_empty())
    }

    /// Store a key for a provider in the config file fields
    pub fn set_api_key(&mut self, provider: Provider, key: &str) {
        let key = Some(key.trim().to_string());
        match provider {
            Provider::GoogleAi => self.google_api_key = key,
            Provider::OpenAi => self.openai_api_key = key,
            Provider::Groq => self.groq_api_key = key,
            Provider::DeepSeek => self.deepseek_api_key = key,
        }
    }

    /// Human-readable summary with secrets masked
    pub fn describe(&self) -> String {
        let provider = self.selected_provider();
        let key_state = match self.api_key(provider) {
            Some(key) => mask_key(&key),
            None => "not set".to_string(),
        };
        format!(
            "provider: {}\nmodel: {}\napi key: {}\ndebounce: {} ms\nrequest timeout: {} s\nmax retries: {}\nmax file size: {} bytes",
            provider.name(),
            self.selected_model(),
            key_state,
            self.debounce_ms,
            self.request_timeout_secs,
            self.max_retries,
            self.max_file_bytes,
        )
    }
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{}", visible)
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let backup = path.with_extension("json.corrupt");
    if let Err(e) = fs::write(&backup, content) {
        warn!(error = %e, "failed to back up corrupt config");
    }
}
