// src/config.rs
use std::path::PathBuf;
use std::time::Duration;

use crate::models::AspectRatio;
use crate::services::generation::RetryPolicy;

pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone)]
pub struct Config {
    /// Access credential for the generation service. Absence is reported
    /// when a generation is attempted, not at startup.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub retry: RetryPolicy,
    pub default_ratio: AspectRatio,
    pub output_dir: PathBuf,
    pub voice_command: Option<String>,
    pub share_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            default_ratio: AspectRatio::default(),
            output_dir: PathBuf::from("."),
            voice_command: None,
            share_command: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_key: api_key_from(|name| std::env::var(name).ok()),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.retry = RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
        };
        self
    }

    /// The credential, if one is set and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty())
}
