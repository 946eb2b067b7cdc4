//! Gemini client configuration loaded from environment variables.

use std::time::Duration;

use crate::poll::PollPolicy;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("{name} is invalid: {value:?}")]
    Invalid { name: &'static str, value: String },
}

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_STORY_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Connection and model settings for [`crate::client::GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub story_model: String,
    pub image_model: String,
    pub tts_model: String,
    pub video_model: String,
    /// Polling budget for video jobs.
    pub video_poll: PollPolicy,
}

impl GeminiConfig {
    /// Config with default endpoints and models for the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            story_model: DEFAULT_STORY_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            video_poll: PollPolicy::default(),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                                            |
    /// |----------------------------|----------------------------------------------------|
    /// | `GEMINI_API_KEY`           | required                                           |
    /// | `GEMINI_BASE_URL`          | `https://generativelanguage.googleapis.com/v1beta` |
    /// | `GEMINI_STORY_MODEL`       | `gemini-3-flash-preview`                           |
    /// | `GEMINI_IMAGE_MODEL`       | `gemini-2.5-flash-image`                           |
    /// | `GEMINI_TTS_MODEL`         | `gemini-2.5-flash-preview-tts`                     |
    /// | `GEMINI_VIDEO_MODEL`       | `veo-3.1-fast-generate-preview`                    |
    /// | `VIDEO_POLL_INTERVAL_SECS` | `5`                                                |
    /// | `VIDEO_POLL_MAX_WAIT_SECS` | `600`                                              |
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let defaults = PollPolicy::default();
        let interval: u64 = parse_env("VIDEO_POLL_INTERVAL_SECS", defaults.interval.as_secs())?;
        let max_wait: u64 = parse_env("VIDEO_POLL_MAX_WAIT_SECS", defaults.max_wait.as_secs())?;
        if interval == 0 {
            return Err(ConfigError::Invalid {
                name: "VIDEO_POLL_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            api_key,
            base_url: env_or("GEMINI_BASE_URL", DEFAULT_BASE_URL),
            story_model: env_or("GEMINI_STORY_MODEL", DEFAULT_STORY_MODEL),
            image_model: env_or("GEMINI_IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
            tts_model: env_or("GEMINI_TTS_MODEL", DEFAULT_TTS_MODEL),
            video_model: env_or("GEMINI_VIDEO_MODEL", DEFAULT_VIDEO_MODEL),
            video_poll: PollPolicy {
                interval: Duration::from_secs(interval),
                max_wait: Duration::from_secs(max_wait),
                ..defaults
            },
        })
    }
}

/// Read `name`, falling back to `default` when unset or empty.
pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse `name` as `T`, falling back to `default` when unset or empty.
pub fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}
