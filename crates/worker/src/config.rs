//! Worker run configuration loaded from environment variables.

use std::time::Duration;

use aniflow_core::project::AspectRatio;
use aniflow_core::types::Seed;
use aniflow_genai::config::parse_env;
use aniflow_genai::ConfigError;
use aniflow_pipeline::pacing::DEFAULT_PACING;
use aniflow_timeline::DEFAULT_TICK_HZ;

/// What to produce and how fast to drive the pipeline and timeline.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub topic: String,
    pub aspect_ratio: AspectRatio,
    /// Fixed project seed; a random one is used when unset.
    pub seed: Option<Seed>,
    pub pacing: Duration,
    pub tick_hz: u32,
    /// Also synthesize narration for every shot with dialogue.
    pub narration: bool,
    /// Play the finished timeline from start to end before exiting.
    pub play_through: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// `cli_topic` (the first command-line argument) takes precedence over
    /// `STORY_TOPIC`.
    ///
    /// | Env Var              | Default    |
    /// |----------------------|------------|
    /// | `STORY_TOPIC`        | required   |
    /// | `ASPECT_RATIO`       | `16:9`     |
    /// | `PROJECT_SEED`       | random     |
    /// | `PIPELINE_PACING_MS` | `500`      |
    /// | `TIMELINE_TICK_HZ`   | `20`       |
    /// | `NARRATION_BATCH`    | `true`     |
    /// | `PLAY_THROUGH`       | `true`     |
    pub fn from_env(cli_topic: Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |t: String| {
            let t = t.trim().to_string();
            (!t.is_empty()).then_some(t)
        };
        let topic = cli_topic
            .and_then(non_blank)
            .or_else(|| std::env::var("STORY_TOPIC").ok().and_then(non_blank))
            .ok_or(ConfigError::Missing("STORY_TOPIC"))?;

        let aspect_label = std::env::var("ASPECT_RATIO").unwrap_or_default();
        let aspect_ratio = if aspect_label.trim().is_empty() {
            AspectRatio::default()
        } else {
            AspectRatio::from_label(&aspect_label).map_err(|_| ConfigError::Invalid {
                name: "ASPECT_RATIO",
                value: aspect_label.clone(),
            })?
        };

        let seed = match std::env::var("PROJECT_SEED") {
            Ok(value) if !value.trim().is_empty() => Some(value.trim().parse().map_err(|_| {
                ConfigError::Invalid {
                    name: "PROJECT_SEED",
                    value,
                }
            })?),
            _ => None,
        };

        let pacing_ms: u64 = parse_env("PIPELINE_PACING_MS", DEFAULT_PACING.as_millis() as u64)?;
        let tick_hz: u32 = parse_env("TIMELINE_TICK_HZ", DEFAULT_TICK_HZ)?;
        if tick_hz == 0 {
            return Err(ConfigError::Invalid {
                name: "TIMELINE_TICK_HZ",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            topic,
            aspect_ratio,
            seed,
            pacing: Duration::from_millis(pacing_ms),
            tick_hz,
            narration: parse_env("NARRATION_BATCH", true)?,
            play_through: parse_env("PLAY_THROUGH", true)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_topic_wins_and_is_trimmed() {
        let config = WorkerConfig::from_env(Some("  a fox spirit at dusk ".to_string())).unwrap();
        assert_eq!(config.topic, "a fox spirit at dusk");
    }

    #[test]
    fn blank_cli_topic_is_not_accepted_as_a_topic() {
        // Falls through to STORY_TOPIC, which the test environment leaves
        // unset.
        if std::env::var("STORY_TOPIC").is_err() {
            assert!(matches!(
                WorkerConfig::from_env(Some("   ".to_string())),
                Err(ConfigError::Missing("STORY_TOPIC"))
            ));
        }
    }
}
