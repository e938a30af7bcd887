use crate::error::{AppError, AppResult};
use serde::Deserialize;

/// What the coordinator does with a second move on an issue whose first
/// move is still being applied.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MovePolicy {
    #[default]
    Reject,
    Queue,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default)]
    pub move_policy: MovePolicy,
    #[serde(default = "default_history_enabled")]
    pub history_enabled: bool,
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Clone, Debug)]
pub struct BoardConfig {
    pub move_policy: MovePolicy,
    pub history_enabled: bool,
    pub event_channel_capacity: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            move_policy: MovePolicy::default(),
            history_enabled: default_history_enabled(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_history_enabled() -> bool {
    true
}
fn default_event_channel_capacity() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            move_policy: MovePolicy::default(),
            history_enabled: default_history_enabled(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()
            .map_err(|e| AppError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_iter<I>(vars: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .map_err(|e| AppError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if !matches!(
            self.log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(AppError::Config(format!(
                "LOG_LEVEL must be one of trace, debug, info, warn, error (got {})",
                self.log_level
            )));
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty" | "plain") {
            return Err(AppError::Config(format!(
                "LOG_FORMAT must be json, pretty or plain (got {})",
                self.log_format
            )));
        }

        if self.event_channel_capacity == 0 {
            return Err(AppError::Config(
                "EVENT_CHANNEL_CAPACITY must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format.clone(),
        }
    }

    pub fn board(&self) -> BoardConfig {
        BoardConfig {
            move_policy: self.move_policy,
            history_enabled: self.history_enabled,
            event_channel_capacity: self.event_channel_capacity,
        }
    }
}
