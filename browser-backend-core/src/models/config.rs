use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::BackendError;

/// How audio feeds are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreadingMode {
    /// Advanced once per animation frame on the browser UI thread.
    Cooperative,
    /// Advanced by a dedicated audio thread.
    DedicatedThread,
}

/// Configuration for the browser backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfiguration {
    /// Threading mode for audio feeds (default: cooperative).
    pub threading: ThreadingMode,

    /// How long `stop()` waits for a dedicated audio thread to exit (default: 500).
    pub stop_timeout_ms: u64,

    /// Sleep applied by the dedicated audio thread when no slot is free (default: 1).
    pub starvation_sleep_ms: u64,

    /// Frame rate the repaint budget is derived from (default: 120).
    pub target_frame_rate: f64,

    /// Background clipboard refresh interval (default: 200).
    pub clipboard_poll_interval_ms: u64,

    /// Whether the message thread runs apart from the browser main thread.
    /// Pending repaints are then never interrupted by the frame budget.
    pub message_thread_proxied: bool,
}

impl BackendConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.target_frame_rate > 0.0) {
            return Err(format!("target frame rate must be positive: {}", self.target_frame_rate));
        }
        if self.stop_timeout_ms == 0 {
            return Err("stop timeout must be non-zero".into());
        }
        if self.clipboard_poll_interval_ms == 0 {
            return Err("clipboard poll interval must be non-zero".into());
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BackendError::Configuration(format!("failed to parse configuration: {}", e)))?;
        config.validate().map_err(BackendError::Configuration)?;
        Ok(config)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn starvation_sleep(&self) -> Duration {
        Duration::from_millis(self.starvation_sleep_ms)
    }

    pub fn clipboard_poll_interval(&self) -> Duration {
        Duration::from_millis(self.clipboard_poll_interval_ms)
    }

    /// Time allowed for one repaint batch.
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_frame_rate)
    }
}

impl Default for BackendConfiguration {
    fn default() -> Self {
        Self {
            threading: ThreadingMode::Cooperative,
            stop_timeout_ms: 500,
            starvation_sleep_ms: 1,
            target_frame_rate: 120.0,
            clipboard_poll_interval_ms: 200,
            message_thread_proxied: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BackendConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stop_timeout(), Duration::from_millis(500));
        assert_eq!(config.clipboard_poll_interval(), Duration::from_millis(200));
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config = BackendConfiguration::from_json(r#"{ "threading": "dedicated-thread" }"#).unwrap();
        assert_eq!(config.threading, ThreadingMode::DedicatedThread);
        assert_eq!(config.stop_timeout_ms, 500);
        assert_eq!(config.target_frame_rate, 120.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = BackendConfiguration::from_json(r#"{ "target_frame_rate": 0.0 }"#).unwrap_err();
        assert!(matches!(err, BackendError::Configuration(_)));

        let err = BackendConfiguration::from_json("not json").unwrap_err();
        assert!(matches!(err, BackendError::Configuration(_)));
    }
}
