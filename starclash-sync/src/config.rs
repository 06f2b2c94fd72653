//! Client configuration
//!
//! Typed configuration for the sync layer with defaults matching the
//! stock game, plus environment overrides for the binaries.

use std::time::Duration;

use thiserror::Error;

use crate::error::ErrorPolicy;

/// Default game server endpoint.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8081";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable held a value that could not be parsed.
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// How often the local transform is pushed to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPolicy {
    /// Every rendered frame, unconditionally.
    EveryFrame,
    /// Only frames where the transform differs from the last one sent.
    OnChange,
    /// At most once per interval.
    Interval(Duration),
}

impl SendPolicy {
    fn parse(value: &str) -> Result<Self, String> {
        match value {
            "every_frame" => Ok(SendPolicy::EveryFrame),
            "on_change" => Ok(SendPolicy::OnChange),
            other => {
                let millis = other
                    .strip_prefix("interval:")
                    .ok_or_else(|| "expected every_frame, on_change or interval:<ms>".to_string())?;
                let millis: u64 = millis.parse().map_err(|e| format!("{e}"))?;
                Ok(SendPolicy::Interval(Duration::from_millis(millis)))
            }
        }
    }
}

/// Reconnection behaviour after the transport drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Whether to reconnect at all.
    pub enabled: bool,
    /// Attempts before giving up (0 = unlimited).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for the doubling delay.
    pub max_backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 10,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl ReconnectPolicy {
    /// Never reconnect.
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn allows(&self, attempt: u32) -> bool {
        self.enabled && (self.max_attempts == 0 || attempt < self.max_attempts)
    }

    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

/// Sync layer configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// WebSocket URL of the game server.
    pub server_url: String,
    /// Reconnection behaviour.
    pub reconnect: ReconnectPolicy,
    /// Outbound movement pacing.
    pub send_policy: SendPolicy,
    /// Error dispositions.
    pub errors: ErrorPolicy,
    /// Capacity of the outbound message channel.
    pub outgoing_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            send_policy: SendPolicy::EveryFrame,
            errors: ErrorPolicy::default(),
            outgoing_capacity: 100,
        }
    }
}

impl SyncConfig {
    /// Load from process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("STARCLASH_SERVER_URL") {
            config.server_url = url;
        }

        if let Some(value) = lookup("STARCLASH_RECONNECT") {
            config.reconnect.enabled = parse_bool("STARCLASH_RECONNECT", &value)?;
        }

        if let Some(value) = lookup("STARCLASH_RECONNECT_MAX_ATTEMPTS") {
            config.reconnect.max_attempts = value.parse().map_err(|e| ConfigError::InvalidValue {
                key: "STARCLASH_RECONNECT_MAX_ATTEMPTS",
                value: value.clone(),
                reason: format!("{e}"),
            })?;
        }

        if let Some(value) = lookup("STARCLASH_SEND_POLICY") {
            config.send_policy = SendPolicy::parse(&value).map_err(|reason| ConfigError::InvalidValue {
                key: "STARCLASH_SEND_POLICY",
                value: value.clone(),
                reason,
            })?;
        }

        if let Some(value) = lookup("STARCLASH_OUTGOING_CAPACITY") {
            let capacity: usize = value.parse().map_err(|e| ConfigError::InvalidValue {
                key: "STARCLASH_OUTGOING_CAPACITY",
                value: value.clone(),
                reason: format!("{e}"),
            })?;
            if capacity == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "STARCLASH_OUTGOING_CAPACITY",
                    value,
                    reason: "must be at least 1".to_string(),
                });
            }
            config.outgoing_capacity = capacity;
        }

        Ok(config)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
