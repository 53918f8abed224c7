// ABOUTME: Environment-backed configuration for sessions, analysis, stream, feedback, and bootstrap
// ABOUTME: Missing variables fall back to defaults; malformed values are rejected
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::error::ConfigError;
use coach_core::constants::{alignment, bootstrap, feedback, reps, session, stream};
use coach_vision::RepCounterConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Read an environment variable, falling back to `default` when unset
fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Parse { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Read a boolean flag; accepts `true/false/1/0`
fn env_flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key).as_deref() {
        Ok("1" | "true" | "TRUE") => Ok(true),
        Ok("0" | "false" | "FALSE") => Ok(false),
        Ok(other) => Err(ConfigError::Parse {
            key,
            value: other.to_owned(),
        }),
        Err(_) => Ok(default),
    }
}

/// Session phase timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Countdown before every set
    pub countdown_secs: u64,
    /// Delay between reaching the target and completing the set
    pub auto_complete_delay_ms: u64,
    /// Pause between the sides of a one-sided exercise
    pub side_switch_secs: u64,
    /// Preview between exercises
    pub transition_secs: u64,
    /// Calorie estimate rate for active time
    pub kcal_per_active_minute: f64,
    /// Clock granularity of the async runner
    pub tick_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_secs: session::COUNTDOWN_SECS,
            auto_complete_delay_ms: session::AUTO_COMPLETE_DELAY_MS,
            side_switch_secs: session::SIDE_SWITCH_SECS,
            transition_secs: session::TRANSITION_SECS,
            kcal_per_active_minute: session::KCAL_PER_ACTIVE_MINUTE,
            tick_interval_ms: session::TICK_INTERVAL_MS,
        }
    }
}

impl SessionConfig {
    /// Load session configuration from environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed values
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            countdown_secs: env_or("TRAINING_COUNTDOWN_SECS", defaults.countdown_secs)?,
            auto_complete_delay_ms: env_or(
                "TRAINING_AUTO_COMPLETE_DELAY_MS",
                defaults.auto_complete_delay_ms,
            )?,
            side_switch_secs: env_or("TRAINING_SIDE_SWITCH_SECS", defaults.side_switch_secs)?,
            transition_secs: env_or("TRAINING_TRANSITION_SECS", defaults.transition_secs)?,
            kcal_per_active_minute: env_or(
                "TRAINING_KCAL_PER_ACTIVE_MINUTE",
                defaults.kcal_per_active_minute,
            )?,
            tick_interval_ms: env_or("TRAINING_TICK_INTERVAL_MS", defaults.tick_interval_ms)?,
        })
    }

    /// Countdown as a duration
    #[must_use]
    pub const fn countdown(&self) -> Duration {
        Duration::from_secs(self.countdown_secs)
    }

    /// Auto-complete delay as a duration
    #[must_use]
    pub const fn auto_complete_delay(&self) -> Duration {
        Duration::from_millis(self.auto_complete_delay_ms)
    }

    /// Runner tick as a duration
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Validate ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRange` for a zero countdown or tick, or a negative calorie rate
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.countdown_secs == 0 {
            return Err(ConfigError::InvalidRange("countdown_secs must be positive"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidRange("tick_interval_ms must be positive"));
        }
        if !self.kcal_per_active_minute.is_finite() || self.kcal_per_active_minute < 0.0 {
            return Err(ConfigError::InvalidRange(
                "kcal_per_active_minute must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// Pose analysis tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum dwell in a joint phase before a transition counts
    pub min_dwell_ms: u64,
    /// Invalid-pose window before a form advisory
    pub low_confidence_window_ms: u64,
    /// Hold time before alignment is confirmed
    pub alignment_hold_ms: u64,
    /// Tilt tolerance for the level check
    pub level_tolerance_deg: f32,
    /// Hold time for the level check
    pub level_hold_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_dwell_ms: reps::MIN_DWELL_MS,
            low_confidence_window_ms: reps::LOW_CONFIDENCE_WINDOW_MS,
            alignment_hold_ms: alignment::HOLD_MS,
            level_tolerance_deg: alignment::LEVEL_TOLERANCE_DEG,
            level_hold_ms: alignment::LEVEL_HOLD_MS,
        }
    }
}

impl AnalysisConfig {
    /// Load analysis configuration from environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed values
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            min_dwell_ms: env_or("TRAINING_MIN_DWELL_MS", defaults.min_dwell_ms)?,
            low_confidence_window_ms: env_or(
                "TRAINING_LOW_CONFIDENCE_WINDOW_MS",
                defaults.low_confidence_window_ms,
            )?,
            alignment_hold_ms: env_or("TRAINING_ALIGNMENT_HOLD_MS", defaults.alignment_hold_ms)?,
            level_tolerance_deg: env_or(
                "TRAINING_LEVEL_TOLERANCE_DEG",
                defaults.level_tolerance_deg,
            )?,
            level_hold_ms: env_or("TRAINING_LEVEL_HOLD_MS", defaults.level_hold_ms)?,
        })
    }

    /// Rep counter tuning derived from this configuration
    #[must_use]
    pub const fn rep_counter(&self) -> RepCounterConfig {
        RepCounterConfig {
            min_dwell_ms: self.min_dwell_ms,
            low_confidence_window_ms: self.low_confidence_window_ms,
        }
    }

    /// Validate ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRange` when the level tolerance is outside 0-90 degrees
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=90.0).contains(&self.level_tolerance_deg) {
            return Err(ConfigError::InvalidRange(
                "level_tolerance_deg must be within 0-90",
            ));
        }
        Ok(())
    }
}

/// Frame stream tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Consecutive failed inference ticks before an advisory
    pub failure_threshold: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            failure_threshold: stream::FAILURE_THRESHOLD,
        }
    }
}

impl StreamConfig {
    /// Load stream configuration from environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed values
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            failure_threshold: env_or(
                "TRAINING_FRAME_FAILURE_THRESHOLD",
                stream::FAILURE_THRESHOLD,
            )?,
        })
    }

    /// Validate the escalation threshold
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidThresholds` for a zero threshold
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::InvalidThresholds(
                "failure_threshold must be positive",
            ));
        }
        Ok(())
    }
}

/// Audio feedback tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Minimum gap between cues on the same channel
    pub cooldown_ms: u64,
    /// Speak the rep count after every rep
    pub announce_reps: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: feedback::COOLDOWN_MS,
            announce_reps: true,
        }
    }
}

impl FeedbackConfig {
    /// Load feedback configuration from environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed values
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cooldown_ms: env_or("TRAINING_FEEDBACK_COOLDOWN_MS", feedback::COOLDOWN_MS)?,
            announce_reps: env_flag("TRAINING_ANNOUNCE_REPS", true)?,
        })
    }

    /// Cooldown as a duration
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Pose model bootstrap options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Warm up each backend's rendering context before loading
    pub prewarm: bool,
    /// Upper bound for pre-warm plus model load of one backend
    pub load_timeout_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            prewarm: true,
            load_timeout_ms: bootstrap::LOAD_TIMEOUT_MS,
        }
    }
}

impl BootstrapConfig {
    /// Load bootstrap configuration from environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed values
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            prewarm: env_flag("TRAINING_PREWARM_BACKEND", true)?,
            load_timeout_ms: env_or("TRAINING_BACKEND_LOAD_TIMEOUT_MS", bootstrap::LOAD_TIMEOUT_MS)?,
        })
    }

    /// Backend load timeout as a duration
    #[must_use]
    pub const fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

/// Complete training core configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Session phase timing
    pub session: SessionConfig,
    /// Pose analysis tuning
    pub analysis: AnalysisConfig,
    /// Frame stream tuning
    pub stream: StreamConfig,
    /// Audio feedback tuning
    pub feedback: FeedbackConfig,
    /// Pose model bootstrap options
    pub bootstrap: BootstrapConfig,
}

impl TrainingConfig {
    /// Load and validate the full configuration from environment
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for malformed or out-of-range values
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            session: SessionConfig::from_env()?,
            analysis: AnalysisConfig::from_env()?,
            stream: StreamConfig::from_env()?,
            feedback: FeedbackConfig::from_env()?,
            bootstrap: BootstrapConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first section error found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.analysis.validate()?;
        self.stream.validate()
    }
}
