// ABOUTME: Tests for environment-backed training configuration
// ABOUTME: Defaults, malformed values, range validation, and flags
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(missing_docs)]

mod common;

use guided_training::config::{ConfigError, SessionConfig, StreamConfig, TrainingConfig};
use guided_training::errors::{AppError, ErrorCode};
use serial_test::serial;
use std::env;
use std::time::Duration;

const VARS: &[&str] = &[
    "TRAINING_COUNTDOWN_SECS",
    "TRAINING_TICK_INTERVAL_MS",
    "TRAINING_FRAME_FAILURE_THRESHOLD",
    "TRAINING_ANNOUNCE_REPS",
    "TRAINING_PREWARM_BACKEND",
    "TRAINING_LEVEL_TOLERANCE_DEG",
    "TRAINING_MIN_DWELL_MS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_when_unset() {
    clear_env();

    let config = TrainingConfig::from_env().unwrap();

    assert_eq!(config.session.countdown(), Duration::from_secs(5));
    assert_eq!(config.session.auto_complete_delay(), Duration::from_millis(1_500));
    assert_eq!(config.session.tick_interval(), Duration::from_millis(100));
    assert_eq!(config.analysis.min_dwell_ms, 200);
    assert_eq!(config.analysis.rep_counter().low_confidence_window_ms, 3_000);
    assert_eq!(config.stream.failure_threshold, 15);
    assert_eq!(config.feedback.cooldown(), Duration::from_secs(2));
    assert!(config.feedback.announce_reps);
    assert!(config.bootstrap.prewarm);
}

#[test]
#[serial]
fn test_overrides_are_read() {
    clear_env();
    env::set_var("TRAINING_COUNTDOWN_SECS", " 3 ");
    env::set_var("TRAINING_MIN_DWELL_MS", "250");
    env::set_var("TRAINING_ANNOUNCE_REPS", "0");
    env::set_var("TRAINING_PREWARM_BACKEND", "false");

    let config = TrainingConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.session.countdown_secs, 3);
    assert_eq!(config.analysis.min_dwell_ms, 250);
    assert!(!config.feedback.announce_reps);
    assert!(!config.bootstrap.prewarm);
}

#[test]
#[serial]
fn test_malformed_value_names_the_variable() {
    clear_env();
    env::set_var("TRAINING_TICK_INTERVAL_MS", "fast");

    let result = SessionConfig::from_env();
    clear_env();

    match result {
        Err(ConfigError::Parse { key, value }) => {
            assert_eq!(key, "TRAINING_TICK_INTERVAL_MS");
            assert_eq!(value, "fast");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
#[serial]
fn test_unknown_flag_value_is_rejected() {
    clear_env();
    env::set_var("TRAINING_ANNOUNCE_REPS", "sometimes");

    let result = TrainingConfig::from_env();
    clear_env();

    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
#[serial]
fn test_zero_failure_threshold_is_invalid() {
    clear_env();
    env::set_var("TRAINING_FRAME_FAILURE_THRESHOLD", "0");

    let result = TrainingConfig::from_env();
    clear_env();

    assert!(matches!(result, Err(ConfigError::InvalidThresholds(_))));
}

#[test]
#[serial]
fn test_out_of_range_values_are_invalid() {
    clear_env();
    env::set_var("TRAINING_COUNTDOWN_SECS", "0");
    assert!(matches!(
        TrainingConfig::from_env(),
        Err(ConfigError::InvalidRange(_))
    ));

    env::set_var("TRAINING_COUNTDOWN_SECS", "5");
    env::set_var("TRAINING_LEVEL_TOLERANCE_DEG", "120");
    assert!(matches!(
        TrainingConfig::from_env(),
        Err(ConfigError::InvalidRange(_))
    ));
    clear_env();
}

#[test]
fn test_config_error_becomes_app_error() {
    let error = StreamConfig {
        failure_threshold: 0,
    }
    .validate()
    .unwrap_err();

    let app_error: AppError = error.into();

    assert_eq!(app_error.code, ErrorCode::ConfigInvalid);
    assert!(app_error.message.contains("failure_threshold"));
}
