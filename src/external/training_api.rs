// ABOUTME: Training plan REST API consumed at phase boundaries
// ABOUTME: Failures are recoverable and never block local session progress
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use coach_core::errors::AppResult;
use coach_core::models::{SessionReport, TrainingPlan};
use serde::{Deserialize, Serialize};

/// Result of one finished exercise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseResult {
    /// Exercise identifier
    pub exercise_id: String,
    /// Total reps over all sets
    pub reps: u32,
    /// Reps per set
    pub reps_per_set: Vec<u32>,
    /// Form advisories raised while performing it
    pub errors: Vec<String>,
}

/// Remote training plan service
#[async_trait]
pub trait TrainingApi: Send + Sync {
    /// Fetch today's plan for a user
    ///
    /// # Errors
    ///
    /// Returns a network error if the plan cannot be fetched
    async fn get_plan(&self, user_id: &str) -> AppResult<TrainingPlan>;

    /// Record one finished exercise
    ///
    /// # Errors
    ///
    /// Returns a network error if the result cannot be saved
    async fn submit_exercise_result(&self, session_id: &str, result: &ExerciseResult)
        -> AppResult<()>;

    /// Close the session with its final metrics
    ///
    /// # Errors
    ///
    /// Returns a network error if the session cannot be closed
    async fn complete_session(&self, session_id: &str, metrics: &SessionReport) -> AppResult<()>;
}
