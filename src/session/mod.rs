// ABOUTME: Guided training session orchestration: state machine, timers, onboarding, and async runner
// ABOUTME: The machine is the single writer of the training session; UIs read snapshots
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Session orchestration
//!
//! - [`SessionMachine`]: synchronous phase logic, driven by commands, frames and time
//! - [`SessionRunner`]: async loop wiring the machine to the camera, detector,
//!   feedback, media players and the training API

/// Session events and read projections
pub mod events;
/// Synchronous session state machine
pub mod machine;
/// Onboarding sub-machine
pub mod onboarding;
/// Async session runner
pub mod runner;
/// Timer handles owned by the machine
pub mod timers;

pub use events::{SessionEvent, SessionSnapshot};
pub use machine::{SessionMachine, Suspension};
pub use onboarding::{Onboarding, OnboardingMode};
pub use runner::{PendingSubmission, SessionCommand, SessionDeps, SessionHandle, SessionRunner};
pub use timers::{TimerHandle, TimerKind, Timers};
