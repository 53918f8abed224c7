// ABOUTME: Pose-guided body-progress photo capture and batch commit
// ABOUTME: Alignment-gated auto countdown, stream-driven runner, per-side retakes, atomic four-side commit
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Batch commit into persistent storage
pub mod commit;
/// Capture state machine
pub mod flow;
/// Filesystem-backed photo store
pub mod fs_store;
/// Async driver wiring the flow to the pose stream and the still camera
pub mod runner;

pub use commit::commit_batch;
pub use flow::{CaptureStep, PhotoCaptureFlow};
pub use fs_store::FsPhotoStore;
pub use runner::{CaptureCommand, CaptureDeps, CaptureHandle, CaptureSnapshot, PhotoCaptureRunner};
