// ABOUTME: Collaborator interfaces implemented outside the training core
// ABOUTME: Camera, pose detector, speech, training API, photo storage, gallery, and media players
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! External Collaborators
//!
//! The core never talks to a device or a server directly. Platform code
//! implements these traits and hands them to the session runner or the photo
//! capture flow.

/// Live camera frames for pose inference
pub mod camera;
/// Pose detection model and inference backends
pub mod detector;
/// Media players registered for pause/resume broadcasting
pub mod media;
/// Persistent photo storage, device gallery, and still camera
pub mod photo_store;
/// Audio cues and text-to-speech
pub mod speech;
/// Training plan REST API
pub mod training_api;

pub use camera::{CameraFrame, CameraSource};
pub use detector::{BackendError, BackendKind, InferenceBackend, PoseDetector};
pub use media::MediaPlayer;
pub use photo_store::{MediaGallery, PhotoCamera, PhotoStore};
pub use speech::SpeechService;
pub use training_api::{ExerciseResult, TrainingApi};

use serde::{Deserialize, Serialize};

/// Outcome of a platform permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// The user allowed access
    Granted,
    /// The user refused access
    Denied,
}

impl PermissionStatus {
    /// Whether access was allowed
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}
