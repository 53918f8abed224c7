// ABOUTME: Photo capture state machine from camera permission to a saved four-side batch
// ABOUTME: Pose alignment against a side silhouette starts the shutter countdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Photo Capture Flow
//!
//! `permission → phone_position → position_ready → countdown → capture → preview
//! → (retake | next side) → final → saved`
//!
//! The phone must be held in portrait before alignment is checked. Once the
//! user fills the side's silhouette for the hold time, the countdown starts on
//! its own; losing alignment during the countdown goes back to `position_ready`.

use super::commit::commit_batch;
use crate::external::{MediaGallery, PhotoCamera, PhotoStore};
use chrono::NaiveDate;
use coach_core::constants::capture::COUNTDOWN_SECS;
use coach_core::errors::{AppError, AppResult};
use coach_core::models::{CapturedPhoto, PhotoSide, PoseFrame, ProgressPhoto};
use coach_vision::{AlignmentDetector, DeviceOrientation, GyroReading, Silhouette};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::iter;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Step of the capture flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStep {
    /// Waiting for camera access
    Permission,
    /// Waiting for the phone to be held in portrait
    PhonePosition,
    /// Waiting for the user to fill the silhouette
    PositionReady,
    /// Shutter countdown running
    Countdown,
    /// Countdown over; take the photo
    Capture,
    /// Showing the photo just taken
    Preview,
    /// All four sides captured; ready to commit
    Final,
    /// Batch committed
    Saved,
}

impl CaptureStep {
    /// Snake-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Permission => "permission",
            Self::PhonePosition => "phone_position",
            Self::PositionReady => "position_ready",
            Self::Countdown => "countdown",
            Self::Capture => "capture",
            Self::Preview => "preview",
            Self::Final => "final",
            Self::Saved => "saved",
        }
    }
}

impl fmt::Display for CaptureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capture state for one photo batch
#[derive(Debug, Clone)]
pub struct PhotoCaptureFlow {
    step: CaptureStep,
    side: PhotoSide,
    alignment: AlignmentDetector,
    countdown: Duration,
    countdown_left: Duration,
    photos: BTreeMap<PhotoSide, CapturedPhoto>,
    discarded: Vec<String>,
}

impl PhotoCaptureFlow {
    /// New flow starting at the front side with the default shutter countdown
    #[must_use]
    pub fn new(alignment_hold_ms: u64) -> Self {
        Self::with_countdown(alignment_hold_ms, Duration::from_secs(COUNTDOWN_SECS))
    }

    /// New flow with a custom shutter countdown
    #[must_use]
    pub fn with_countdown(alignment_hold_ms: u64, countdown: Duration) -> Self {
        Self {
            step: CaptureStep::Permission,
            side: PhotoSide::Front,
            alignment: AlignmentDetector::new(
                Silhouette::for_photo_side(PhotoSide::Front),
                alignment_hold_ms,
            ),
            countdown,
            countdown_left: countdown,
            photos: BTreeMap::new(),
            discarded: Vec::new(),
        }
    }

    /// Current step
    #[must_use]
    pub const fn step(&self) -> CaptureStep {
        self.step
    }

    /// Side being captured
    #[must_use]
    pub const fn side(&self) -> PhotoSide {
        self.side
    }

    /// Whether the user fills the current silhouette
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.alignment.is_aligned()
    }

    /// Time left on the shutter countdown
    #[must_use]
    pub fn countdown_remaining(&self) -> Option<Duration> {
        (self.step == CaptureStep::Countdown).then_some(self.countdown_left)
    }

    /// Captured photos, one per side
    #[must_use]
    pub const fn photos(&self) -> &BTreeMap<PhotoSide, CapturedPhoto> {
        &self.photos
    }

    /// Photo of one side, if captured
    #[must_use]
    pub fn photo(&self, side: PhotoSide) -> Option<&CapturedPhoto> {
        self.photos.get(&side)
    }

    /// Temporary files replaced by retakes
    #[must_use]
    pub fn discarded(&self) -> &[String] {
        &self.discarded
    }

    /// Only the position and countdown steps consume pose frames
    #[must_use]
    pub fn wants_frames(&self) -> bool {
        matches!(self.step, CaptureStep::PositionReady | CaptureStep::Countdown)
    }

    fn go_to(&mut self, step: CaptureStep) {
        if self.step != step {
            debug!(from = %self.step, to = %step, side = %self.side, "Capture step changed");
            self.step = step;
        }
    }

    fn expect_step(&self, expected: CaptureStep, action: &str) -> AppResult<()> {
        if self.step == expected {
            Ok(())
        } else {
            Err(AppError::invalid_transition(action, self.step))
        }
    }

    fn position_side(&mut self, side: PhotoSide) {
        self.side = side;
        self.alignment.set_silhouette(Silhouette::for_photo_side(side));
        self.alignment.reset();
        self.countdown_left = self.countdown;
        self.go_to(CaptureStep::PositionReady);
    }

    /// Ask for camera access; a denial keeps the flow on the permission step
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when refused, or `InvalidTransition` outside
    /// the permission step
    pub async fn request_permission(&mut self, camera: &mut dyn PhotoCamera) -> AppResult<()> {
        self.expect_step(CaptureStep::Permission, "request camera permission")?;
        if !camera.request_permission().await.is_granted() {
            return Err(AppError::permission_denied("camera"));
        }
        self.go_to(CaptureStep::PhonePosition);
        Ok(())
    }

    /// Feed a gyroscope reading; the phone must be in portrait to proceed
    pub fn on_gyro_reading(&mut self, reading: &GyroReading) {
        let portrait = reading.orientation() == DeviceOrientation::Portrait;
        match self.step {
            CaptureStep::PhonePosition if portrait => self.position_side(self.side),
            CaptureStep::PositionReady | CaptureStep::Countdown if !portrait => {
                self.alignment.reset();
                self.go_to(CaptureStep::PhonePosition);
            }
            _ => {}
        }
    }

    /// Feed a pose frame to the alignment check
    pub fn on_pose_frame(&mut self, frame: &PoseFrame) {
        if !self.wants_frames() {
            return;
        }
        let update = self.alignment.on_pose_frame(frame);
        match self.step {
            CaptureStep::PositionReady if update.confirmed => {
                self.countdown_left = self.countdown;
                self.go_to(CaptureStep::Countdown);
            }
            CaptureStep::Countdown if !update.aligned => {
                self.alignment.reset();
                self.countdown_left = self.countdown;
                self.go_to(CaptureStep::PositionReady);
            }
            _ => {}
        }
    }

    /// Let time pass on the shutter countdown
    pub fn advance(&mut self, dt: Duration) {
        if self.step != CaptureStep::Countdown {
            return;
        }
        self.countdown_left = self.countdown_left.saturating_sub(dt);
        if self.countdown_left.is_zero() {
            self.go_to(CaptureStep::Capture);
        }
    }

    /// Take the photo of the current side
    ///
    /// A previous photo of the same side is replaced; its temporary file is
    /// queued for deletion.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` before the countdown ends, or the camera's error
    pub async fn capture(&mut self, camera: &mut dyn PhotoCamera) -> AppResult<&CapturedPhoto> {
        self.expect_step(CaptureStep::Capture, "capture photo")?;
        let mut photo = camera.take_photo(self.side).await?;
        photo.side = self.side;
        info!(side = %self.side, width = photo.width, height = photo.height, "Photo captured");
        if let Some(previous) = self.photos.insert(self.side, photo) {
            self.discarded.push(previous.temp_uri);
        }
        self.go_to(CaptureStep::Preview);
        self.photos
            .get(&self.side)
            .ok_or_else(|| AppError::internal("captured photo missing"))
    }

    /// Take the current side again
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside the preview
    pub fn retake(&mut self) -> AppResult<()> {
        self.expect_step(CaptureStep::Preview, "retake photo")?;
        self.position_side(self.side);
        Ok(())
    }

    /// Take one side again from the preview or the final review
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside the preview and final steps
    pub fn retake_side(&mut self, side: PhotoSide) -> AppResult<()> {
        if !matches!(self.step, CaptureStep::Preview | CaptureStep::Final) {
            return Err(AppError::invalid_transition("retake side", self.step));
        }
        self.position_side(side);
        Ok(())
    }

    /// Accept the preview and move to the next missing side, or to the final review
    ///
    /// Sides following the current one are tried first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside the preview
    pub fn next_side(&mut self) -> AppResult<CaptureStep> {
        self.expect_step(CaptureStep::Preview, "accept photo")?;
        let missing = iter::successors(self.side.next(), |side| side.next())
            .chain(PhotoSide::ALL)
            .find(|side| !self.photos.contains_key(side));
        match missing {
            Some(side) => self.position_side(side),
            None => self.go_to(CaptureStep::Final),
        }
        Ok(self.step)
    }

    /// Commit the batch; on failure the flow stays on the final step for a retry
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` before all four sides are captured, or the
    /// storage error that aborted the commit
    pub async fn commit(
        &mut self,
        store: &dyn PhotoStore,
        gallery: Option<&dyn MediaGallery>,
        user_id: &str,
        batch_date: NaiveDate,
    ) -> AppResult<Vec<ProgressPhoto>> {
        self.expect_step(CaptureStep::Final, "commit photos")?;
        let photos: Vec<CapturedPhoto> = self.photos.values().cloned().collect();
        let committed = commit_batch(store, gallery, user_id, batch_date, &photos).await?;

        for uri in self.discarded.drain(..) {
            if let Err(error) = store.delete(&uri).await {
                warn!(uri = %uri, error = %error, "Failed to delete replaced capture");
            }
        }
        self.go_to(CaptureStep::Saved);
        Ok(committed)
    }
}
