// ABOUTME: Camera frame source consumed by the pose stream processor
// ABOUTME: Frames are pulled on demand while attached and never queued
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::PermissionStatus;
use async_trait::async_trait;
use bytes::Bytes;
use coach_core::errors::AppResult;

/// One raw camera frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Capture time in milliseconds on the camera clock
    pub timestamp_ms: u64,
    /// Encoded or raw pixel data; opaque to the core
    pub pixels: Bytes,
}

/// Live camera feed
#[async_trait]
pub trait CameraSource: Send {
    /// Ask the user for camera access
    async fn request_permission(&mut self) -> PermissionStatus;

    /// Begin delivering frames
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened
    async fn start(&mut self) -> AppResult<()>;

    /// Wait for the next frame; `None` when the feed has ended
    async fn next_frame(&mut self) -> Option<CameraFrame>;

    /// Whether the camera view currently has focus
    fn is_focused(&self) -> bool;

    /// Stop delivering frames and free the device; `start` may be called again
    fn release(&mut self);
}
