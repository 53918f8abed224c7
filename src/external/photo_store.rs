// ABOUTME: Persistent photo storage, device gallery, and still camera interfaces
// ABOUTME: Used by the photo capture flow and its batch commit
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::PermissionStatus;
use async_trait::async_trait;
use chrono::NaiveDate;
use coach_core::errors::AppResult;
use coach_core::models::{CapturedPhoto, PhotoSide, ProgressPhoto};
use uuid::Uuid;

/// Per-user permanent photo storage with an index of committed photos
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Permanent location for a photo
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `user_id` cannot name a storage location
    fn permanent_uri(
        &self,
        user_id: &str,
        batch_date: NaiveDate,
        side: PhotoSide,
        id: Uuid,
    ) -> AppResult<String>;

    /// Move a file, creating parent locations as needed
    ///
    /// # Errors
    ///
    /// Returns a storage error if the move fails
    async fn move_file(&self, from: &str, to: &str) -> AppResult<()>;

    /// Read the user's photo index; empty when none exists
    ///
    /// # Errors
    ///
    /// Returns a storage error if the index cannot be read or parsed
    async fn read_index(&self, user_id: &str) -> AppResult<Vec<ProgressPhoto>>;

    /// Replace the user's photo index
    ///
    /// # Errors
    ///
    /// Returns a storage error if the index cannot be written
    async fn write_index(&self, user_id: &str, entries: &[ProgressPhoto]) -> AppResult<()>;

    /// Delete a file; deleting a missing file succeeds
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file exists but cannot be removed
    async fn delete(&self, uri: &str) -> AppResult<()>;
}

/// Device media gallery mirror
#[async_trait]
pub trait MediaGallery: Send + Sync {
    /// Ask the user for gallery access
    async fn request_permission(&self) -> PermissionStatus;

    /// Copy a committed photo into the gallery
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails
    async fn save(&self, uri: &str) -> AppResult<()>;
}

/// Still camera used by the photo capture flow
#[async_trait]
pub trait PhotoCamera: Send {
    /// Ask the user for camera access
    async fn request_permission(&mut self) -> PermissionStatus;

    /// Take one photo into temporary storage
    ///
    /// # Errors
    ///
    /// Returns an error if the shutter or the temporary write fails
    async fn take_photo(&mut self, side: PhotoSide) -> AppResult<CapturedPhoto>;
}
