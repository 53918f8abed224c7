// ABOUTME: Atomic commit of a four-side photo batch into the persistent store and index
// ABOUTME: Moves are undone on failure; gallery mirroring never fails the commit
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::external::{MediaGallery, PhotoStore};
use crate::logging::SessionLogger;
use chrono::{NaiveDate, Utc};
use coach_core::errors::{AppError, AppResult};
use coach_core::models::{CapturedPhoto, PhotoSide, ProgressPhoto};
use std::collections::BTreeSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Commit a captured batch for `batch_date`
///
/// Each temporary file is moved into permanent storage, then the user's index
/// is rewritten with this batch replacing any earlier entries for the same
/// date and side. Replaced files are deleted after the index is written.
///
/// # Errors
///
/// Returns `InvalidInput` unless the batch holds exactly one photo per side.
/// Returns the storage error of a failed move, index read or index write; in
/// that case every file already moved is moved back and the index is unchanged.
pub async fn commit_batch(
    store: &dyn PhotoStore,
    gallery: Option<&dyn MediaGallery>,
    user_id: &str,
    batch_date: NaiveDate,
    photos: &[CapturedPhoto],
) -> AppResult<Vec<ProgressPhoto>> {
    let sides: BTreeSet<PhotoSide> = photos.iter().map(|photo| photo.side).collect();
    if photos.len() != PhotoSide::ALL.len() || sides.len() != PhotoSide::ALL.len() {
        return Err(AppError::invalid_input(format!(
            "a batch needs one photo per side, got {} photos for {} sides",
            photos.len(),
            sides.len()
        )));
    }

    let batch = batch_date.to_string();
    let mut moved: Vec<(&str, String)> = Vec::with_capacity(photos.len());
    let mut committed = Vec::with_capacity(photos.len());

    for photo in photos {
        let id = Uuid::new_v4();
        let uri = match place(store, user_id, batch_date, photo, id).await {
            Ok(uri) => uri,
            Err(error) => {
                rollback(store, &moved).await;
                SessionLogger::log_photo_commit(user_id, &batch, photos.len(), false);
                return Err(error);
            }
        };
        moved.push((photo.temp_uri.as_str(), uri.clone()));
        committed.push(ProgressPhoto {
            id,
            side: photo.side,
            uri,
            batch_date,
            created_at: Utc::now(),
            width: photo.width,
            height: photo.height,
            size: photo.size,
        });
    }

    let existing = match store.read_index(user_id).await {
        Ok(entries) => entries,
        Err(error) => {
            rollback(store, &moved).await;
            SessionLogger::log_photo_commit(user_id, &batch, photos.len(), false);
            return Err(error);
        }
    };

    let (replaced, mut index): (Vec<_>, Vec<_>) = existing
        .into_iter()
        .partition(|entry| entry.batch_date == batch_date && sides.contains(&entry.side));
    index.extend(committed.iter().cloned());
    index.sort_by(|a, b| {
        (a.batch_date, a.side, a.created_at).cmp(&(b.batch_date, b.side, b.created_at))
    });

    if let Err(error) = store.write_index(user_id, &index).await {
        rollback(store, &moved).await;
        SessionLogger::log_photo_commit(user_id, &batch, photos.len(), false);
        return Err(error);
    }

    for entry in &replaced {
        if let Err(error) = store.delete(&entry.uri).await {
            warn!(uri = %entry.uri, error = %error, "Failed to delete replaced photo");
        }
    }

    if let Some(gallery) = gallery {
        mirror_to_gallery(gallery, &committed).await;
    }

    SessionLogger::log_photo_commit(user_id, &batch, committed.len(), true);
    Ok(committed)
}

async fn place(
    store: &dyn PhotoStore,
    user_id: &str,
    batch_date: NaiveDate,
    photo: &CapturedPhoto,
    id: Uuid,
) -> AppResult<String> {
    let uri = store.permanent_uri(user_id, batch_date, photo.side, id)?;
    store.move_file(&photo.temp_uri, &uri).await?;
    Ok(uri)
}

async fn rollback(store: &dyn PhotoStore, moved: &[(&str, String)]) {
    for (temp_uri, permanent_uri) in moved.iter().rev() {
        if let Err(error) = store.move_file(permanent_uri, temp_uri).await {
            warn!(
                from = %permanent_uri,
                to = %temp_uri,
                error = %error,
                "Failed to move photo back during rollback"
            );
        }
    }
}

async fn mirror_to_gallery(gallery: &dyn MediaGallery, photos: &[ProgressPhoto]) {
    if !gallery.request_permission().await.is_granted() {
        info!("Gallery permission denied; photos kept in app storage only");
        return;
    }
    for photo in photos {
        if let Err(error) = gallery.save(&photo.uri).await {
            warn!(side = %photo.side, error = %error, "Failed to mirror photo to gallery");
        }
    }
}
