// ABOUTME: Filesystem photo store with a JSON index per user
// ABOUTME: Layout is <root>/<user>/index.json and <root>/<user>/<batch-date>/<side>-<uuid>.jpg
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::external::PhotoStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use coach_core::constants::capture::INDEX_FILE_NAME;
use coach_core::errors::{AppError, AppResult};
use coach_core::models::{PhotoSide, ProgressPhoto};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// Photo store rooted at a directory
#[derive(Debug, Clone)]
pub struct FsPhotoStore {
    root: PathBuf,
}

impl FsPhotoStore {
    /// Store rooted at `root`; directories are created on demand
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The user id must be a single plain path segment
    fn user_dir(&self, user_id: &str) -> AppResult<PathBuf> {
        let mut components = Path::new(user_id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !user_id.contains(['/', '\\']) => {
                Ok(self.root.join(user_id))
            }
            _ => Err(AppError::invalid_input(format!(
                "user id {user_id:?} is not a valid storage name"
            ))),
        }
    }

    fn index_path(&self, user_id: &str) -> AppResult<PathBuf> {
        Ok(self.user_dir(user_id)?.join(INDEX_FILE_NAME))
    }
}

async fn ensure_parent(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|error| {
            AppError::storage(format!("cannot create {}", parent.display())).with_source(error)
        })?;
    }
    Ok(())
}

#[async_trait]
impl PhotoStore for FsPhotoStore {
    fn permanent_uri(
        &self,
        user_id: &str,
        batch_date: NaiveDate,
        side: PhotoSide,
        id: Uuid,
    ) -> AppResult<String> {
        Ok(self
            .user_dir(user_id)?
            .join(batch_date.to_string())
            .join(format!("{side}-{id}.jpg"))
            .to_string_lossy()
            .into_owned())
    }

    async fn move_file(&self, from: &str, to: &str) -> AppResult<()> {
        let target = Path::new(to);
        ensure_parent(target).await?;
        if let Err(rename_error) = fs::rename(from, target).await {
            // rename cannot cross filesystems; fall back to copy and remove
            debug!(from = %from, to = %to, error = %rename_error, "Rename failed, copying");
            fs::copy(from, target).await.map_err(|error| {
                AppError::storage(format!("cannot move {from} to {to}")).with_source(error)
            })?;
            fs::remove_file(from).await?;
        }
        Ok(())
    }

    async fn read_index(&self, user_id: &str) -> AppResult<Vec<ProgressPhoto>> {
        match fs::read(self.index_path(user_id)?).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(error) => Err(AppError::storage(format!(
                "cannot read photo index for {user_id}"
            ))
            .with_source(error)),
        }
    }

    async fn write_index(&self, user_id: &str, entries: &[ProgressPhoto]) -> AppResult<()> {
        let path = self.index_path(user_id)?;
        ensure_parent(&path).await?;
        let body = serde_json::to_vec_pretty(entries)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, body).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn delete(&self, uri: &str) -> AppResult<()> {
        match fs::remove_file(uri).await {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                Err(AppError::storage(format!("cannot delete {uri}")).with_source(error))
            }
            _ => Ok(()),
        }
    }
}
