// ABOUTME: Tests for the filesystem-backed photo store
// ABOUTME: Directory layout, user id confinement, index persistence, and batch commits on disk
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(missing_docs)]

mod common;

use chrono::{NaiveDate, Utc};
use common::init_test_logging;
use guided_training::capture::{commit_batch, FsPhotoStore};
use guided_training::errors::ErrorCode;
use guided_training::external::PhotoStore;
use guided_training::models::{CapturedPhoto, PhotoSide, ProgressPhoto};
use std::path::Path;
use tempfile::TempDir;
use uuid::Uuid;

fn batch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

fn store() -> (TempDir, FsPhotoStore) {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let store = FsPhotoStore::new(dir.path().join("photos"));
    (dir, store)
}

fn write_temp(dir: &TempDir, name: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, b"jpeg").unwrap();
    path.to_string_lossy().into_owned()
}

fn captured_batch(dir: &TempDir) -> Vec<CapturedPhoto> {
    PhotoSide::ALL
        .iter()
        .map(|side| CapturedPhoto {
            side: *side,
            temp_uri: write_temp(dir, &format!("{side}.jpg")),
            width: 1080,
            height: 1920,
            size: 4,
        })
        .collect()
}

#[test]
fn test_permanent_uri_layout() {
    let (_dir, store) = store();
    let id = Uuid::new_v4();

    let uri = store
        .permanent_uri("user-1", batch_date(), PhotoSide::Left, id)
        .unwrap();

    let expected = store
        .root()
        .join("user-1")
        .join("2025-03-01")
        .join(format!("left-{id}.jpg"));
    assert_eq!(Path::new(&uri), expected);
}

#[test]
fn test_user_ids_that_escape_the_root_are_rejected() {
    let (_dir, store) = store();

    for user_id in ["/etc", "../../outside", "..", ".", "", "a/b", "a\\b", "user-1/"] {
        let err = store
            .permanent_uri(user_id, batch_date(), PhotoSide::Front, Uuid::new_v4())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput, "user id {user_id:?}");
    }
}

#[tokio::test]
async fn test_index_access_rejects_escaping_user_ids() {
    let (dir, store) = store();

    let write = store.write_index("../escaped", &[]).await;
    let read = store.read_index("/etc").await;

    assert_eq!(write.unwrap_err().code, ErrorCode::InvalidInput);
    assert_eq!(read.unwrap_err().code, ErrorCode::InvalidInput);
    assert!(!dir.path().join("escaped").exists());
}

#[tokio::test]
async fn test_commit_for_an_escaping_user_id_moves_nothing() {
    let (dir, store) = store();
    let photos = captured_batch(&dir);

    let err = commit_batch(&store, None, "../outside", batch_date(), &photos)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidInput);
    for photo in &photos {
        assert!(Path::new(&photo.temp_uri).exists());
    }
    assert!(!dir.path().join("outside").exists());
}

#[tokio::test]
async fn test_move_creates_parent_directories() {
    let (dir, store) = store();
    let temp = write_temp(&dir, "shot.jpg");
    let target = store
        .permanent_uri("user-1", batch_date(), PhotoSide::Front, Uuid::new_v4())
        .unwrap();

    store.move_file(&temp, &target).await.unwrap();

    assert!(Path::new(&target).exists());
    assert!(!Path::new(&temp).exists());
}

#[tokio::test]
async fn test_missing_index_reads_as_empty() {
    let (_dir, store) = store();

    let entries = store.read_index("nobody").await.unwrap();

    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_index_is_written_and_read_back() {
    let (_dir, store) = store();
    let entry = ProgressPhoto {
        id: Uuid::new_v4(),
        side: PhotoSide::Back,
        uri: "somewhere/back.jpg".to_owned(),
        batch_date: batch_date(),
        created_at: Utc::now(),
        width: 1080,
        height: 1920,
        size: 4,
    };

    store
        .write_index("user-1", std::slice::from_ref(&entry))
        .await
        .unwrap();
    let entries = store.read_index("user-1").await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, entry.id);
    assert_eq!(entries[0].side, PhotoSide::Back);
    let user_dir = store.root().join("user-1");
    assert!(user_dir.join("index.json").exists());
    assert!(!user_dir.join("index.json.tmp").exists());
}

#[tokio::test]
async fn test_deleting_a_missing_file_succeeds() {
    let (dir, store) = store();
    let missing = dir.path().join("gone.jpg");

    store.delete(&missing.to_string_lossy()).await.unwrap();
}

#[tokio::test]
async fn test_batch_commit_on_disk() {
    let (dir, store) = store();
    let photos = captured_batch(&dir);

    let committed = commit_batch(&store, None, "user-1", batch_date(), &photos)
        .await
        .unwrap();

    assert_eq!(committed.len(), 4);
    for photo in &photos {
        assert!(!Path::new(&photo.temp_uri).exists());
    }
    for entry in &committed {
        assert!(Path::new(&entry.uri).exists());
    }
    assert_eq!(store.read_index("user-1").await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_failed_move_leaves_earlier_files_in_place() {
    let (dir, store) = store();
    let mut photos = captured_batch(&dir);
    photos[2].temp_uri = dir.path().join("never-written.jpg").to_string_lossy().into_owned();

    let result = commit_batch(&store, None, "user-1", batch_date(), &photos).await;

    assert!(result.is_err());
    assert!(Path::new(&photos[0].temp_uri).exists());
    assert!(Path::new(&photos[1].temp_uri).exists());
    assert!(store.read_index("user-1").await.unwrap().is_empty());
}
