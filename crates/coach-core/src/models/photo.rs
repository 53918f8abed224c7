// ABOUTME: Body-progress photo models for the pose-guided capture flow
// ABOUTME: Transient captures become persisted progress photos grouped into dated batches
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which side of the body a progress photo shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoSide {
    /// Facing the camera
    Front,
    /// Back to the camera
    Back,
    /// Left side toward the camera
    Left,
    /// Right side toward the camera
    Right,
}

impl PhotoSide {
    /// Capture order of a full batch
    pub const ALL: [Self; 4] = [Self::Front, Self::Back, Self::Left, Self::Right];

    /// The side captured after this one, if any
    #[must_use]
    pub fn next(self) -> Option<Self> {
        let position = Self::ALL.iter().position(|side| *side == self)?;
        Self::ALL.get(position + 1).copied()
    }

    /// Lowercase name used in file names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for PhotoSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A photo taken into temporary storage, not yet committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPhoto {
    /// Side shown
    pub side: PhotoSide,
    /// Temporary location written by the camera
    pub temp_uri: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// File size in bytes
    pub size: u64,
}

/// A committed progress photo as stored in the per-user index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPhoto {
    /// Photo identifier
    pub id: Uuid,
    /// Side shown
    pub side: PhotoSide,
    /// Permanent location
    pub uri: String,
    /// Batch the photo belongs to
    pub batch_date: NaiveDate,
    /// When the photo was committed
    pub created_at: DateTime<Utc>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// File size in bytes
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_order_covers_batch() {
        assert_eq!(PhotoSide::Front.next(), Some(PhotoSide::Back));
        assert_eq!(PhotoSide::Left.next(), Some(PhotoSide::Right));
        assert_eq!(PhotoSide::Right.next(), None);
    }
}
