// ABOUTME: Phone orientation classification and level detection from gyroscope readings
// ABOUTME: Level checks reuse the hold latch so a steady phone is confirmed once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::hold::HoldLatch;
use coach_core::constants::alignment::PORTRAIT_ROLL_LIMIT_DEG;
use serde::{Deserialize, Serialize};

/// How the phone is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOrientation {
    /// Long edge vertical
    Portrait,
    /// Long edge horizontal
    Landscape,
}

impl DeviceOrientation {
    /// Orientation an exercise needs
    #[must_use]
    pub const fn for_exercise(is_horizontal: bool) -> Self {
        if is_horizontal {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }
}

/// One gyroscope/accelerometer sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GyroReading {
    /// Forward/backward deviation from vertical, in degrees
    pub tilt_deg: f32,
    /// Rotation around the screen normal; 0 is upright portrait
    pub roll_deg: f32,
    /// Sample time in milliseconds
    pub timestamp_ms: u64,
}

impl GyroReading {
    /// Orientation implied by the roll angle
    #[must_use]
    pub fn orientation(&self) -> DeviceOrientation {
        if self.roll_deg.abs() < PORTRAIT_ROLL_LIMIT_DEG {
            DeviceOrientation::Portrait
        } else {
            DeviceOrientation::Landscape
        }
    }

    /// Tilt within tolerance of vertical
    #[must_use]
    pub fn is_level(&self, tolerance_deg: f32) -> bool {
        self.tilt_deg.abs() <= tolerance_deg
    }
}

/// Confirms that the phone is level in the expected orientation for a hold time
#[derive(Debug, Clone)]
pub struct LevelDetector {
    expected: DeviceOrientation,
    tolerance_deg: f32,
    latch: HoldLatch,
}

impl LevelDetector {
    /// Create a detector
    #[must_use]
    pub const fn new(expected: DeviceOrientation, tolerance_deg: f32, hold_ms: u64) -> Self {
        Self {
            expected,
            tolerance_deg,
            latch: HoldLatch::new(hold_ms),
        }
    }

    /// Change the expected orientation and restart the hold
    pub fn expect(&mut self, expected: DeviceOrientation) {
        self.expected = expected;
        self.latch.reset();
    }

    /// Feed one reading; returns `true` on the reading that confirms the level hold
    pub fn on_reading(&mut self, reading: &GyroReading) -> bool {
        let steady =
            reading.orientation() == self.expected && reading.is_level(self.tolerance_deg);
        self.latch.update(steady, reading.timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(tilt_deg: f32, roll_deg: f32, timestamp_ms: u64) -> GyroReading {
        GyroReading {
            tilt_deg,
            roll_deg,
            timestamp_ms,
        }
    }

    #[test]
    fn test_orientation_from_roll() {
        assert_eq!(reading(0.0, 10.0, 0).orientation(), DeviceOrientation::Portrait);
        assert_eq!(reading(0.0, -88.0, 0).orientation(), DeviceOrientation::Landscape);
    }

    #[test]
    fn test_level_requires_expected_orientation_and_hold() {
        let mut detector = LevelDetector::new(DeviceOrientation::Portrait, 8.0, 1_000);
        assert!(!detector.on_reading(&reading(3.0, 90.0, 0)));
        assert!(!detector.on_reading(&reading(3.0, 2.0, 100)));
        assert!(!detector.on_reading(&reading(20.0, 2.0, 600)));
        assert!(!detector.on_reading(&reading(2.0, 2.0, 700)));
        assert!(detector.on_reading(&reading(2.0, 2.0, 1_700)));
    }
}
