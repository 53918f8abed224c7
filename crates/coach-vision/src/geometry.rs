// ABOUTME: Landmark geometry: planar distance and three-point joint angles
// ABOUTME: Angles are computed with the dot product and clamped to [0, 180] degrees
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use coach_core::constants::detection::DEGENERATE_VECTOR_EPSILON;
use coach_core::models::{BodySide, Joint, Landmark, PoseFrame};

/// Planar distance between two landmarks in normalized image units
#[must_use]
pub fn distance(a: &Landmark, b: &Landmark) -> f32 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Angle at `b` formed by the segments `b→a` and `b→c`, in degrees
///
/// Uses `cos(θ) = (v1 · v2) / (|v1| |v2|)` on the image plane. The result is
/// symmetric in `a` and `c` and always within `[0, 180]`; a degenerate segment
/// is reported as a straight joint.
#[must_use]
pub fn calculate_angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let v1 = (a.x - b.x, a.y - b.y);
    let v2 = (c.x - b.x, c.y - b.y);

    let mag1 = v1.0.hypot(v1.1);
    let mag2 = v2.0.hypot(v2.1);
    if mag1 < DEGENERATE_VECTOR_EPSILON || mag2 < DEGENERATE_VECTOR_EPSILON {
        return 180.0;
    }

    let cos_angle = v1.0.mul_add(v2.0, v1.1 * v2.1) / (mag1 * mag2);
    if !cos_angle.is_finite() {
        return 180.0;
    }
    cos_angle.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle of a joint on one side, when all three landmarks are valid
fn side_angle(frame: &PoseFrame, joint: Joint, side: BodySide) -> Option<f32> {
    let [outer_a, vertex, outer_c] = joint.triple(side)?;
    let a = frame.valid_landmark(outer_a)?;
    let b = frame.valid_landmark(vertex)?;
    let c = frame.valid_landmark(outer_c)?;
    Some(calculate_angle(a, b, c))
}

/// Angle of `joint` for the requested side
///
/// For [`BodySide::Both`] the result is the mean of the sides whose landmarks
/// are valid; `None` when no side is usable.
#[must_use]
pub fn joint_angle(frame: &PoseFrame, joint: Joint, side: BodySide) -> Option<f32> {
    match side {
        BodySide::Left | BodySide::Right => side_angle(frame, joint, side),
        BodySide::Both => {
            let left = side_angle(frame, joint, BodySide::Left);
            let right = side_angle(frame, joint, BodySide::Right);
            match (left, right) {
                (Some(l), Some(r)) => Some((l + r) / 2.0),
                (Some(angle), None) | (None, Some(angle)) => Some(angle),
                (None, None) => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32) -> Landmark {
        Landmark::new(x, y, 0.0, 1.0)
    }

    #[test]
    fn test_straight_joint() {
        let angle = calculate_angle(&point(0.0, 0.0), &point(0.5, 0.0), &point(1.0, 0.0));
        assert!((angle - 180.0).abs() < 0.01);
    }

    #[test]
    fn test_right_angle() {
        let angle = calculate_angle(&point(0.0, 0.0), &point(0.5, 0.0), &point(0.5, 0.5));
        assert!((angle - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_angle_is_symmetric() {
        let a = point(0.12, 0.8);
        let b = point(0.4, 0.41);
        let c = point(0.93, 0.2);
        assert!((calculate_angle(&a, &b, &c) - calculate_angle(&c, &b, &a)).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_segment_reports_straight() {
        let angle = calculate_angle(&point(0.5, 0.5), &point(0.5, 0.5), &point(1.0, 0.0));
        assert!((angle - 180.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_distance() {
        assert!((distance(&point(0.0, 0.0), &point(0.3, 0.4)) - 0.5).abs() < 1e-6);
    }
}
