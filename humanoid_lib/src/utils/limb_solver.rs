// Analytic two-bone limb solver

use crate::error::{Segment, SolveError};
use nalgebra::Vector3;
use std::f64::consts::PI;

/// Segments shorter than this are treated as collapsed.
const MIN_SEGMENT_LENGTH: f64 = 1e-9;

/// Joint angles of a two-segment limb, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimbAngles {
    /// Heading of the upper segment in the horizontal (x-z) plane
    pub pitch_deg: f64,
    /// Elevation of the upper segment above the horizontal plane
    pub yaw_deg: f64,
    /// Bend at the middle joint; 0 when fully extended, 180 when folded back
    pub bend_deg: f64,
}

/// Solve the angles of a limb given its root, middle and end joint positions.
///
/// The bend comes from the law of cosines over the two segment lengths and
/// the root-to-end span:
///
/// bend = π - acos((L1² + L2² - D²) / (2·L1·L2))
///
/// with the cosine clamped to [-1, 1] so a fully extended or folded limb does
/// not fall outside `acos`'s domain through rounding.
pub fn solve(
    upper: &Vector3<f64>,
    lower: &Vector3<f64>,
    end: &Vector3<f64>,
) -> Result<LimbAngles, SolveError> {
    let segment_a = lower - upper;
    let segment_b = end - lower;
    let span = end - upper;

    let l1 = segment_a.norm();
    let l2 = segment_b.norm();
    let d = span.norm();

    if !(l1.is_finite() && l2.is_finite() && d.is_finite()) {
        return Err(SolveError::NonFinite);
    }
    if l1 < MIN_SEGMENT_LENGTH {
        return Err(SolveError::DegenerateSegment {
            segment: Segment::Upper,
        });
    }
    if l2 < MIN_SEGMENT_LENGTH {
        return Err(SolveError::DegenerateSegment {
            segment: Segment::Lower,
        });
    }

    let pitch = segment_a.z.atan2(segment_a.x);
    let yaw = segment_a
        .y
        .atan2((segment_a.x.powi(2) + segment_a.z.powi(2)).sqrt());

    let cos_inner = ((l1 * l1 + l2 * l2 - d * d) / (2.0 * l1 * l2)).clamp(-1.0, 1.0);
    let bend = PI - cos_inner.acos();

    let angles = LimbAngles {
        pitch_deg: pitch.to_degrees(),
        yaw_deg: yaw.to_degrees(),
        bend_deg: bend.to_degrees(),
    };
    if !(angles.pitch_deg.is_finite() && angles.yaw_deg.is_finite() && angles.bend_deg.is_finite()) {
        return Err(SolveError::NonFinite);
    }
    Ok(angles)
}
