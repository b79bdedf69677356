// Threshold-based gait intent from leg geometry

use crate::types::{GaitIntent, JointName, PoseSnapshot};
use nalgebra::Vector3;

/// Foot ahead of the hip by more than this (along x) means step forward.
pub const FORWARD_THRESHOLD: f64 = -0.3;
/// Foot behind the hip by more than this means step back.
pub const BACKWARD_THRESHOLD: f64 = 0.2;
/// Lateral (y) displacement that triggers a side step.
pub const STRAFE_THRESHOLD: f64 = 0.3;

/// Classify a gait intent from the hip and foot positions of both legs.
///
/// Checks run in a fixed order and the first hit wins: forward, backward,
/// strafe right, strafe left.
pub fn classify(
    right_upper_leg: &Vector3<f64>,
    right_foot: &Vector3<f64>,
    left_upper_leg: &Vector3<f64>,
    left_foot: &Vector3<f64>,
) -> GaitIntent {
    let d_right_x = right_upper_leg.x - right_foot.x;
    let d_right_y = right_upper_leg.y - right_foot.y;
    let d_left_x = left_upper_leg.x - left_foot.x;
    let d_left_y = left_upper_leg.y - left_foot.y;

    if d_right_x < FORWARD_THRESHOLD || d_left_x < FORWARD_THRESHOLD {
        GaitIntent::Forward
    } else if d_right_x > BACKWARD_THRESHOLD || d_left_x > BACKWARD_THRESHOLD {
        GaitIntent::Backward
    } else if d_right_y > STRAFE_THRESHOLD || d_left_y > STRAFE_THRESHOLD {
        GaitIntent::StrafeRight
    } else if d_right_y < -STRAFE_THRESHOLD || d_left_y < -STRAFE_THRESHOLD {
        GaitIntent::StrafeLeft
    } else {
        GaitIntent::None
    }
}

pub fn classify_snapshot(snapshot: &PoseSnapshot) -> GaitIntent {
    classify(
        &snapshot.joint(JointName::RightUpperLeg),
        &snapshot.joint(JointName::RightFoot),
        &snapshot.joint(JointName::LeftUpperLeg),
        &snapshot.joint(JointName::LeftFoot),
    )
}
