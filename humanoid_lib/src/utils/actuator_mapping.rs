// Angle <-> device position conversion

use crate::types::{ActuatorPosition, AngleRange, DeviceRange, JointCommand, ServoTarget};

/// Convert an angle to a device position.
///
/// The angle is clamped to `range`, then `range` is mapped linearly onto the
/// device range so that `range.min` lands on `device.min` and `range.max` on
/// `device.max`. For a range symmetric about zero, 0° is the device center.
/// A non-finite angle maps to the device center.
///
/// # Example
/// ```
/// use humanoid_lib::{angle_to_position, AngleRange, DeviceRange};
///
/// let device = DeviceRange::default();
/// assert_eq!(angle_to_position(0.0, AngleRange::SYMMETRIC, device).value(), 7500);
/// assert_eq!(angle_to_position(135.0, AngleRange::SYMMETRIC, device).value(), 11500);
/// ```
pub fn angle_to_position(angle_deg: f64, range: AngleRange, device: DeviceRange) -> ActuatorPosition {
    if !angle_deg.is_finite() {
        return ActuatorPosition(device.center());
    }
    let clamped = range.clamp(angle_deg);
    let scale = f64::from(device.max - device.min) / range.span();
    let position = (f64::from(device.min) + scale * (clamped - range.min)).round();

    ActuatorPosition(position.clamp(f64::from(device.min), f64::from(device.max)) as u16)
}

/// Inverse of [`angle_to_position`] for positions inside the device range.
pub fn position_to_angle(position: ActuatorPosition, range: AngleRange, device: DeviceRange) -> f64 {
    let scale = range.span() / f64::from(device.max - device.min);
    range.min + scale * (f64::from(position.value()) - f64::from(device.min))
}

pub fn command_to_target(command: &JointCommand, device: DeviceRange) -> ServoTarget {
    ServoTarget {
        servo_id: command.servo_id,
        group: command.group,
        position: angle_to_position(command.clamped_angle(), command.valid_range, device),
    }
}
