use serde::{Deserialize, Serialize};

/// Actuator bank on the board's serial sub-bus (SIO1-4 vs SIO5-8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelGroup {
    Group1,
    Group2,
}

impl ChannelGroup {
    /// Bus number as the board numbers it.
    pub fn sio(self) -> u8 {
        match self {
            ChannelGroup::Group1 => 1,
            ChannelGroup::Group2 => 2,
        }
    }
}

/// Valid joint angle interval in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
}

impl AngleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Full servo travel, centered on neutral.
    pub const SYMMETRIC: AngleRange = AngleRange::new(-135.0, 135.0);

    /// Upper-arm hinge travel.
    pub const HINGE: AngleRange = AngleRange::new(0.0, 180.0);

    pub fn clamp(&self, angle_deg: f64) -> f64 {
        angle_deg.clamp(self.min, self.max)
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

impl Default for AngleRange {
    fn default() -> Self {
        Self::SYMMETRIC
    }
}

/// Native position range of the actuators; the midpoint is neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRange {
    pub min: u16,
    pub max: u16,
}

impl DeviceRange {
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> u16 {
        self.min + (self.max - self.min) / 2
    }

    pub fn is_valid(&self) -> bool {
        self.min < self.max
    }
}

impl Default for DeviceRange {
    fn default() -> Self {
        Self::new(3500, 11500)
    }
}

/// Target for one servo, in degrees, produced once per dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointCommand {
    pub servo_id: u8,
    pub group: ChannelGroup,
    pub target_angle_deg: f64,
    pub valid_range: AngleRange,
}

impl JointCommand {
    /// Commanded angle after clamping to the valid range.
    pub fn clamped_angle(&self) -> f64 {
        self.valid_range.clamp(self.target_angle_deg)
    }
}

/// Position in device-native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActuatorPosition(pub u16);

impl ActuatorPosition {
    pub fn value(self) -> u16 {
        self.0
    }
}

/// What actually goes over the wire for one servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoTarget {
    pub servo_id: u8,
    pub group: ChannelGroup,
    pub position: ActuatorPosition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_center() {
        assert_eq!(DeviceRange::default().center(), 7500);
    }

    #[test]
    fn test_joint_command_clamps_to_its_own_range() {
        let cmd = JointCommand {
            servo_id: 2,
            group: ChannelGroup::Group1,
            target_angle_deg: -20.0,
            valid_range: AngleRange::HINGE,
        };
        assert_eq!(cmd.clamped_angle(), 0.0);
    }

    #[test]
    fn test_range_validity() {
        assert!(AngleRange::SYMMETRIC.is_valid());
        assert!(!AngleRange::new(10.0, 10.0).is_valid());
        assert!(!AngleRange::new(f64::NAN, 10.0).is_valid());
        assert!(!DeviceRange::new(9000, 3000).is_valid());
    }
}
