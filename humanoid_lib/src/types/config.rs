use super::{AngleRange, ChannelGroup, DeviceRange, GaitMotions};
use crate::pipeline::DEFAULT_QUEUE_CAPACITY;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleopConfig {
    pub network: NetworkConfig,
    pub queue: QueueConfig,
    pub gateway: GatewayConfig,
    pub device: DeviceRange,
    pub arms: ArmsConfig,
    pub gait: GaitConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    pub receive_timeout_ms: u64,
    pub max_datagram_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
    pub pop_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: String,
    pub baud: u32,
    pub timeout_secs: f64,
    /// Interpolation time for joint moves, in board frames (~11 ms each)
    pub duration_frames: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmsConfig {
    #[serde(default = "ArmConfig::default_right")]
    pub right: ArmConfig,
    #[serde(default = "ArmConfig::default_left")]
    pub left: ArmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmConfig {
    pub enabled: bool,
    pub group: ChannelGroup,
    pub shoulder_pitch: JointCalibration,
    pub upper_arm_yaw: JointCalibration,
    pub elbow_bend: JointCalibration,
}

/// Maps a solved angle onto one servo: `sign * angle + offset_deg`, then
/// clamped to `range`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JointCalibration {
    pub servo_id: u8,
    pub sign: f64,
    pub offset_deg: f64,
    pub range: AngleRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitConfig {
    pub enabled: bool,
    pub motions: GaitMotions,
    pub status_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    pub join_timeout_ms: u64,
    /// Free the servos on exit instead of driving them to neutral
    pub free_servos_on_exit: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 9000,
            receive_timeout_ms: 200,
            max_datagram_bytes: 2048,
        }
    }
}

impl NetworkConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            pop_timeout_ms: 100,
        }
    }
}

impl QueueConfig {
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: "COM3".to_string(),
            baud: 115_200,
            timeout_secs: 1.3,
            duration_frames: 50,
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

impl Default for ArmsConfig {
    fn default() -> Self {
        Self {
            right: ArmConfig::default_right(),
            left: ArmConfig::default_left(),
        }
    }
}

impl ArmConfig {
    /// Right arm on bank 1: pitch mirrored and shifted by -90°.
    pub fn default_right() -> Self {
        Self {
            enabled: true,
            group: ChannelGroup::Group1,
            shoulder_pitch: JointCalibration::new(1, -1.0, -90.0, AngleRange::SYMMETRIC),
            upper_arm_yaw: JointCalibration::new(2, 1.0, 90.0, AngleRange::HINGE),
            elbow_bend: JointCalibration::new(3, 1.0, 0.0, AngleRange::SYMMETRIC),
        }
    }

    /// Left arm on bank 2: pitch shifted by +90°, elbow mirrored.
    pub fn default_left() -> Self {
        Self {
            enabled: false,
            group: ChannelGroup::Group2,
            shoulder_pitch: JointCalibration::new(1, 1.0, 90.0, AngleRange::SYMMETRIC),
            upper_arm_yaw: JointCalibration::new(2, 1.0, 90.0, AngleRange::HINGE),
            elbow_bend: JointCalibration::new(3, -1.0, 0.0, AngleRange::SYMMETRIC),
        }
    }

    pub fn calibrations(&self) -> [&JointCalibration; 3] {
        [&self.shoulder_pitch, &self.upper_arm_yaw, &self.elbow_bend]
    }
}

impl JointCalibration {
    pub const fn new(servo_id: u8, sign: f64, offset_deg: f64, range: AngleRange) -> Self {
        Self {
            servo_id,
            sign,
            offset_deg,
            range,
        }
    }

    pub fn apply(&self, angle_deg: f64) -> f64 {
        self.sign * angle_deg + self.offset_deg
    }
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            motions: GaitMotions::default(),
            status_poll_interval_ms: 100,
        }
    }
}

impl GaitConfig {
    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            join_timeout_ms: 1000,
            free_servos_on_exit: false,
        }
    }
}

impl ShutdownConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

impl TeleopConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TeleopConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Arms that will receive joint targets, right first.
    pub fn enabled_arms(&self) -> impl Iterator<Item = (super::Side, &ArmConfig)> {
        [
            (super::Side::Right, &self.arms.right),
            (super::Side::Left, &self.arms.left),
        ]
        .into_iter()
        .filter(|(_, arm)| arm.enabled)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue.capacity == 0 {
            return Err(eyre::eyre!("Queue capacity must be at least 1"));
        }

        if self.network.receive_timeout_ms == 0 || self.queue.pop_timeout_ms == 0 {
            return Err(eyre::eyre!(
                "Receive timeout ({} ms) and pop timeout ({} ms) must be non-zero",
                self.network.receive_timeout_ms,
                self.queue.pop_timeout_ms
            ));
        }

        if self.network.max_datagram_bytes == 0 {
            return Err(eyre::eyre!("Max datagram size must be non-zero"));
        }

        if !(self.gateway.timeout_secs.is_finite() && self.gateway.timeout_secs > 0.0) {
            return Err(eyre::eyre!(
                "Gateway timeout {} s must be a positive number",
                self.gateway.timeout_secs
            ));
        }

        if self.gait.status_poll_interval_ms == 0 {
            return Err(eyre::eyre!("Motion status poll interval must be non-zero"));
        }

        if !self.device.is_valid() {
            return Err(eyre::eyre!(
                "Device range [{}, {}] is empty or inverted",
                self.device.min,
                self.device.max
            ));
        }

        let mut seen = HashSet::new();
        for (side, arm) in self.enabled_arms() {
            for calibration in arm.calibrations() {
                if !calibration.range.is_valid() {
                    return Err(eyre::eyre!(
                        "{:?} arm servo {} has invalid angle range [{:.1}, {:.1}]",
                        side,
                        calibration.servo_id,
                        calibration.range.min,
                        calibration.range.max
                    ));
                }

                if !seen.insert((calibration.servo_id, arm.group)) {
                    return Err(eyre::eyre!(
                        "Servo {} on {:?} is assigned more than once",
                        calibration.servo_id,
                        arm.group
                    ));
                }
            }
        }

        Ok(())
    }
}
