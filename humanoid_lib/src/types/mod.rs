pub mod config;
pub mod gait;
pub mod joint_name;
pub mod pose;
pub mod servo_command;

pub use config::*;
pub use gait::*;
pub use joint_name::*;
pub use pose::*;
pub use servo_command::*;

use serde::{Deserialize, Serialize};

/// Body side; the two arms drive mirrored actuator banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Right,
    Left,
}
