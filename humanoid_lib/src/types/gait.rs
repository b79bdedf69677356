use serde::{Deserialize, Serialize};

/// Coarse locomotion decision for one dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GaitIntent {
    None,
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
}

impl GaitIntent {
    pub fn is_none(self) -> bool {
        self == GaitIntent::None
    }
}

/// Stored motion slots on the board for each gait intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitMotions {
    pub forward: u8,
    pub backward: u8,
    pub strafe_left: u8,
    pub strafe_right: u8,
}

impl GaitMotions {
    /// Stored motion to play for an intent, `None` when standing.
    pub fn motion_for(&self, intent: GaitIntent) -> Option<u8> {
        match intent {
            GaitIntent::None => None,
            GaitIntent::Forward => Some(self.forward),
            GaitIntent::Backward => Some(self.backward),
            GaitIntent::StrafeLeft => Some(self.strafe_left),
            GaitIntent::StrafeRight => Some(self.strafe_right),
        }
    }
}

impl Default for GaitMotions {
    fn default() -> Self {
        Self {
            forward: 1,
            backward: 2,
            strafe_left: 3,
            strafe_right: 4,
        }
    }
}

/// Progress of a triggered stored motion, as seen through status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Playing(u8),
    Failed(i32),
}

impl MotionState {
    /// Interpret a raw status code: negative is an error, zero idle, positive
    /// the motion currently playing.
    pub fn from_status(code: i32) -> Self {
        match code {
            c if c < 0 => MotionState::Failed(c),
            0 => MotionState::Idle,
            c => MotionState::Playing(u8::try_from(c).unwrap_or(u8::MAX)),
        }
    }

    pub fn is_settled(self) -> bool {
        !matches!(self, MotionState::Playing(_))
    }
}
