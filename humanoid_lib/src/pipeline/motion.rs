//! Run-to-completion tracking of a stored gait motion.
//!
//! Idle -> Playing(id) -> Idle | Failed(code), with cancellation checked
//! before every status poll.

use super::{ActuationGateway, CancelToken};
use crate::error::{ActuationError, MotionStatusError};
use crate::types::MotionState;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// Board reported idle again
    Completed { polls: u32 },
    Failed(MotionStatusError),
    /// Shutdown was requested while the motion was still playing
    Cancelled,
}

pub struct MotionTracker {
    motion_id: u8,
    state: MotionState,
    polls: u32,
}

impl MotionTracker {
    /// Trigger `motion_id` on the board and start tracking it.
    pub fn start<G: ActuationGateway + ?Sized>(
        gateway: &mut G,
        motion_id: u8,
    ) -> Result<Self, ActuationError> {
        gateway.play_stored_motion(motion_id)?;
        Ok(Self {
            motion_id,
            state: MotionState::Playing(motion_id),
            polls: 0,
        })
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Query the board once and advance the state.
    pub fn poll<G: ActuationGateway + ?Sized>(&mut self, gateway: &mut G) -> MotionState {
        self.polls += 1;
        self.state = MotionState::from_status(gateway.motion_status());
        self.state
    }

    /// Poll every `interval` until the motion settles or `cancel` is raised.
    pub fn wait<G: ActuationGateway + ?Sized>(
        mut self,
        gateway: &mut G,
        interval: Duration,
        cancel: &CancelToken,
    ) -> MotionOutcome {
        loop {
            if cancel.is_cancelled() {
                debug!("Stopped waiting on motion {} (shutdown)", self.motion_id);
                return MotionOutcome::Cancelled;
            }

            match self.poll(gateway) {
                MotionState::Idle => {
                    return MotionOutcome::Completed { polls: self.polls };
                }
                MotionState::Failed(code) => {
                    let error = MotionStatusError {
                        motion_id: self.motion_id,
                        code,
                    };
                    warn!("{}", error);
                    return MotionOutcome::Failed(error);
                }
                MotionState::Playing(current) => {
                    debug!("Motion {} playing (status {})", self.motion_id, current);
                    thread::sleep(interval);
                }
            }
        }
    }
}
