//! Capability set the pipeline needs from the motor-controller board.
//!
//! The board's wire protocol lives behind this trait. [`SimulatedGateway`]
//! stands in for the board when running without hardware.

use crate::error::ActuationError;
use crate::types::{ActuatorPosition, ChannelGroup, ServoTarget};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

pub trait ActuationGateway: Send {
    /// Open the serial link to the board.
    fn connect(&mut self, port: &str, baud: u32, timeout: Duration) -> Result<(), ActuationError>;

    /// Acknowledge check; `false` when the board is not answering.
    fn is_ready(&mut self) -> bool;

    /// Move servos to their targets, interpolated over `duration_frames`.
    fn set_joint_targets(
        &mut self,
        targets: &[ServoTarget],
        duration_frames: u16,
    ) -> Result<(), ActuationError>;

    /// Start a motion stored on the board.
    fn play_stored_motion(&mut self, motion_id: u8) -> Result<(), ActuationError>;

    /// Negative on error, zero when idle, otherwise the motion being played.
    fn motion_status(&mut self) -> i32;

    /// Release a servo so it can be moved by hand. Boards without a free
    /// mode reject the request.
    fn set_servo_free(&mut self, servo_id: u8, group: ChannelGroup) -> Result<(), ActuationError> {
        Err(ActuationError::Rejected(format!(
            "servo {} (SIO{}) has no free mode",
            servo_id,
            group.sio()
        )))
    }

    fn disconnect(&mut self);
}

/// Connection state, alive between `connect` and `disconnect`.
#[derive(Debug)]
struct SimulatedSession {
    port: String,
    baud: u32,
    positions: HashMap<(u8, ChannelGroup), ActuatorPosition>,
    /// Motion in progress and the status polls it has left
    playing: Option<(u8, u32)>,
}

/// In-process board stand-in. Stored motions report "playing" for
/// `motion_polls` status queries, then go idle.
#[derive(Debug)]
pub struct SimulatedGateway {
    motion_polls: u32,
    session: Option<SimulatedSession>,
    /// Servos put in free mode, kept across disconnect
    freed: Vec<(u8, ChannelGroup)>,
}

impl SimulatedGateway {
    pub fn new(motion_polls: u32) -> Self {
        Self {
            motion_polls,
            session: None,
            freed: Vec::new(),
        }
    }

    /// Servos freed since the last `connect`, in order.
    pub fn freed(&self) -> &[(u8, ChannelGroup)] {
        &self.freed
    }

    /// Last commanded position of a servo.
    pub fn position(&self, servo_id: u8, group: ChannelGroup) -> Option<ActuatorPosition> {
        self.session
            .as_ref()
            .and_then(|session| session.positions.get(&(servo_id, group)).copied())
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn session_mut(&mut self) -> Result<&mut SimulatedSession, ActuationError> {
        self.session.as_mut().ok_or(ActuationError::NotConnected)
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ActuationGateway for SimulatedGateway {
    fn connect(&mut self, port: &str, baud: u32, timeout: Duration) -> Result<(), ActuationError> {
        info!(
            "Simulated board on {} at {} baud (timeout {:.1}s)",
            port,
            baud,
            timeout.as_secs_f64()
        );
        self.session = Some(SimulatedSession {
            port: port.to_string(),
            baud,
            positions: HashMap::new(),
            playing: None,
        });
        self.freed.clear();
        Ok(())
    }

    fn is_ready(&mut self) -> bool {
        self.session.is_some()
    }

    fn set_joint_targets(
        &mut self,
        targets: &[ServoTarget],
        duration_frames: u16,
    ) -> Result<(), ActuationError> {
        let session = self.session_mut()?;
        for target in targets {
            debug!(
                "Servo {} (SIO{}) -> {} over {} frames",
                target.servo_id,
                target.group.sio(),
                target.position.value(),
                duration_frames
            );
            session
                .positions
                .insert((target.servo_id, target.group), target.position);
        }
        // A commanded position re-engages the servo
        self.freed
            .retain(|freed| !targets.iter().any(|t| (t.servo_id, t.group) == *freed));
        Ok(())
    }

    fn play_stored_motion(&mut self, motion_id: u8) -> Result<(), ActuationError> {
        if motion_id == 0 {
            return Err(ActuationError::Rejected("motion 0 is not a stored slot".to_string()));
        }
        let polls = self.motion_polls;
        let session = self.session_mut()?;
        info!("Playing stored motion {}", motion_id);
        session.playing = Some((motion_id, polls));
        Ok(())
    }

    fn motion_status(&mut self) -> i32 {
        let Some(session) = self.session.as_mut() else {
            return -1;
        };

        match session.playing {
            Some((motion_id, remaining)) if remaining > 0 => {
                session.playing = Some((motion_id, remaining - 1));
                i32::from(motion_id)
            }
            _ => {
                session.playing = None;
                0
            }
        }
    }

    fn set_servo_free(&mut self, servo_id: u8, group: ChannelGroup) -> Result<(), ActuationError> {
        let session = self.session_mut()?;
        session.positions.remove(&(servo_id, group));
        debug!("Servo {} (SIO{}) free", servo_id, group.sio());
        if !self.freed.contains(&(servo_id, group)) {
            self.freed.push((servo_id, group));
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            info!(
                "Disconnected simulated board on {} ({} baud)",
                session.port, session.baud
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(polls: u32) -> SimulatedGateway {
        let mut gateway = SimulatedGateway::new(polls);
        gateway
            .connect("sim", 115_200, Duration::from_millis(100))
            .unwrap();
        gateway
    }

    #[test]
    fn test_requires_connection() {
        let mut gateway = SimulatedGateway::new(1);
        assert!(!gateway.is_ready());
        assert!(matches!(
            gateway.set_joint_targets(&[], 10),
            Err(ActuationError::NotConnected)
        ));
        assert_eq!(gateway.motion_status(), -1);
    }

    #[test]
    fn test_records_targets() {
        let mut gateway = connected(1);
        let target = ServoTarget {
            servo_id: 3,
            group: ChannelGroup::Group1,
            position: ActuatorPosition(9000),
        };
        gateway.set_joint_targets(&[target], 50).unwrap();

        assert_eq!(gateway.position(3, ChannelGroup::Group1), Some(ActuatorPosition(9000)));
        assert_eq!(gateway.position(3, ChannelGroup::Group2), None);
    }

    #[test]
    fn test_motion_plays_then_idles() {
        let mut gateway = connected(2);
        gateway.play_stored_motion(4).unwrap();

        assert_eq!(gateway.motion_status(), 4);
        assert_eq!(gateway.motion_status(), 4);
        assert_eq!(gateway.motion_status(), 0);
    }

    #[test]
    fn test_disconnect_drops_session() {
        let mut gateway = connected(1);
        gateway.disconnect();
        assert!(!gateway.is_connected());
        assert!(gateway.play_stored_motion(1).is_err());
    }

    #[test]
    fn test_free_then_command_reengages() {
        let mut gateway = connected(1);
        let target = ServoTarget {
            servo_id: 2,
            group: ChannelGroup::Group2,
            position: ActuatorPosition(7500),
        };
        gateway.set_joint_targets(&[target], 10).unwrap();
        gateway.set_servo_free(2, ChannelGroup::Group2).unwrap();

        assert_eq!(gateway.freed(), &[(2, ChannelGroup::Group2)]);
        assert_eq!(gateway.position(2, ChannelGroup::Group2), None);

        gateway.set_joint_targets(&[target], 10).unwrap();
        assert!(gateway.freed().is_empty());
    }

    #[test]
    fn test_free_requires_connection() {
        let mut gateway = SimulatedGateway::new(1);
        assert!(matches!(
            gateway.set_servo_free(1, ChannelGroup::Group1),
            Err(ActuationError::NotConnected)
        ));
    }
}
