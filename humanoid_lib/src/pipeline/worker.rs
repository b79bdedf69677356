//! Servo command worker: snapshot -> joint targets + gait motion.

use super::{ActuationGateway, MotionOutcome, MotionTracker, PipelineState, PipelineStats};
use crate::error::{ActuationError, PipelineError, SolveError};
use crate::types::{
    ArmConfig, DeviceRange, GaitConfig, JointCalibration, JointCommand, JointName, PoseSnapshot,
    ServoTarget, Side, TeleopConfig,
};
use crate::utils::{classify_snapshot, command_to_target, position_to_angle, solve};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings the worker reads every cycle.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub arms: Vec<(Side, ArmConfig)>,
    pub device: DeviceRange,
    pub duration_frames: u16,
    pub gait: GaitConfig,
    pub pop_timeout: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &TeleopConfig) -> Self {
        Self {
            arms: config
                .enabled_arms()
                .map(|(side, arm)| (side, arm.clone()))
                .collect(),
            device: config.device,
            duration_frames: config.gateway.duration_frames,
            gait: config.gait.clone(),
            pop_timeout: config.queue.pop_timeout(),
        }
    }
}

/// Root, middle and end joints of an arm.
fn arm_chain(side: Side) -> [JointName; 3] {
    match side {
        Side::Right => [
            JointName::RightUpperArm,
            JointName::RightLowerArm,
            JointName::RightHand,
        ],
        Side::Left => [
            JointName::LeftUpperArm,
            JointName::LeftLowerArm,
            JointName::LeftHand,
        ],
    }
}

/// Solve one arm and apply its calibration, giving one command per servo.
pub fn arm_commands(
    snapshot: &PoseSnapshot,
    side: Side,
    arm: &ArmConfig,
) -> Result<[JointCommand; 3], SolveError> {
    let [upper, lower, end] = arm_chain(side).map(|name| snapshot.joint(name));
    let angles = solve(&upper, &lower, &end)?;

    let command = |calibration: &JointCalibration, angle: f64| JointCommand {
        servo_id: calibration.servo_id,
        group: arm.group,
        target_angle_deg: calibration.apply(angle),
        valid_range: calibration.range,
    };

    Ok([
        command(&arm.shoulder_pitch, angles.pitch_deg),
        command(&arm.upper_arm_yaw, angles.yaw_deg),
        command(&arm.elbow_bend, angles.bend_deg),
    ])
}

pub struct ServoCommandWorker<G> {
    gateway: G,
    state: PipelineState,
    settings: WorkerSettings,
}

impl<G: ActuationGateway> ServoCommandWorker<G> {
    pub fn new(gateway: G, state: PipelineState, settings: WorkerSettings) -> Self {
        Self {
            gateway,
            state,
            settings,
        }
    }

    /// Consume snapshots until cancelled or the device is lost. Hands the
    /// gateway back so the supervisor can release it.
    pub fn run(mut self) -> (G, Result<(), PipelineError>) {
        info!(
            "Servo command worker started ({} arm(s), gait {})",
            self.settings.arms.len(),
            if self.settings.gait.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );

        let result = self.run_loop();
        if result.is_err() {
            self.state.cancel.cancel();
        }

        info!("Servo command worker stopped");
        (self.gateway, result)
    }

    fn run_loop(&mut self) -> Result<(), PipelineError> {
        while !self.state.cancel.is_cancelled() {
            let Some(snapshot) = self.state.queue.pop(self.settings.pop_timeout) else {
                continue;
            };

            if let Err(e) = self.process(&snapshot) {
                warn!("Lost actuation device: {}", e);
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Run one dispatch cycle. Only errors that lose the device are returned.
    pub fn process(&mut self, snapshot: &PoseSnapshot) -> Result<(), ActuationError> {
        self.dispatch_arms(snapshot)?;

        if self.settings.gait.enabled {
            self.dispatch_gait(snapshot)?;
        }

        Ok(())
    }

    fn dispatch_arms(&mut self, snapshot: &PoseSnapshot) -> Result<(), ActuationError> {
        let stats = &self.state.stats;
        let mut targets: Vec<ServoTarget> = Vec::with_capacity(self.settings.arms.len() * 3);

        for (side, arm) in &self.settings.arms {
            match arm_commands(snapshot, *side, arm) {
                Ok(commands) => {
                    for command in &commands {
                        let target = command_to_target(command, self.settings.device);
                        debug!(
                            "{:?} servo {}: {:.1}° -> {} ({:.1}°)",
                            side,
                            command.servo_id,
                            command.target_angle_deg,
                            target.position.value(),
                            position_to_angle(
                                target.position,
                                command.valid_range,
                                self.settings.device
                            )
                        );
                        targets.push(target);
                    }
                }
                Err(e) => {
                    PipelineStats::incr(&stats.limbs_skipped);
                    debug!("Skipping {:?} arm this cycle: {}", side, e);
                }
            }
        }

        if targets.is_empty() {
            return Ok(());
        }

        match self
            .gateway
            .set_joint_targets(&targets, self.settings.duration_frames)
        {
            Ok(()) => {
                PipelineStats::incr(&stats.cycles_dispatched);
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                // The snapshot is stale by the next cycle, so no retry
                PipelineStats::incr(&stats.actuation_failures);
                warn!("Failed to send joint targets: {}", e);
                Ok(())
            }
        }
    }

    fn dispatch_gait(&mut self, snapshot: &PoseSnapshot) -> Result<(), ActuationError> {
        let intent = classify_snapshot(snapshot);
        let Some(motion_id) = self.settings.gait.motions.motion_for(intent) else {
            return Ok(());
        };

        info!("Gait intent {:?}, playing motion {}", intent, motion_id);

        let tracker = match MotionTracker::start(&mut self.gateway, motion_id) {
            Ok(tracker) => tracker,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                PipelineStats::incr(&self.state.stats.actuation_failures);
                warn!("Failed to start motion {}: {}", motion_id, e);
                return Ok(());
            }
        };
        PipelineStats::incr(&self.state.stats.motions_played);

        // Blocks this worker until the motion finishes; queued snapshots wait
        match tracker.wait(
            &mut self.gateway,
            self.settings.gait.status_poll_interval(),
            &self.state.cancel,
        ) {
            MotionOutcome::Completed { polls } => {
                debug!("Motion {} finished after {} polls", motion_id, polls);
            }
            MotionOutcome::Failed(_) => {}
            MotionOutcome::Cancelled => info!("Motion {} interrupted by shutdown", motion_id),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SimulatedGateway;
    use crate::types::ChannelGroup;
    use nalgebra::Vector3;

    fn reaching_pose() -> PoseSnapshot {
        PoseSnapshot::from_joints([
            (JointName::RightUpperArm, Vector3::new(0.0, 0.0, 0.0)),
            (JointName::RightLowerArm, Vector3::new(1.0, 0.0, 0.0)),
            (JointName::RightHand, Vector3::new(2.0, 0.0, 0.0)),
            (JointName::LeftUpperArm, Vector3::new(0.0, 0.0, 0.0)),
            (JointName::LeftLowerArm, Vector3::new(-1.0, 0.0, 0.0)),
            (JointName::LeftHand, Vector3::new(-1.0, 0.0, 1.0)),
        ])
    }

    #[test]
    fn test_right_arm_conventions() {
        let commands =
            arm_commands(&reaching_pose(), Side::Right, &ArmConfig::default_right()).unwrap();

        // pitch 0 -> -0 - 90, yaw 0 -> 0 + 90, straight elbow
        assert_eq!(commands[0].servo_id, 1);
        assert!((commands[0].target_angle_deg + 90.0).abs() < 1e-9);
        assert!((commands[1].target_angle_deg - 90.0).abs() < 1e-9);
        assert!(commands[2].target_angle_deg.abs() < 1e-9);
        assert!(commands.iter().all(|c| c.group == ChannelGroup::Group1));
    }

    #[test]
    fn test_left_arm_is_mirrored() {
        let commands =
            arm_commands(&reaching_pose(), Side::Left, &ArmConfig::default_left()).unwrap();

        // Upper segment points along -x: pitch 180 -> 180 + 90 (clamped later)
        assert!((commands[0].target_angle_deg - 270.0).abs() < 1e-9);
        // Right-angle elbow, mirrored sign
        assert!((commands[2].target_angle_deg + 90.0).abs() < 1e-6);
        assert!(commands.iter().all(|c| c.group == ChannelGroup::Group2));
    }

    #[test]
    fn test_collapsed_arm_is_skipped() {
        let settings = WorkerSettings::from_config(&TeleopConfig::default());
        let mut gateway = SimulatedGateway::new(0);
        gateway.connect("sim", 115_200, Duration::from_secs(1)).unwrap();
        let state = PipelineState::new(5);
        let mut worker = ServoCommandWorker::new(gateway, state.clone(), settings);

        worker.process(&PoseSnapshot::zeroed()).unwrap();

        let stats = state.stats.snapshot();
        assert_eq!(stats.limbs_skipped, 1);
        assert_eq!(stats.cycles_dispatched, 0);
    }

    #[test]
    fn test_cycle_sends_targets_to_gateway() {
        let settings = WorkerSettings::from_config(&TeleopConfig::default());
        let mut gateway = SimulatedGateway::new(0);
        gateway.connect("sim", 115_200, Duration::from_secs(1)).unwrap();
        let state = PipelineState::new(5);
        let mut worker = ServoCommandWorker::new(gateway, state.clone(), settings);

        worker.process(&reaching_pose()).unwrap();
        let (gateway, _) = {
            state.cancel.cancel();
            worker.run()
        };

        // -90° on the symmetric range, 90° on the hinge, 0° elbow
        assert_eq!(gateway.position(1, ChannelGroup::Group1).unwrap().value(), 4833);
        assert_eq!(gateway.position(2, ChannelGroup::Group1).unwrap().value(), 7500);
        assert_eq!(gateway.position(3, ChannelGroup::Group1).unwrap().value(), 7500);
        assert_eq!(state.stats.snapshot().cycles_dispatched, 1);
    }

    #[test]
    fn test_lost_device_is_fatal() {
        let settings = WorkerSettings::from_config(&TeleopConfig::default());
        let state = PipelineState::new(5);
        let mut worker = ServoCommandWorker::new(SimulatedGateway::new(0), state, settings);

        assert!(matches!(
            worker.process(&reaching_pose()),
            Err(ActuationError::NotConnected)
        ));
    }

    #[test]
    fn test_overflowing_arm_is_skipped() {
        let snapshot = crate::utils::pose_codec::decode(
            br#"{"rightUpperArm":{"x":0,"y":0,"z":0},
                 "rightLowerArm":{"x":1e200,"y":0,"z":0},
                 "rightHand":{"x":2e200,"y":1e200,"z":0}}"#,
        )
        .unwrap();
        assert_eq!(
            arm_commands(&snapshot, Side::Right, &ArmConfig::default_right()),
            Err(SolveError::NonFinite)
        );

        let settings = WorkerSettings::from_config(&TeleopConfig::default());
        let mut gateway = SimulatedGateway::new(0);
        gateway.connect("sim", 115_200, Duration::from_secs(1)).unwrap();
        let state = PipelineState::new(5);
        let mut worker = ServoCommandWorker::new(gateway, state.clone(), settings);

        worker.process(&snapshot).unwrap();

        assert_eq!(state.stats.snapshot().limbs_skipped, 1);
        assert_eq!(worker.gateway.position(3, ChannelGroup::Group1), None);
    }

    /// Refuses the first few commands of each kind, then defers to the simulator.
    struct BusyGateway {
        inner: SimulatedGateway,
        reject_targets: u32,
        refuse_motions: u32,
        target_calls: u32,
        motion_calls: u32,
    }

    impl ActuationGateway for BusyGateway {
        fn connect(&mut self, port: &str, baud: u32, timeout: Duration) -> Result<(), ActuationError> {
            self.inner.connect(port, baud, timeout)
        }

        fn is_ready(&mut self) -> bool {
            self.inner.is_ready()
        }

        fn set_joint_targets(
            &mut self,
            targets: &[ServoTarget],
            duration_frames: u16,
        ) -> Result<(), ActuationError> {
            self.target_calls += 1;
            if self.reject_targets > 0 {
                self.reject_targets -= 1;
                return Err(ActuationError::Rejected("checksum mismatch".to_string()));
            }
            self.inner.set_joint_targets(targets, duration_frames)
        }

        fn play_stored_motion(&mut self, motion_id: u8) -> Result<(), ActuationError> {
            self.motion_calls += 1;
            if self.refuse_motions > 0 {
                self.refuse_motions -= 1;
                return Err(ActuationError::NotReady);
            }
            self.inner.play_stored_motion(motion_id)
        }

        fn motion_status(&mut self) -> i32 {
            self.inner.motion_status()
        }

        fn disconnect(&mut self) {
            self.inner.disconnect()
        }
    }

    fn stepping_forward() -> PoseSnapshot {
        PoseSnapshot::from_joints([
            (JointName::RightUpperArm, Vector3::new(0.0, 0.0, 0.0)),
            (JointName::RightLowerArm, Vector3::new(1.0, 0.0, 0.0)),
            (JointName::RightHand, Vector3::new(2.0, 0.0, 0.0)),
            (JointName::RightUpperLeg, Vector3::new(0.0, 0.0, 0.0)),
            (JointName::RightFoot, Vector3::new(0.5, 0.0, 0.0)),
        ])
    }

    #[test]
    fn test_refused_commands_skip_the_cycle() {
        let mut config = TeleopConfig::default();
        config.gait.status_poll_interval_ms = 1;
        let settings = WorkerSettings::from_config(&config);

        let mut inner = SimulatedGateway::new(0);
        inner.connect("sim", 115_200, Duration::from_secs(1)).unwrap();
        let gateway = BusyGateway {
            inner,
            reject_targets: 1,
            refuse_motions: 1,
            target_calls: 0,
            motion_calls: 0,
        };
        let state = PipelineState::new(5);
        let mut worker = ServoCommandWorker::new(gateway, state.clone(), settings);

        worker.process(&stepping_forward()).unwrap();

        let stats = state.stats.snapshot();
        assert_eq!(stats.actuation_failures, 2);
        assert_eq!(stats.cycles_dispatched, 0);
        assert_eq!(stats.motions_played, 0);
        // Refused commands are not resent
        assert_eq!(worker.gateway.target_calls, 1);
        assert_eq!(worker.gateway.motion_calls, 1);
        assert_eq!(worker.gateway.inner.position(1, ChannelGroup::Group1), None);

        worker.process(&stepping_forward()).unwrap();

        let stats = state.stats.snapshot();
        assert_eq!(stats.actuation_failures, 2);
        assert_eq!(stats.cycles_dispatched, 1);
        assert_eq!(stats.motions_played, 1);
        assert_eq!(worker.gateway.target_calls, 2);
        assert_eq!(worker.gateway.motion_calls, 2);
        assert_eq!(
            worker.gateway.inner.position(1, ChannelGroup::Group1).map(|p| p.value()),
            Some(4833)
        );
    }
}
