//! Owns the receiver and worker threads and their orderly shutdown.

use super::{
    bind_socket, ActuationGateway, CancelToken, CommandReceiver, PipelineState,
    ServoCommandWorker, WorkerSettings,
};
use crate::error::PipelineError;
use crate::types::{ActuatorPosition, ArmConfig, DeviceRange, ServoTarget, TeleopConfig};
use crate::utils::current_dispatch;
use std::net::{SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const LIVENESS_POLL: Duration = Duration::from_millis(50);
const JOIN_POLL: Duration = Duration::from_millis(10);

pub struct PipelineSupervisor<G> {
    state: PipelineState,
    local_addr: SocketAddr,
    receiver: Option<JoinHandle<Result<(), PipelineError>>>,
    worker: Option<JoinHandle<(G, Result<(), PipelineError>)>>,
    neutral_targets: Vec<ServoTarget>,
    duration_frames: u16,
    free_servos_on_exit: bool,
    join_timeout: Duration,
}

impl<G: ActuationGateway + 'static> PipelineSupervisor<G> {
    /// Bind the pose socket from `config` and start both threads. `gateway`
    /// must already be connected.
    pub fn start(config: &TeleopConfig, gateway: G) -> Result<Self, PipelineError> {
        Self::start_with_cancel(config, gateway, CancelToken::new())
    }

    /// Like [`start`](Self::start), stopping when `cancel` is raised. The
    /// token can be handed to a signal handler before the threads exist.
    pub fn start_with_cancel(
        config: &TeleopConfig,
        gateway: G,
        cancel: CancelToken,
    ) -> Result<Self, PipelineError> {
        let socket = bind_socket(&config.network)?;
        Self::start_with_socket(config, socket, gateway, cancel)
    }

    pub fn start_with_socket(
        config: &TeleopConfig,
        socket: UdpSocket,
        gateway: G,
        cancel: CancelToken,
    ) -> Result<Self, PipelineError> {
        let state = PipelineState::with_cancel(config.queue.capacity, cancel);

        let receiver = CommandReceiver::new(
            socket,
            state.clone(),
            config.network.max_datagram_bytes,
        );
        let local_addr = receiver.local_addr()?;
        let worker =
            ServoCommandWorker::new(gateway, state.clone(), WorkerSettings::from_config(config));

        let dispatch = current_dispatch();
        let receiver = {
            let dispatch = dispatch.clone();
            thread::Builder::new()
                .name("pose-receiver".to_string())
                .spawn(move || tracing::dispatcher::with_default(&dispatch, || receiver.run()))
                .map_err(|source| PipelineError::Spawn {
                    name: "receiver",
                    source,
                })?
        };

        let worker = match thread::Builder::new()
            .name("servo-worker".to_string())
            .spawn(move || tracing::dispatcher::with_default(&dispatch, || worker.run()))
        {
            Ok(handle) => handle,
            Err(source) => {
                state.cancel.cancel();
                let _ = receiver.join();
                return Err(PipelineError::Spawn {
                    name: "worker",
                    source,
                });
            }
        };

        info!(
            "Pipeline started: pose socket {}, queue capacity {}",
            local_addr,
            state.queue.capacity()
        );

        Ok(Self {
            state,
            local_addr,
            receiver: Some(receiver),
            worker: Some(worker),
            neutral_targets: neutral_targets(config.enabled_arms().map(|(_, arm)| arm), config.device),
            duration_frames: config.gateway.duration_frames,
            free_servos_on_exit: config.shutdown.free_servos_on_exit,
            join_timeout: config.shutdown.join_timeout(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn receiver_alive(&self) -> bool {
        self.receiver.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn worker_alive(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Block until shutdown is requested or either thread exits.
    pub fn wait(&self) {
        while !self.state.cancel.is_cancelled() && self.receiver_alive() && self.worker_alive() {
            thread::sleep(LIVENESS_POLL);
        }
    }

    /// Stop both threads, then return the servos to neutral and disconnect.
    ///
    /// Returns the first fatal error raised by either thread.
    pub fn shutdown(mut self) -> Result<(), PipelineError> {
        info!("Shutting down pipeline");
        self.state.cancel.cancel();

        let deadline = Instant::now() + self.join_timeout;
        let mut first_error = None;

        if let Some(handle) = self.receiver.take() {
            match join_within(handle, "receiver", deadline) {
                Some(Ok(Err(e))) => first_error = Some(e),
                Some(Err(_)) => first_error = Some(PipelineError::Panicked("receiver")),
                _ => {}
            }
        }

        if let Some(handle) = self.worker.take() {
            match join_within(handle, "worker", deadline) {
                Some(Ok((mut gateway, result))) => {
                    if let Err(e) = result {
                        first_error.get_or_insert(e);
                    }
                    self.release(&mut gateway);
                }
                Some(Err(_)) => {
                    first_error.get_or_insert(PipelineError::Panicked("worker"));
                }
                None => warn!("Actuation gateway still held by worker, not released"),
            }
        }

        self.state.stats.log_summary();

        match first_error {
            Some(e) => {
                error!("Pipeline stopped with error: {}", e);
                Err(e)
            }
            None => Ok(()),
        }
    }

    fn release(&self, gateway: &mut G) {
        if gateway.is_ready() && !self.neutral_targets.is_empty() {
            if self.free_servos_on_exit {
                let freed = self
                    .neutral_targets
                    .iter()
                    .filter(|target| match gateway.set_servo_free(target.servo_id, target.group) {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("Could not free servo {}: {}", target.servo_id, e);
                            false
                        }
                    })
                    .count();
                info!("Freed {} servos", freed);
            } else {
                match gateway.set_joint_targets(&self.neutral_targets, self.duration_frames) {
                    Ok(()) => info!("Returned {} servos to neutral", self.neutral_targets.len()),
                    Err(e) => warn!("Could not return servos to neutral: {}", e),
                }
            }
        }
        gateway.disconnect();
    }
}

impl<G> Drop for PipelineSupervisor<G> {
    fn drop(&mut self) {
        // Threads left running (no `shutdown`) still see the stop request
        self.state.cancel.cancel();
    }
}

fn neutral_targets<'a>(
    arms: impl Iterator<Item = &'a ArmConfig>,
    device: DeviceRange,
) -> Vec<ServoTarget> {
    arms.flat_map(|arm| {
        arm.calibrations().map(|calibration| ServoTarget {
            servo_id: calibration.servo_id,
            group: arm.group,
            position: ActuatorPosition(device.center()),
        })
    })
    .collect()
}

fn join_within<T>(
    handle: JoinHandle<T>,
    name: &'static str,
    deadline: Instant,
) -> Option<thread::Result<T>> {
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("{} thread did not stop in time, detaching", name);
            return None;
        }
        thread::sleep(JOIN_POLL);
    }
    debug!("{} thread joined", name);
    Some(handle.join())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SimulatedGateway;
    use crate::types::ChannelGroup;

    #[test]
    fn test_neutral_targets_cover_enabled_arms() {
        let mut config = TeleopConfig::default();
        config.arms.left.enabled = true;

        let targets = neutral_targets(config.enabled_arms().map(|(_, arm)| arm), config.device);
        assert_eq!(targets.len(), 6);
        assert!(targets.iter().all(|t| t.position.value() == 7500));
    }

    #[test]
    fn test_start_and_shutdown() {
        let mut config = TeleopConfig::default();
        config.network.port = 0;
        config.network.receive_timeout_ms = 20;
        config.queue.pop_timeout_ms = 20;

        let mut gateway = SimulatedGateway::new(0);
        gateway.connect("sim", 115_200, Duration::from_secs(1)).unwrap();

        let supervisor = PipelineSupervisor::start(&config, gateway).unwrap();
        assert!(supervisor.local_addr().port() != 0);
        assert!(supervisor.receiver_alive());
        assert!(supervisor.worker_alive());

        supervisor.shutdown().unwrap();
    }

    #[test]
    fn test_wait_returns_when_worker_loses_device() {
        let mut config = TeleopConfig::default();
        config.network.port = 0;
        config.network.receive_timeout_ms = 20;
        config.queue.pop_timeout_ms = 20;

        // Never connected: the first cycle fails fatally
        let supervisor = PipelineSupervisor::start(&config, SimulatedGateway::new(0)).unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(
                br#"{"rightUpperArm": {"x": 0, "y": 0, "z": 0}, "rightLowerArm": {"x": 1, "y": 0, "z": 0}, "rightHand": {"x": 2, "y": 0, "z": 0}}"#,
                supervisor.local_addr(),
            )
            .unwrap();

        supervisor.wait();
        assert!(matches!(
            supervisor.shutdown(),
            Err(PipelineError::Actuation(_))
        ));
    }

    fn quick_config() -> TeleopConfig {
        let mut config = TeleopConfig::default();
        config.network.port = 0;
        config.network.receive_timeout_ms = 20;
        config.queue.pop_timeout_ms = 20;
        config
    }

    #[test]
    fn test_external_cancel_stops_pipeline() {
        // Token handed out (e.g. to a signal handler) before the threads start
        let cancel = CancelToken::new();
        let mut gateway = SimulatedGateway::new(0);
        gateway.connect("sim", 115_200, Duration::from_secs(1)).unwrap();

        let supervisor =
            PipelineSupervisor::start_with_cancel(&quick_config(), gateway, cancel.clone()).unwrap();
        assert!(!supervisor.state().cancel.is_cancelled());

        cancel.cancel();
        supervisor.wait();
        assert!(supervisor.state().cancel.is_cancelled());
        supervisor.shutdown().unwrap();
    }

    #[test]
    fn test_servos_freed_on_exit_when_configured() {
        let mut config = quick_config();
        config.shutdown.free_servos_on_exit = true;
        let supervisor = PipelineSupervisor {
            state: PipelineState::new(1),
            local_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            receiver: None,
            worker: None,
            neutral_targets: neutral_targets(
                config.enabled_arms().map(|(_, arm)| arm),
                config.device,
            ),
            duration_frames: config.gateway.duration_frames,
            free_servos_on_exit: config.shutdown.free_servos_on_exit,
            join_timeout: config.shutdown.join_timeout(),
        };

        let mut gateway = SimulatedGateway::new(0);
        gateway.connect("sim", 115_200, Duration::from_secs(1)).unwrap();
        supervisor.release(&mut gateway);

        assert!(!gateway.is_connected());
        assert_eq!(
            gateway.freed(),
            &[
                (1, ChannelGroup::Group1),
                (2, ChannelGroup::Group1),
                (3, ChannelGroup::Group1)
            ]
        );
    }
}
