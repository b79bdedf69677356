use clap::Parser;
use eyre::Result;
use humanoid_lib::{
    init_tracing, ActuationGateway, CancelToken, PipelineSupervisor, SimulatedGateway, TeleopConfig,
};
use std::path::Path;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config/pose_teleop.toml";

#[derive(Parser)]
#[command(name = "pose_teleop")]
#[command(about = "Drive humanoid servos from streamed avatar poses")]
struct Cli {
    /// Configuration file (falls back to POSE_TELEOP_CONFIG, then the default path)
    #[arg(short, long)]
    config: Option<String>,

    /// Status polls a stored motion reports "playing" on the simulated board
    #[arg(long, default_value_t = 10)]
    motion_polls: u32,
}

fn load_config(cli: &Cli) -> Result<TeleopConfig> {
    let explicit = cli
        .config
        .clone()
        .or_else(|| std::env::var("POSE_TELEOP_CONFIG").ok());

    match explicit {
        Some(path) => TeleopConfig::load_from_file(&path)
            .map_err(|e| eyre::eyre!("Failed to load config from {}: {}", path, e)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            TeleopConfig::load_from_file(DEFAULT_CONFIG_PATH).map_err(|e| {
                eyre::eyre!("Failed to load config from {}: {}", DEFAULT_CONFIG_PATH, e)
            })
        }
        None => {
            warn!("Config file not found at {}", DEFAULT_CONFIG_PATH);
            warn!("Using built-in defaults");
            Ok(TeleopConfig::default())
        }
    }
}

fn main() -> Result<()> {
    let _guard = init_tracing();
    let cli = Cli::parse();

    info!("Starting pose teleop node");

    let config = load_config(&cli)?;
    info!(
        "Listening on {}, queue capacity {}",
        config.network.socket_addr(),
        config.queue.capacity
    );
    for (side, arm) in config.enabled_arms() {
        info!(
            "  {:?} arm on SIO{} (servos {}, {}, {})",
            side,
            arm.group.sio(),
            arm.shoulder_pitch.servo_id,
            arm.upper_arm_yaw.servo_id,
            arm.elbow_bend.servo_id
        );
    }

    // Before the gateway connects, so a failure here leaves nothing to release
    let cancel = CancelToken::new();
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || handler_cancel.cancel())?;

    let mut gateway = SimulatedGateway::new(cli.motion_polls);
    info!("Connecting to motor controller on {}...", config.gateway.port);
    gateway
        .connect(
            &config.gateway.port,
            config.gateway.baud,
            config.gateway.timeout(),
        )
        .map_err(|e| eyre::eyre!("Failed to connect on {}: {}", config.gateway.port, e))?;

    if !gateway.is_ready() {
        gateway.disconnect();
        return Err(eyre::eyre!(
            "Motor controller on {} did not acknowledge; check the port and wiring",
            config.gateway.port
        ));
    }

    let supervisor = PipelineSupervisor::start_with_cancel(&config, gateway, cancel)?;

    info!("Press Ctrl+C to stop");
    supervisor.wait();

    supervisor.shutdown()?;
    info!("Pose teleop node stopped");
    Ok(())
}
