//! G1 Motion Daemon
//!
//! Interactive front end for the G1 control library:
//! - Spawns the persistent low-level motor control process
//! - Executes one-shot high-level commands through the command bridge
//! - Reads motion commands from stdin and dispatches them to the controller
//!
//! Log output goes to stderr; structured JSON events go to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use g1d::{
    events, CommandBridge, DaemonConfig, MotionController, MotorStream, SequenceOptions,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "g1d")]
#[command(about = "G1 Motion Daemon - process bridge with motion orchestration")]
#[command(version)]
struct Args {
    /// Path to the daemon configuration file
    #[arg(short, long)]
    config: Option<String>,
}

impl Args {
    fn get_config_path(&self) -> String {
        self.config
            .clone()
            .or_else(|| std::env::var("G1D_CONFIG_PATH").ok())
            .unwrap_or_else(|| "config/default_config.yaml".to_string())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.get_config_path();

    // Initialize tracing subscriber; stdout stays reserved for JSON events
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    info!("G1 Motion Daemon");
    info!("{}", "=".repeat(50));
    info!("Using config: {}", config_path);

    let config = DaemonConfig::load_from_path(&config_path)
        .context("Failed to load daemon configuration")?;

    let bridge = CommandBridge::from_config(&config.robot);

    let motor = match MotorStream::spawn(&config.robot).await {
        Ok(motor) => Arc::new(motor),
        Err(e) => {
            error!("Failed to start motor control process: {}", e);
            error!("Make sure:");
            error!("   - The motor control executable exists and is executable");
            error!("   - The network interface in the config is correct");
            return Err(e).context("Motor control startup failed");
        }
    };

    let controller = MotionController::new(&config, motor.clone())
        .context("Failed to create motion controller")?;

    info!("Ready for commands (type 'help' for a list)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }
        };

        let Some(line) = line else {
            break; // stdin closed
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if !process_command(input, &bridge, &motor, &controller).await {
            break;
        }
    }

    // Graceful shutdown
    info!("Performing graceful shutdown");
    controller.stop();
    motor.shutdown().await.context("Failed during shutdown")?;

    info!("Shutdown complete");
    Ok(())
}

/// Dispatch one input line; returns false when the daemon should exit
async fn process_command(
    input: &str,
    bridge: &CommandBridge,
    motor: &Arc<MotorStream>,
    controller: &MotionController,
) -> bool {
    let parts: Vec<&str> = input.split_whitespace().collect();

    let result = match parts[0] {
        "enable" => motor.enable().await,
        "disable" => motor.disable().await,
        "status" => motor.status().await,
        "list" => motor.list_joints().await,
        "pose" => match parts.get(1) {
            Some(name) => controller.execute_pose(name).await,
            None => {
                info!("Available poses: {}", controller.pose_names().join(", "));
                Ok(())
            }
        },
        "move" => run_move(&parts, controller).await,
        "smooth" => run_smooth(&parts, controller).await,
        "seq" => run_sequence(&parts, controller).await,
        "stop" => {
            controller.stop();
            Ok(())
        }
        "record" => run_record(&parts, controller).await,
        "play" => match parse_float(parts.get(1), 1.0) {
            Ok(speed) => controller.playback(speed).await.map(|_| ()),
            Err(e) => Err(e),
        },
        "cmd" => run_bridge_command(&parts, bridge).await,
        "help" => {
            print_help();
            Ok(())
        }
        "quit" | "exit" => return false,
        unknown => {
            info!("Unknown command: {} (type 'help' for a list)", unknown);
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
    }
    true
}

async fn run_move(parts: &[&str], controller: &MotionController) -> g1d::Result<()> {
    let (Some(joint), Some(position)) = (parts.get(1), parts.get(2)) else {
        info!("Usage: move <joint> <position>");
        return Ok(());
    };
    let position = parse_float(Some(position), 0.0)?;

    if controller.safe_move(joint, position).await? {
        // Capture accepted moves while a recording window is open
        controller.record_motion(joint, position).await;
    }
    Ok(())
}

async fn run_smooth(parts: &[&str], controller: &MotionController) -> g1d::Result<()> {
    let (Some(joint), Some(target)) = (parts.get(1), parts.get(2)) else {
        info!("Usage: smooth <joint> <target> [duration_ms]");
        return Ok(());
    };
    let target = parse_float(Some(target), 0.0)?;
    let duration_ms = match parts.get(3) {
        Some(raw) => raw
            .parse()
            .map_err(|_| g1d::G1Error::Config(format!("Invalid duration: {}", raw)))?,
        None => 2000,
    };

    let steps = controller.motion().smooth_steps();
    controller
        .smooth_move(joint, target, duration_ms, steps, None)
        .await
        .map(|_| ())
}

async fn run_sequence(parts: &[&str], controller: &MotionController) -> g1d::Result<()> {
    let Some(name) = parts.get(1) else {
        info!(
            "Available sequences: {}",
            controller.sequence_names().await.join(", ")
        );
        return Ok(());
    };

    let options = SequenceOptions {
        loop_forever: parts.get(2) == Some(&"loop"),
        ..SequenceOptions::default()
    };

    // The run advances in the background; completion shows up as JSON events
    controller.execute_sequence(name, options).await.map(|_| ())
}

async fn run_record(parts: &[&str], controller: &MotionController) -> g1d::Result<()> {
    match parts.get(1) {
        Some(&"start") => controller.start_recording().await,
        Some(&"stop") => {
            let motion = controller.stop_recording().await;
            info!("Recorded {} motions", motion.len());
        }
        _ => info!("Usage: record start|stop"),
    }
    Ok(())
}

async fn run_bridge_command(parts: &[&str], bridge: &CommandBridge) -> g1d::Result<()> {
    let Some(command) = parts.get(1) else {
        info!("Usage: cmd <command> [parameter]");
        return Ok(());
    };
    let parameter = if parts.len() > 2 {
        Some(parts[2..].join(" "))
    } else {
        None
    };

    match bridge.execute(command, parameter.as_deref()).await {
        Ok(response) => {
            events::output::command_completed(command, Some(response.raw.trim().to_string()));
            Ok(())
        }
        Err(e) => {
            events::output::command_failed(command, &e.to_string());
            Err(e)
        }
    }
}

fn parse_float(raw: Option<&&str>, default: f64) -> g1d::Result<f64> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| g1d::G1Error::Config(format!("Invalid number: {}", raw))),
        None => Ok(default),
    }
}

fn print_help() {
    info!("Available commands:");
    info!("  enable | disable             - Toggle low-level motor control");
    info!("  status | list                - Query the motor control process");
    info!("  pose [name]                  - Apply a pose preset");
    info!("  move <joint> <position>      - Safety-checked joint move");
    info!("  smooth <joint> <target> [ms] - Eased interpolated move");
    info!("  seq [name] [loop]            - Run a motion sequence");
    info!("  stop                         - Stop the active sequence");
    info!("  record start|stop            - Manage the recording window");
    info!("  play [speed]                 - Replay the last recording");
    info!("  cmd <command> [parameter]    - One-shot high-level command");
    info!("  quit                         - Exit");
}
