//! G1 Motion Daemon - Unitree G1 control library
//!
//! This library mediates between a high-level orchestration layer and the
//! G1 robot's control executables. The high-level client is a stateless
//! one-shot process spawned per command; the low-level motor controller is
//! a persistent process driven by line commands on stdin. On top of that
//! bridge sit safety-bounded joint commands, eased trajectory
//! interpolation, synchronized multi-joint motion, declarative looping
//! sequences, and timestamped motion recording and playback.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use g1d::{CommandBridge, DaemonConfig, MotionController, MotorStream, SequenceOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DaemonConfig::load_from_path("config/default_config.yaml")?;
//!
//!     // One-shot high-level commands
//!     let bridge = CommandBridge::from_config(&config.robot);
//!     bridge.stand_up().await?;
//!     println!("FSM id: {}", bridge.get_fsm_id().await?);
//!
//!     // Persistent low-level joint control
//!     let motor = Arc::new(MotorStream::spawn(&config.robot).await?);
//!     motor.enable().await?;
//!
//!     let controller = MotionController::new(&config, motor.clone())?;
//!     controller.smooth_move("left_elbow_pitch", 1.2, 2000, 50, None).await?;
//!     controller.execute_sequence("greeting", SequenceOptions::default()).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **CommandBridge**: one-shot command/response bridge to the high-level client
//! - **MotorStream**: persistent low-level joint command session
//! - **SafetyLimiter**: per-joint position range validation
//! - **MotionController**: trajectories, sequences, recording and playback
//! - Events: newline-delimited JSON on stdout, logs on stderr

pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod motor;
pub mod recorder;
pub mod safety;
pub mod sequence;
pub mod trajectory;

// High-level exports for easy usage
pub use bridge::{CommandBridge, CommandResponse, ResponseData};
pub use config::{DaemonConfig, MotionConfig, RobotConfig, StepConfig};
pub use controller::{MotionController, SequenceOptions};
pub use error::{G1Error, Result};
pub use motor::{CommandSink, JointCommand, MotorStream};
pub use recorder::{MotionRecorder, RecordedMotion, RecordedSample};
pub use safety::{JointRange, SafetyLimiter, SafetyViolation};
pub use sequence::{Sequence, SequenceAction, SequenceOutcome, Step, StepKind};
pub use trajectory::{ease_in_out, EasedTrajectory};

// Event exports
pub use events::{
    CommandEvent, PlaybackEvent, PlaybackPhase, SafetyEvent, SequenceEvent, SequencePhase,
};
