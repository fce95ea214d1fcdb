//! Persistent low-level motor stream
//!
//! Unlike the one-shot high-level client, the motor control executable runs
//! as a single long-lived process: it is spawned once with the network
//! interface as its argument and then driven by line commands on stdin
//! (`start`, `stop`, `status`, `list`, `quit`, or a whitespace-joined
//! per-joint command). This module owns that process exclusively and
//! forwards its output to the log.

use crate::config::{MotionConfig, RobotConfig};
use crate::{G1Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// A single joint position command
#[derive(Debug, Clone, PartialEq)]
pub struct JointCommand {
    pub joint: String,
    pub position: f64,
    pub velocity: f64,
    pub kp: f64,
    pub kd: f64,
    pub tau: f64,
}

impl JointCommand {
    /// Build a position-only command with configured gain defaults
    pub fn new(joint: &str, position: f64, motion: &MotionConfig) -> Self {
        Self {
            joint: joint.to_string(),
            position,
            velocity: 0.0,
            kp: motion.default_kp(),
            kd: motion.default_kd(),
            tau: 0.0,
        }
    }

    /// Wire form: `<joint> <position> <velocity> <kp> <kd> <tau>`
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.joint, self.position, self.velocity, self.kp, self.kd, self.tau
        )
    }
}

/// Sink for joint commands
///
/// The seam between the orchestration layer and whatever carries joint
/// commands to the robot. Production uses [`MotorStream`]; tests substitute
/// an in-memory implementation.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn send_joint(&self, command: &JointCommand) -> Result<()>;
}

/// Client for the persistent motor control process
pub struct MotorStream {
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
}

impl MotorStream {
    /// Spawn the motor control process and attach to its pipes
    pub async fn spawn(robot: &RobotConfig) -> Result<Self> {
        info!(
            "Starting motor control process: {} {}",
            robot.motor_executable, robot.network_interface
        );

        let mut child = Command::new(&robot.motor_executable)
            .arg(&robot.network_interface)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| G1Error::Launch(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| G1Error::Motor("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| G1Error::Motor("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| G1Error::Motor("stderr not captured".to_string()))?;

        // Forward process output to the log; the tasks end when the pipes close
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("motor: {}", line);
            }
        });
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!("motor: {}", line);
            }
        });

        info!("Motor control process started");

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(Some(stdin)),
        })
    }

    async fn send_line(&self, line: &str) -> Result<()> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard
            .as_mut()
            .ok_or_else(|| G1Error::Motor("motor stream is shut down".to_string()))?;

        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Enable motor control on the process
    pub async fn enable(&self) -> Result<()> {
        self.send_line("start").await
    }

    /// Disable motor control on the process
    pub async fn disable(&self) -> Result<()> {
        self.send_line("stop").await
    }

    /// Request a status report (printed to the process log)
    pub async fn status(&self) -> Result<()> {
        self.send_line("status").await
    }

    /// Request the joint list (printed to the process log)
    pub async fn list_joints(&self) -> Result<()> {
        self.send_line("list").await
    }

    /// Ask the process to quit, then make sure it is gone
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down motor control process");

        // Best effort polite quit
        let _ = self.send_line("quit").await;
        self.stdin.lock().await.take();

        let mut child = self.child.lock().await;
        match timeout(Duration::from_millis(500), child.wait()).await {
            Ok(status) => {
                status?;
            }
            Err(_) => {
                warn!("Motor control process did not exit on quit, killing it");
                child.kill().await?;
            }
        }

        info!("Motor control process stopped");
        Ok(())
    }
}

#[async_trait]
impl CommandSink for MotorStream {
    async fn send_joint(&self, command: &JointCommand) -> Result<()> {
        debug!("Joint command: {}", command.to_line());
        self.send_line(&command.to_line()).await
    }
}
