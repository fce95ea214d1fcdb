//! Configuration loading for the G1 daemon

use crate::{G1Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DaemonConfig {
    pub robot: RobotConfig,
    pub motion: Option<MotionConfig>,
    /// Per-joint allowed position range as [min, max], radians
    #[serde(default)]
    pub safety_limits: HashMap<String, [f64; 2]>,
    /// Named pose presets: pose name -> joint -> position
    #[serde(default)]
    pub poses: HashMap<String, HashMap<String, f64>>,
    /// Declarative motion sequences: sequence name -> steps
    #[serde(default)]
    pub sequences: HashMap<String, Vec<StepConfig>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotConfig {
    /// Path to the one-shot high-level client executable
    pub client_executable: String,
    /// Path to the persistent low-level motor control executable
    pub motor_executable: String,
    /// Network interface passed to both executables
    pub network_interface: String,
    pub command_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MotionConfig {
    pub default_kp: Option<f64>,
    pub default_kd: Option<f64>,
    pub step_delay_ms: Option<u64>,
    pub smooth_steps: Option<u32>,
}

/// One step of a configured sequence
///
/// Exactly one of `pose` or `joints` should be set; the conversion into the
/// runtime step type rejects ambiguous or empty entries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepConfig {
    pub description: Option<String>,
    pub pose: Option<String>,
    pub joints: Option<HashMap<String, f64>>,
    pub duration_ms: Option<u64>,
}

impl RobotConfig {
    /// Get command timeout with default fallback
    pub fn command_timeout_ms(&self) -> u64 {
        self.command_timeout_ms.unwrap_or(10_000)
    }
}

impl MotionConfig {
    /// Get default position gain with fallback
    pub fn default_kp(&self) -> f64 {
        self.default_kp.unwrap_or(60.0)
    }

    /// Get default damping gain with fallback
    pub fn default_kd(&self) -> f64 {
        self.default_kd.unwrap_or(1.5)
    }

    /// Get default inter-step delay with fallback
    pub fn step_delay_ms(&self) -> u64 {
        self.step_delay_ms.unwrap_or(1000)
    }

    /// Get default smooth-move sample count with fallback
    pub fn smooth_steps(&self) -> u32 {
        self.smooth_steps.unwrap_or(50)
    }
}

impl DaemonConfig {
    pub fn load_from_path(config_path: &str) -> Result<Self> {
        let contents = fs::read_to_string(config_path)
            .map_err(|e| G1Error::Config(format!("Failed to read {}: {}", config_path, e)))?;

        Self::load_from_str(&contents)
    }

    pub fn load_from_str(contents: &str) -> Result<Self> {
        let config: DaemonConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Get motion configuration with defaults
    pub fn motion(&self) -> MotionConfig {
        self.motion.clone().unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        for (joint, range) in &self.safety_limits {
            if range[0] > range[1] {
                return Err(G1Error::Config(format!(
                    "Invalid safety range for {}: min {} > max {}",
                    joint, range[0], range[1]
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
robot:
  client_executable: ./robot_client
  motor_executable: ./motor_control
  network_interface: eth0
safety_limits:
  left_elbow_pitch: [-2.09, 2.09]
poses:
  home:
    left_elbow_pitch: 0.0
sequences:
  greeting:
    - pose: home
      duration_ms: 1000
    - joints:
        left_elbow_pitch: 1.0
      duration_ms: 500
"#;

    #[test]
    fn test_load_sample_config() {
        let config = DaemonConfig::load_from_str(SAMPLE).unwrap();

        assert_eq!(config.robot.network_interface, "eth0");
        assert_eq!(config.safety_limits["left_elbow_pitch"], [-2.09, 2.09]);
        assert_eq!(config.poses["home"]["left_elbow_pitch"], 0.0);
        assert_eq!(config.sequences["greeting"].len(), 2);
        assert_eq!(config.sequences["greeting"][0].pose.as_deref(), Some("home"));
        assert_eq!(config.sequences["greeting"][1].duration_ms, Some(500));
    }

    #[test]
    fn test_defaults_when_omitted() {
        let config = DaemonConfig::load_from_str(SAMPLE).unwrap();

        assert_eq!(config.robot.command_timeout_ms(), 10_000);
        let motion = config.motion();
        assert_eq!(motion.default_kp(), 60.0);
        assert_eq!(motion.default_kd(), 1.5);
        assert_eq!(motion.step_delay_ms(), 1000);
        assert_eq!(motion.smooth_steps(), 50);
    }

    #[test]
    fn test_inverted_safety_range_rejected() {
        let contents = r#"
robot:
  client_executable: ./robot_client
  motor_executable: ./motor_control
  network_interface: lo
safety_limits:
  waist_yaw: [0.79, -0.79]
"#;
        let result = DaemonConfig::load_from_str(contents);
        assert!(matches!(result, Err(G1Error::Config(_))));
    }
}
