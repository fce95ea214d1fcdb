//! JSON event output for the G1 daemon
//!
//! Provides structured JSON events for command status, safety violations,
//! sequence progress, and recording playback that can be consumed by
//! external tools. Events are written to stdout one JSON object per line;
//! logging goes to stderr.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp as f64 seconds since UNIX epoch with consistent precision
pub fn current_timestamp() -> f64 {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();

    // Round to 6 decimal places for consistent formatting
    (timestamp * 1_000_000.0).round() / 1_000_000.0
}

/// Command execution status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Completed,
    Failed,
}

/// High-level command execution event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEvent {
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Command name as passed to the control executable
    pub command: String,
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Safety violation event: a requested position fell outside the allowed range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyEvent {
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub joint: String,
    pub position: f64,
    pub min: f64,
    pub max: f64,
}

/// Sequence lifecycle event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencePhase {
    Started,
    Step,
    Completed,
    Superseded,
    Stopped,
}

/// Sequence progress event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceEvent {
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub sequence: String,
    pub phase: SequencePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
}

/// Playback lifecycle event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    Started,
    Completed,
    /// Playback was requested with nothing recorded
    Empty,
}

/// Recording playback event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackEvent {
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub phase: PlaybackPhase,
    pub speed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands: Option<usize>,
}

impl CommandEvent {
    pub fn completed(command: &str, message: Option<String>) -> Self {
        Self {
            timestamp: current_timestamp(),
            event_type: "command_status".to_string(),
            command: command.to_string(),
            status: CommandStatus::Completed,
            message,
        }
    }

    pub fn failed(command: &str, error: &str) -> Self {
        Self {
            timestamp: current_timestamp(),
            event_type: "command_status".to_string(),
            command: command.to_string(),
            status: CommandStatus::Failed,
            message: Some(error.to_string()),
        }
    }
}

impl SafetyEvent {
    pub fn new(joint: &str, position: f64, min: f64, max: f64) -> Self {
        Self {
            timestamp: current_timestamp(),
            event_type: "safety_violation".to_string(),
            joint: joint.to_string(),
            position,
            min,
            max,
        }
    }
}

impl SequenceEvent {
    pub fn new(sequence: &str, phase: SequencePhase, step_index: Option<usize>) -> Self {
        Self {
            timestamp: current_timestamp(),
            event_type: "sequence".to_string(),
            sequence: sequence.to_string(),
            phase,
            step_index,
        }
    }
}

impl PlaybackEvent {
    pub fn new(phase: PlaybackPhase, speed: f64, commands: Option<usize>) -> Self {
        Self {
            timestamp: current_timestamp(),
            event_type: "playback".to_string(),
            phase,
            speed,
            commands,
        }
    }
}

/// Output a JSON event to stdout
pub fn output_event<T: Serialize>(event: &T) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{}", json);
    }
}

/// Convenience functions for outputting specific event types
pub mod output {
    use super::*;

    pub fn command_completed(command: &str, message: Option<String>) {
        output_event(&CommandEvent::completed(command, message));
    }

    pub fn command_failed(command: &str, error: &str) {
        output_event(&CommandEvent::failed(command, error));
    }

    pub fn safety_violation(joint: &str, position: f64, min: f64, max: f64) {
        output_event(&SafetyEvent::new(joint, position, min, max));
    }

    pub fn sequence(sequence: &str, phase: SequencePhase, step_index: Option<usize>) {
        output_event(&SequenceEvent::new(sequence, phase, step_index));
    }

    pub fn playback(phase: PlaybackPhase, speed: f64, commands: Option<usize>) {
        output_event(&PlaybackEvent::new(phase, speed, commands));
    }
}
