//! Error types for G1 control operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, G1Error>;

#[derive(Error, Debug)]
pub enum G1Error {
    #[error("Failed to start control process: {0}")]
    Launch(String),

    #[error("Command timed out after {0}ms")]
    Timeout(u64),

    #[error("Control process exited with code {code}: {stderr}")]
    Process { code: i32, stderr: String },

    #[error("Failed to parse response: {reason}. Raw output: {raw}")]
    Parse { reason: String, raw: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Motor stream error: {0}")]
    Motor(String),

    #[error("Tokio task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
