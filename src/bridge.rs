//! Command bridge to the high-level control client
//!
//! Translates one logical command into one invocation of the external
//! control executable and returns the parsed result. The executable is
//! stateless per call, so every `execute` spawns it fresh; no process
//! handle survives between calls. All process-lifecycle and I/O failures
//! are classified here so callers only ever see a typed error.

use crate::config::RobotConfig;
use crate::{G1Error, Result};
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Default timeout for one command invocation
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 10_000;

/// Parsed output of one command invocation
#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub data: ResponseData,
    /// Raw standard output, kept for diagnostics
    pub raw: String,
}

/// JSON payload of a response: one value per non-empty stdout line
///
/// A single output line yields `Single`; zero or several lines yield the
/// ordered `Many` form.
#[derive(Debug, Clone)]
pub enum ResponseData {
    Single(Value),
    Many(Vec<Value>),
}

impl ResponseData {
    pub fn first(&self) -> Option<&Value> {
        match self {
            ResponseData::Single(value) => Some(value),
            ResponseData::Many(values) => values.first(),
        }
    }
}

/// One-shot command bridge to the high-level control executable
///
/// Invocations take the form
/// `<executable> --network_interface=<iface> --<command>[=<parameter>]`.
#[derive(Debug, Clone)]
pub struct CommandBridge {
    executable: String,
    network_interface: String,
    timeout_ms: u64,
}

impl CommandBridge {
    pub fn new(executable: &str, network_interface: &str) -> Self {
        Self {
            executable: executable.to_string(),
            network_interface: network_interface.to_string(),
            timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
        }
    }

    pub fn from_config(robot: &RobotConfig) -> Self {
        Self::new(&robot.client_executable, &robot.network_interface)
            .with_timeout_ms(robot.command_timeout_ms())
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Execute a single command against the control executable
    ///
    /// Spawns the executable, collects its output until exit, and parses
    /// standard output as newline-delimited JSON. On timeout the child is
    /// killed and reaped before the error is returned, so a stuck command
    /// never leaks a process.
    pub async fn execute(&self, command: &str, parameter: Option<&str>) -> Result<CommandResponse> {
        let iface_arg = format!("--network_interface={}", self.network_interface);
        let mut command_arg = format!("--{}", command);
        if let Some(parameter) = parameter {
            command_arg.push('=');
            command_arg.push_str(parameter);
        }

        debug!("Invoking {} {} {}", self.executable, iface_arg, command_arg);

        let mut child = Command::new(&self.executable)
            .arg(&iface_arg)
            .arg(&command_arg)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| G1Error::Launch(e.to_string()))?;

        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| G1Error::Launch("stdout not captured".to_string()))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| G1Error::Launch("stderr not captured".to_string()))?;

        // Drain both pipes concurrently with the wait so the child can never
        // block on a full pipe before exiting
        let stdout_task = tokio::spawn(async move {
            let mut buffer = String::new();
            let _ = stdout_pipe.read_to_string(&mut buffer).await;
            buffer
        });
        let stderr_task = tokio::spawn(async move {
            let mut buffer = String::new();
            let _ = stderr_pipe.read_to_string(&mut buffer).await;
            buffer
        });

        let status = match timeout(Duration::from_millis(self.timeout_ms), child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                // Kill and reap before surfacing the error
                let _ = child.kill().await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(G1Error::Timeout(self.timeout_ms));
            }
        };

        let stdout = stdout_task.await?;
        let stderr = stderr_task.await?;

        if !status.success() {
            return Err(G1Error::Process {
                code: status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        parse_response(&stdout)
    }

    /// Execute a command and coerce the response `data` field to an integer
    pub async fn fetch_int(&self, command: &str) -> Result<i64> {
        let response = self.execute(command, None).await?;
        coerce_int(&response)
    }

    /// Execute a command and coerce the response `data` field to a float
    pub async fn fetch_float(&self, command: &str) -> Result<f64> {
        let response = self.execute(command, None).await?;
        coerce_float(&response)
    }

    /// Execute a command and coerce the response `data` field to a float array
    pub async fn fetch_float_array(&self, command: &str) -> Result<Vec<f64>> {
        let response = self.execute(command, None).await?;
        coerce_float_array(&response)
    }

    // Getter commands

    pub async fn get_fsm_id(&self) -> Result<i64> {
        self.fetch_int("get_fsm_id").await
    }

    pub async fn get_fsm_mode(&self) -> Result<i64> {
        self.fetch_int("get_fsm_mode").await
    }

    pub async fn get_balance_mode(&self) -> Result<i64> {
        self.fetch_int("get_balance_mode").await
    }

    pub async fn get_swing_height(&self) -> Result<f64> {
        self.fetch_float("get_swing_height").await
    }

    pub async fn get_stand_height(&self) -> Result<f64> {
        self.fetch_float("get_stand_height").await
    }

    pub async fn get_phase(&self) -> Result<Vec<f64>> {
        self.fetch_float_array("get_phase").await
    }

    // Setter commands

    pub async fn set_fsm_id(&self, id: i64) -> Result<CommandResponse> {
        self.execute("set_fsm_id", Some(&id.to_string())).await
    }

    pub async fn set_balance_mode(&self, mode: i64) -> Result<CommandResponse> {
        self.execute("set_balance_mode", Some(&mode.to_string())).await
    }

    pub async fn set_swing_height(&self, height: f64) -> Result<CommandResponse> {
        self.execute("set_swing_height", Some(&height.to_string())).await
    }

    pub async fn set_stand_height(&self, height: f64) -> Result<CommandResponse> {
        self.execute("set_stand_height", Some(&height.to_string())).await
    }

    pub async fn set_velocity(
        &self,
        vx: f64,
        vy: f64,
        omega: f64,
        duration: f64,
    ) -> Result<CommandResponse> {
        let params = format!("{} {} {} {}", vx, vy, omega, duration);
        self.execute("set_velocity", Some(&params)).await
    }

    pub async fn set_task_id(&self, task_id: i64) -> Result<CommandResponse> {
        self.execute("set_task_id", Some(&task_id.to_string())).await
    }

    pub async fn set_speed_mode(&self, mode: i64) -> Result<CommandResponse> {
        self.execute("set_speed_mode", Some(&mode.to_string())).await
    }

    // Action commands

    pub async fn damp(&self) -> Result<CommandResponse> {
        self.execute("damp", None).await
    }

    pub async fn start(&self) -> Result<CommandResponse> {
        self.execute("start", None).await
    }

    pub async fn squat(&self) -> Result<CommandResponse> {
        self.execute("squat", None).await
    }

    pub async fn sit(&self) -> Result<CommandResponse> {
        self.execute("sit", None).await
    }

    pub async fn stand_up(&self) -> Result<CommandResponse> {
        self.execute("stand_up", None).await
    }

    pub async fn zero_torque(&self) -> Result<CommandResponse> {
        self.execute("zero_torque", None).await
    }

    pub async fn stop_move(&self) -> Result<CommandResponse> {
        self.execute("stop_move", None).await
    }

    pub async fn high_stand(&self) -> Result<CommandResponse> {
        self.execute("high_stand", None).await
    }

    pub async fn low_stand(&self) -> Result<CommandResponse> {
        self.execute("low_stand", None).await
    }

    pub async fn balance_stand(&self) -> Result<CommandResponse> {
        self.execute("balance_stand", None).await
    }

    /// Enable or disable continuous gait
    ///
    /// The executable spells this command `continous_gait`.
    pub async fn continuous_gait(&self, enable: bool) -> Result<CommandResponse> {
        self.execute("continous_gait", Some(bool_param(enable))).await
    }

    pub async fn switch_move_mode(&self, enable: bool) -> Result<CommandResponse> {
        self.execute("switch_move_mode", Some(bool_param(enable))).await
    }

    pub async fn move_velocity(&self, vx: f64, vy: f64, omega: f64) -> Result<CommandResponse> {
        let params = format!("{} {} {}", vx, vy, omega);
        self.execute("move", Some(&params)).await
    }

    pub async fn shake_hand(&self) -> Result<CommandResponse> {
        self.execute("shake_hand", None).await
    }

    pub async fn wave_hand(&self) -> Result<CommandResponse> {
        self.execute("wave_hand", None).await
    }

    pub async fn wave_hand_with_turn(&self) -> Result<CommandResponse> {
        self.execute("wave_hand_with_turn", None).await
    }
}

fn bool_param(enable: bool) -> &'static str {
    if enable {
        "true"
    } else {
        "false"
    }
}

/// Parse process standard output as newline-delimited JSON
fn parse_response(stdout: &str) -> Result<CommandResponse> {
    let mut values = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let value: Value = serde_json::from_str(line).map_err(|e| G1Error::Parse {
            reason: e.to_string(),
            raw: stdout.to_string(),
        })?;
        values.push(value);
    }

    let data = if values.len() == 1 {
        ResponseData::Single(values.remove(0))
    } else {
        ResponseData::Many(values)
    };

    Ok(CommandResponse {
        data,
        raw: stdout.to_string(),
    })
}

/// Extract the `data` field from a single-value response
fn data_field(response: &CommandResponse) -> Result<&Value> {
    let value = match &response.data {
        ResponseData::Single(value) => value,
        ResponseData::Many(_) => {
            return Err(G1Error::Parse {
                reason: "expected a single response value".to_string(),
                raw: response.raw.clone(),
            })
        }
    };

    value.get("data").ok_or_else(|| G1Error::Parse {
        reason: "response has no data field".to_string(),
        raw: response.raw.clone(),
    })
}

fn coerce_int(response: &CommandResponse) -> Result<i64> {
    let data = data_field(response)?;
    match data {
        Value::Number(number) => number.as_i64().ok_or_else(|| G1Error::Parse {
            reason: format!("data is not an integer: {}", number),
            raw: response.raw.clone(),
        }),
        Value::String(text) => text.trim().parse().map_err(|_| G1Error::Parse {
            reason: format!("data is not an integer: {}", text),
            raw: response.raw.clone(),
        }),
        other => Err(G1Error::Parse {
            reason: format!("data is not an integer: {}", other),
            raw: response.raw.clone(),
        }),
    }
}

fn coerce_float(response: &CommandResponse) -> Result<f64> {
    let data = data_field(response)?;
    match data {
        Value::Number(number) => number.as_f64().ok_or_else(|| G1Error::Parse {
            reason: format!("data is not a float: {}", number),
            raw: response.raw.clone(),
        }),
        Value::String(text) => text.trim().parse().map_err(|_| G1Error::Parse {
            reason: format!("data is not a float: {}", text),
            raw: response.raw.clone(),
        }),
        other => Err(G1Error::Parse {
            reason: format!("data is not a float: {}", other),
            raw: response.raw.clone(),
        }),
    }
}

fn coerce_float_array(response: &CommandResponse) -> Result<Vec<f64>> {
    let data = data_field(response)?;
    let parse_err = |detail: String| G1Error::Parse {
        reason: detail,
        raw: response.raw.clone(),
    };

    match data {
        Value::Array(values) => values
            .iter()
            .map(|value| {
                value
                    .as_f64()
                    .ok_or_else(|| parse_err(format!("array element is not a float: {}", value)))
            })
            .collect(),
        // The executable may encode the array as a JSON string
        Value::String(text) => serde_json::from_str(text)
            .map_err(|e| parse_err(format!("data is not a float array: {}", e))),
        other => Err(parse_err(format!("data is not a float array: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::time::Instant;

    /// Write an executable shell script standing in for the control client
    fn write_stub(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("g1d_bridge_{}", name));
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn single_response(value: Value) -> CommandResponse {
        CommandResponse {
            raw: value.to_string(),
            data: ResponseData::Single(value),
        }
    }

    #[tokio::test]
    async fn test_execute_single_json_line() {
        let stub = write_stub(
            "single",
            r#"echo '{"status":"success","message":"FSM ID retrieved","data":4}'"#,
        );
        let bridge = CommandBridge::new(stub.to_str().unwrap(), "lo");

        let response = bridge.execute("get_fsm_id", None).await.unwrap();
        match &response.data {
            ResponseData::Single(value) => assert_eq!(value["data"], json!(4)),
            other => panic!("expected single value, got {:?}", other),
        }

        // Typed accessor over the same stub
        assert_eq!(bridge.get_fsm_id().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_execute_multiple_json_lines_preserve_order() {
        let stub = write_stub("multi", "echo '{\"a\":1}'\necho '{\"b\":2}'");
        let bridge = CommandBridge::new(stub.to_str().unwrap(), "lo");

        let response = bridge.execute("get_phase", None).await.unwrap();
        match &response.data {
            ResponseData::Many(values) => {
                assert_eq!(values.len(), 2);
                assert_eq!(values[0], json!({"a": 1}));
                assert_eq!(values[1], json!({"b": 2}));
            }
            other => panic!("expected many values, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let stub = write_stub("fail", "echo 'dds channel init failed' >&2\nexit 3");
        let bridge = CommandBridge::new(stub.to_str().unwrap(), "lo");

        match bridge.execute("start", None).await {
            Err(G1Error::Process { code, stderr }) => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "dds channel init failed");
            }
            other => panic!("expected process failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_output_preserves_raw() {
        let stub = write_stub("garbled", "echo 'not json at all'");
        let bridge = CommandBridge::new(stub.to_str().unwrap(), "lo");

        match bridge.execute("get_phase", None).await {
            Err(G1Error::Parse { raw, .. }) => assert!(raw.contains("not json at all")),
            other => panic!("expected parse failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_failure() {
        let bridge = CommandBridge::new("/nonexistent/robot_client_g1d_test", "lo");

        let started = Instant::now();
        let result = bridge.execute("damp", None).await;

        assert!(matches!(result, Err(G1Error::Launch(_))));
        // Launch failures must not wait out the command timeout
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_timeout_kills_stuck_process() {
        let stub = write_stub("stuck", "sleep 30");
        let bridge = CommandBridge::new(stub.to_str().unwrap(), "lo").with_timeout_ms(200);

        let started = Instant::now();
        let result = bridge.execute("get_fsm_id", None).await;

        match result {
            Err(G1Error::Timeout(timeout_ms)) => assert_eq!(timeout_ms, 200),
            other => panic!("expected timeout, got {:?}", other),
        }
        // The kill happens before the error surfaces; the full sleep never runs
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_parse_response_empty_output() {
        let response = parse_response("").unwrap();
        match response.data {
            ResponseData::Many(values) => assert!(values.is_empty()),
            other => panic!("expected empty many, got {:?}", other),
        }
    }

    #[test]
    fn test_coerce_int_from_string_and_number() {
        let response = single_response(json!({"status": "success", "data": "7"}));
        assert_eq!(coerce_int(&response).unwrap(), 7);

        let response = single_response(json!({"status": "success", "data": 7}));
        assert_eq!(coerce_int(&response).unwrap(), 7);

        let response = single_response(json!({"status": "success", "data": "abc"}));
        assert!(matches!(coerce_int(&response), Err(G1Error::Parse { .. })));
    }

    #[test]
    fn test_coerce_float_array_from_string_and_array() {
        let response = single_response(json!({"status": "success", "data": "[0.1, 0.9]"}));
        assert_eq!(coerce_float_array(&response).unwrap(), vec![0.1, 0.9]);

        let response = single_response(json!({"status": "success", "data": [0.25, 0.75]}));
        assert_eq!(coerce_float_array(&response).unwrap(), vec![0.25, 0.75]);
    }

    #[test]
    fn test_missing_data_field() {
        let response = single_response(json!({"status": "success"}));
        assert!(matches!(coerce_float(&response), Err(G1Error::Parse { .. })));
    }
}
