//! Motion controller
//!
//! Facade over the safety limiter, the joint command sink, sequence
//! execution and motion recording. Every joint command the orchestration
//! layer produces flows through here; the controller never talks to a
//! process directly, only through the configured [`CommandSink`].
//!
//! Sequence cancellation is cooperative: each run holds a generation number
//! and re-checks it against the controller's active generation before every
//! step, so starting a new sequence (or calling [`MotionController::stop`])
//! halts the previous run at its next step boundary without touching a step
//! already in flight.

use crate::config::{DaemonConfig, MotionConfig};
use crate::events::{self, PlaybackPhase, SequencePhase};
use crate::motor::{CommandSink, JointCommand};
use crate::recorder::{MotionRecorder, RecordedMotion};
use crate::safety::SafetyLimiter;
use crate::sequence::{Sequence, SequenceOutcome, Step, StepKind};
use crate::trajectory::EasedTrajectory;
use crate::{G1Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info};

/// Generation value meaning no sequence run is active
const NO_ACTIVE_RUN: u64 = 0;

/// Options for a sequence run
#[derive(Debug, Clone, Copy)]
pub struct SequenceOptions {
    /// Delay between steps when a step declares no duration
    pub delay_ms: u64,
    pub loop_forever: bool,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            loop_forever: false,
        }
    }
}

/// Motion controller for one robot
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct MotionController {
    inner: Arc<Inner>,
}

struct Inner {
    motion: MotionConfig,
    safety: SafetyLimiter,
    sink: Arc<dyn CommandSink>,
    poses: HashMap<String, HashMap<String, f64>>,
    sequences: Mutex<HashMap<String, Sequence>>,
    /// Source of sequence run generations
    run_counter: AtomicU64,
    /// Generation of the currently advancing run, or NO_ACTIVE_RUN
    active_run: AtomicU64,
    recorder: Mutex<MotionRecorder>,
}

impl MotionController {
    /// Build a controller from configuration and a joint command sink
    pub fn new(config: &DaemonConfig, sink: Arc<dyn CommandSink>) -> Result<Self> {
        let mut sequences = HashMap::new();
        for (name, steps) in &config.sequences {
            sequences.insert(name.clone(), Sequence::from_config(name, steps)?);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                motion: config.motion(),
                safety: SafetyLimiter::new(&config.safety_limits),
                sink,
                poses: config.poses.clone(),
                sequences: Mutex::new(sequences),
                run_counter: AtomicU64::new(NO_ACTIVE_RUN),
                active_run: AtomicU64::new(NO_ACTIVE_RUN),
                recorder: Mutex::new(MotionRecorder::new()),
            }),
        })
    }

    pub fn safety(&self) -> &SafetyLimiter {
        &self.inner.safety
    }

    pub fn motion(&self) -> &MotionConfig {
        &self.inner.motion
    }

    /// Send a joint command without safety checking
    pub async fn move_joint(&self, joint: &str, position: f64) -> Result<()> {
        let command = JointCommand::new(joint, position, &self.inner.motion);
        self.inner.sink.send_joint(&command).await
    }

    /// Send a fully specified joint command without safety checking
    pub async fn send_command(&self, command: &JointCommand) -> Result<()> {
        self.inner.sink.send_joint(command).await
    }

    /// Safety-checked variant of [`MotionController::send_command`]
    pub async fn safe_send(&self, command: &JointCommand) -> Result<bool> {
        if self.reject_unsafe(&command.joint, command.position) {
            return Ok(false);
        }

        self.inner.sink.send_joint(command).await?;
        Ok(true)
    }

    /// Safety-checked joint move
    ///
    /// Returns `Ok(false)` when the target is outside the joint's allowed
    /// range; the violation is logged and emitted as a JSON event and no
    /// command is sent. Rejection is not an error.
    pub async fn safe_move(&self, joint: &str, position: f64) -> Result<bool> {
        if self.reject_unsafe(joint, position) {
            return Ok(false);
        }

        self.move_joint(joint, position).await?;
        Ok(true)
    }

    /// Batch of unchecked joint moves
    pub async fn move_joints(&self, targets: &HashMap<String, f64>) -> Result<()> {
        for (joint, position) in targets {
            self.move_joint(joint, *position).await?;
        }
        Ok(())
    }

    /// Apply a named pose preset as a batch of joint commands
    pub async fn execute_pose(&self, name: &str) -> Result<()> {
        let pose = self
            .inner
            .poses
            .get(name)
            .cloned()
            .ok_or_else(|| G1Error::Config(format!("Unknown pose: {}", name)))?;

        info!("Executing pose: {}", name);
        self.move_joints(&pose).await
    }

    pub fn pose_names(&self) -> Vec<String> {
        self.inner.poses.keys().cloned().collect()
    }

    /// Smoothly interpolate one joint toward a target
    ///
    /// `start` is the assumed current position. There is no position
    /// feedback channel in this layer, so an unknown start falls back to
    /// 0.0; callers that track positions should pass them in. Samples are
    /// sent in strictly increasing progress order with `duration_ms / steps`
    /// between them and no wait after the final one.
    pub async fn smooth_move(
        &self,
        joint: &str,
        target: f64,
        duration_ms: u64,
        steps: u32,
        start: Option<f64>,
    ) -> Result<bool> {
        if self.reject_unsafe(joint, target) {
            return Ok(false);
        }

        let start = start.unwrap_or(0.0);
        let trajectory = EasedTrajectory::new(start, target, steps);
        let total = trajectory.total_samples();
        let step_delay = Duration::from_millis(duration_ms / u64::from(steps));

        for (index, position) in trajectory.enumerate() {
            self.move_joint(joint, position).await?;
            if index + 1 < total {
                sleep(step_delay).await;
            }
        }

        Ok(true)
    }

    /// Move several joints concurrently, each on its own eased timeline
    ///
    /// Completes when every per-joint move has finished. Failures are
    /// isolated per joint: a safety-rejected target or a failed send stops
    /// only that joint's timeline. Returns each joint with a flag telling
    /// whether its move ran to completion.
    pub async fn synchronized_move(
        &self,
        targets: &HashMap<String, f64>,
        duration_ms: u64,
        steps: u32,
    ) -> Result<Vec<(String, bool)>> {
        let mut handles = Vec::with_capacity(targets.len());

        for (joint, target) in targets {
            let controller = self.clone();
            let joint = joint.clone();
            let target = *target;

            handles.push(tokio::spawn(async move {
                let completed = match controller
                    .smooth_move(&joint, target, duration_ms, steps, None)
                    .await
                {
                    Ok(sent) => sent,
                    Err(e) => {
                        error!("Smooth move failed for {}: {}", joint, e);
                        false
                    }
                };
                (joint, completed)
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await?);
        }
        Ok(outcomes)
    }

    /// Register a sequence definition
    pub async fn define_sequence(&self, sequence: Sequence) {
        info!(
            "Sequence '{}' defined with {} steps",
            sequence.name,
            sequence.steps.len()
        );
        self.inner
            .sequences
            .lock()
            .await
            .insert(sequence.name.clone(), sequence);
    }

    pub async fn sequence_names(&self) -> Vec<String> {
        self.inner.sequences.lock().await.keys().cloned().collect()
    }

    /// Start executing a named sequence
    ///
    /// Returns a handle resolving to the run's outcome. Starting a sequence
    /// supersedes any active run: the old run halts before its next step,
    /// without an error.
    pub async fn execute_sequence(
        &self,
        name: &str,
        options: SequenceOptions,
    ) -> Result<JoinHandle<SequenceOutcome>> {
        let sequence = self
            .inner
            .sequences
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| G1Error::Config(format!("Unknown sequence: {}", name)))?;

        // Install a fresh generation; any previous run fails its next check.
        // fetch_max keeps the newest generation current even when two starts
        // race, so a stale run can never win the slot back.
        let generation = self.inner.run_counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.active_run.fetch_max(generation, Ordering::SeqCst);

        info!("Executing sequence: {}", sequence.name);
        events::output::sequence(&sequence.name, SequencePhase::Started, None);

        let controller = self.clone();
        Ok(tokio::spawn(async move {
            controller.run_sequence(sequence, generation, options).await
        }))
    }

    /// Stop the active sequence
    ///
    /// Asynchronous cancellation: a step already dispatched still completes;
    /// the next scheduled step never runs.
    pub fn stop(&self) {
        let previous = self.inner.active_run.swap(NO_ACTIVE_RUN, Ordering::SeqCst);
        if previous != NO_ACTIVE_RUN {
            info!("Stopping active sequence");
        }
    }

    async fn run_sequence(
        &self,
        sequence: Sequence,
        generation: u64,
        options: SequenceOptions,
    ) -> SequenceOutcome {
        if sequence.steps.is_empty() {
            return self.finish_sequence(&sequence, generation);
        }

        let mut index = 0;
        loop {
            // Cooperative cancellation check before each step
            let active = self.inner.active_run.load(Ordering::SeqCst);
            if active != generation {
                let phase = if active == NO_ACTIVE_RUN {
                    SequencePhase::Stopped
                } else {
                    SequencePhase::Superseded
                };
                info!("Sequence '{}' halted before step {}", sequence.name, index + 1);
                events::output::sequence(&sequence.name, phase, Some(index));
                return SequenceOutcome::Superseded;
            }

            let step = &sequence.steps[index];
            if let Some(description) = &step.description {
                info!(
                    "Step {}/{}: {}",
                    index + 1,
                    sequence.steps.len(),
                    description
                );
            }
            events::output::sequence(&sequence.name, SequencePhase::Step, Some(index));

            if let Err(e) = self.dispatch_step(step).await {
                // Per-step isolation: a failed step does not abort the run
                error!(
                    "Step {} of sequence '{}' failed: {}",
                    index + 1,
                    sequence.name,
                    e
                );
            }

            sleep(Duration::from_millis(
                step.duration_ms.unwrap_or(options.delay_ms),
            ))
            .await;

            index += 1;
            if index >= sequence.steps.len() {
                if options.loop_forever {
                    index = 0;
                } else {
                    return self.finish_sequence(&sequence, generation);
                }
            }
        }
    }

    fn finish_sequence(&self, sequence: &Sequence, generation: u64) -> SequenceOutcome {
        // Release the active slot only if this run still owns it
        let _ = self.inner.active_run.compare_exchange(
            generation,
            NO_ACTIVE_RUN,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        info!("Sequence '{}' completed", sequence.name);
        events::output::sequence(&sequence.name, SequencePhase::Completed, None);
        SequenceOutcome::Completed
    }

    async fn dispatch_step(&self, step: &Step) -> Result<()> {
        match &step.kind {
            StepKind::Pose(name) => self.execute_pose(name).await,
            StepKind::Joints(targets) => {
                for (joint, position) in targets {
                    self.safe_move(joint, *position).await?;
                }
                Ok(())
            }
            StepKind::Custom(action) => action.run().await,
        }
    }

    /// Begin a new recording window, discarding any prior capture
    pub async fn start_recording(&self) {
        self.inner.recorder.lock().await.start();
    }

    /// Record one joint-position event; a no-op unless recording is active
    pub async fn record_motion(&self, joint: &str, position: f64) {
        self.inner.recorder.lock().await.record(joint, position);
    }

    pub async fn is_recording(&self) -> bool {
        self.inner.recorder.lock().await.is_recording()
    }

    /// Close the recording window and return the captured timeline
    pub async fn stop_recording(&self) -> RecordedMotion {
        self.inner.recorder.lock().await.stop()
    }

    /// Replay the last captured recording at an adjustable rate
    ///
    /// The first entry is issued immediately; between entries the original
    /// spacing is waited out divided by `speed`; the last entry has no
    /// trailing wait. An empty recording is a no-op. Returns the number of
    /// commands issued.
    pub async fn playback(&self, speed: f64) -> Result<usize> {
        if speed <= 0.0 {
            return Err(G1Error::Config(format!(
                "Playback speed must be positive, got: {}",
                speed
            )));
        }

        let motion = self.inner.recorder.lock().await.motion();
        if motion.is_empty() {
            info!("No recorded motions to play back");
            events::output::playback(PlaybackPhase::Empty, speed, None);
            return Ok(0);
        }

        info!("Starting motion playback at {}x", speed);
        events::output::playback(PlaybackPhase::Started, speed, Some(motion.len()));
        let samples = motion.samples();
        for (index, sample) in samples.iter().enumerate() {
            self.move_joint(&sample.joint, sample.position).await?;

            if let Some(next) = samples.get(index + 1) {
                let wait_ms = (next.offset_ms - sample.offset_ms) as f64 / speed;
                sleep(Duration::from_secs_f64(wait_ms / 1000.0)).await;
            }
        }

        info!("Motion playback completed: {} commands", samples.len());
        events::output::playback(PlaybackPhase::Completed, speed, Some(samples.len()));
        Ok(samples.len())
    }

    /// Log and emit the violation for a rejected target, if any
    fn reject_unsafe(&self, joint: &str, position: f64) -> bool {
        if self.inner.safety.check(joint, position) {
            return false;
        }

        if let Some(violation) = self.inner.safety.violation(joint, position) {
            error!(
                "Safety violation: {} position {} is outside safe range [{}, {}]",
                violation.joint, violation.position, violation.min, violation.max
            );
            events::output::safety_violation(
                &violation.joint,
                violation.position,
                violation.min,
                violation.max,
            );
        }
        true
    }
}
