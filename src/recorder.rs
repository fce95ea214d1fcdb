//! Motion recording
//!
//! Captures a timeline of joint-position events while a recording window is
//! open. Offsets are stamped against the recording start, so the captured
//! timeline can be replayed later at an adjustable rate. Recordings live in
//! memory only; nothing is persisted across restarts.

use std::time::Instant;
use tracing::info;

/// One recorded joint-position event
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSample {
    /// Milliseconds since the recording started
    pub offset_ms: u64,
    pub joint: String,
    pub position: f64,
}

/// An immutable captured timeline of joint commands
#[derive(Debug, Clone, Default)]
pub struct RecordedMotion {
    samples: Vec<RecordedSample>,
}

impl RecordedMotion {
    pub fn samples(&self) -> &[RecordedSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Captures timestamped joint commands during a recording window
///
/// The buffer is retained after `stop` so the last recording can be replayed
/// until the next `start` clears it.
#[derive(Debug, Default)]
pub struct MotionRecorder {
    started_at: Option<Instant>,
    samples: Vec<RecordedSample>,
}

impl MotionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new recording window, discarding any prior capture
    pub fn start(&mut self) {
        self.samples.clear();
        self.started_at = Some(Instant::now());
        info!("Motion recording started");
    }

    pub fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }

    /// Record one joint-position event; a no-op unless recording is active
    pub fn record(&mut self, joint: &str, position: f64) {
        if let Some(started_at) = self.started_at {
            self.samples.push(RecordedSample {
                offset_ms: started_at.elapsed().as_millis() as u64,
                joint: joint.to_string(),
                position,
            });
        }
    }

    /// Close the recording window and return the captured timeline
    pub fn stop(&mut self) -> RecordedMotion {
        self.started_at = None;
        info!("Motion recording stopped: {} samples", self.samples.len());
        self.motion()
    }

    /// Snapshot of the captured timeline
    pub fn motion(&self) -> RecordedMotion {
        RecordedMotion {
            samples: self.samples.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_record_is_noop_while_inactive() {
        let mut recorder = MotionRecorder::new();

        recorder.record("left_elbow_pitch", 1.0);
        assert!(recorder.stop().is_empty());
    }

    #[test]
    fn test_start_clears_prior_recording() {
        let mut recorder = MotionRecorder::new();

        recorder.start();
        recorder.record("left_elbow_pitch", 1.0);
        recorder.record("left_elbow_pitch", 0.5);
        let first = recorder.stop();
        assert_eq!(first.len(), 2);

        recorder.start();
        let second = recorder.stop();
        assert!(second.is_empty());
    }

    #[test]
    fn test_offsets_are_non_decreasing() {
        let mut recorder = MotionRecorder::new();

        recorder.start();
        recorder.record("waist_yaw", 0.1);
        sleep(Duration::from_millis(20));
        recorder.record("waist_yaw", 0.2);
        let motion = recorder.stop();

        let samples = motion.samples();
        assert_eq!(samples.len(), 2);
        assert!(samples[1].offset_ms >= samples[0].offset_ms);
        assert!(samples[1].offset_ms >= 20);
        assert_eq!(samples[0].joint, "waist_yaw");
        assert_eq!(samples[1].position, 0.2);
    }

    #[test]
    fn test_buffer_retained_after_stop() {
        let mut recorder = MotionRecorder::new();

        recorder.start();
        recorder.record("waist_yaw", 0.1);
        recorder.stop();

        assert!(!recorder.is_recording());
        assert_eq!(recorder.motion().len(), 1);

        // Recording after stop is a no-op again
        recorder.record("waist_yaw", 0.3);
        assert_eq!(recorder.motion().len(), 1);
    }
}
