//! Motion sequences
//!
//! A sequence is a named, ordered list of timed steps. Pose and joint steps
//! can be declared in the daemon configuration; custom steps wrap a
//! caller-supplied action and are added programmatically.

use crate::config::StepConfig;
use crate::{G1Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied action for custom sequence steps
///
/// The action is awaited to completion before the step's dwell time starts.
#[async_trait]
pub trait SequenceAction: Send + Sync {
    async fn run(&self) -> Result<()>;
}

/// What a step does when dispatched
#[derive(Clone)]
pub enum StepKind {
    /// Apply a named pose preset as a batch of joint commands
    Pose(String),
    /// Safety-checked move for each listed joint
    Joints(HashMap<String, f64>),
    /// Await a caller-supplied action
    Custom(Arc<dyn SequenceAction>),
}

impl fmt::Debug for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Pose(name) => f.debug_tuple("Pose").field(name).finish(),
            StepKind::Joints(targets) => f.debug_tuple("Joints").field(targets).finish(),
            StepKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One step of a sequence with its optional dwell time
#[derive(Debug, Clone)]
pub struct Step {
    pub kind: StepKind,
    /// Wait after this step before the next one; the run's default delay
    /// applies when unset
    pub duration_ms: Option<u64>,
    pub description: Option<String>,
}

impl Step {
    pub fn pose(name: &str) -> Self {
        Self {
            kind: StepKind::Pose(name.to_string()),
            duration_ms: None,
            description: None,
        }
    }

    pub fn joints(targets: HashMap<String, f64>) -> Self {
        Self {
            kind: StepKind::Joints(targets),
            duration_ms: None,
            description: None,
        }
    }

    pub fn custom(action: Arc<dyn SequenceAction>) -> Self {
        Self {
            kind: StepKind::Custom(action),
            duration_ms: None,
            description: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// A named ordered list of motion steps
#[derive(Debug, Clone)]
pub struct Sequence {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Sequence {
    pub fn new(name: &str, steps: Vec<Step>) -> Self {
        Self {
            name: name.to_string(),
            steps,
        }
    }

    /// Convert configured steps into a runtime sequence
    ///
    /// Each configured step must set exactly one of `pose` or `joints`.
    pub fn from_config(name: &str, steps: &[StepConfig]) -> Result<Self> {
        let mut converted = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let kind = match (&step.pose, &step.joints) {
                (Some(pose), None) => StepKind::Pose(pose.clone()),
                (None, Some(joints)) => StepKind::Joints(joints.clone()),
                (Some(_), Some(_)) => {
                    return Err(G1Error::Config(format!(
                        "Step {} of sequence '{}' sets both pose and joints",
                        index + 1,
                        name
                    )))
                }
                (None, None) => {
                    return Err(G1Error::Config(format!(
                        "Step {} of sequence '{}' sets neither pose nor joints",
                        index + 1,
                        name
                    )))
                }
            };

            converted.push(Step {
                kind,
                duration_ms: step.duration_ms,
                description: step.description.clone(),
            });
        }

        Ok(Self::new(name, converted))
    }
}

/// How a sequence run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// All steps ran and the run was still current at the end
    Completed,
    /// A newer run or an explicit stop halted the run before its next step
    Superseded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_valid_steps() {
        let steps = vec![
            StepConfig {
                description: Some("Home position".to_string()),
                pose: Some("home".to_string()),
                joints: None,
                duration_ms: Some(1000),
            },
            StepConfig {
                description: None,
                pose: None,
                joints: Some(HashMap::from([("left_elbow_pitch".to_string(), 1.57)])),
                duration_ms: Some(500),
            },
        ];

        let sequence = Sequence::from_config("greeting", &steps).unwrap();
        assert_eq!(sequence.name, "greeting");
        assert_eq!(sequence.steps.len(), 2);
        assert!(matches!(&sequence.steps[0].kind, StepKind::Pose(name) if name == "home"));
        assert_eq!(sequence.steps[0].duration_ms, Some(1000));
        assert!(matches!(&sequence.steps[1].kind, StepKind::Joints(_)));
    }

    #[test]
    fn test_from_config_rejects_ambiguous_step() {
        let steps = vec![StepConfig {
            description: None,
            pose: Some("home".to_string()),
            joints: Some(HashMap::new()),
            duration_ms: None,
        }];

        assert!(matches!(
            Sequence::from_config("bad", &steps),
            Err(G1Error::Config(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_empty_step() {
        let steps = vec![StepConfig {
            description: None,
            pose: None,
            joints: None,
            duration_ms: None,
        }];

        assert!(matches!(
            Sequence::from_config("bad", &steps),
            Err(G1Error::Config(_))
        ));
    }

    #[test]
    fn test_step_builders() {
        let step = Step::pose("wave")
            .with_duration_ms(800)
            .with_description("Wave gesture");

        assert!(matches!(&step.kind, StepKind::Pose(name) if name == "wave"));
        assert_eq!(step.duration_ms, Some(800));
        assert_eq!(step.description.as_deref(), Some("Wave gesture"));
    }
}
