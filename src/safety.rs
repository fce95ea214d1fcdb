//! Joint safety limits
//!
//! Validates requested joint positions against per-joint allowed ranges
//! before they reach a control process. A joint without a declared range is
//! accepted with a warning; out-of-range requests are reported as values,
//! not errors, since rejection is an expected and recoverable condition.

use std::collections::HashMap;
use tracing::warn;

/// Allowed position range for one joint, radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointRange {
    pub min: f64,
    pub max: f64,
}

/// A rejected joint target together with the range it violated
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyViolation {
    pub joint: String,
    pub position: f64,
    pub min: f64,
    pub max: f64,
}

/// Validates joint targets against configured ranges
///
/// The range map is fixed at construction and never mutated.
#[derive(Debug, Clone)]
pub struct SafetyLimiter {
    limits: HashMap<String, JointRange>,
}

impl SafetyLimiter {
    pub fn new(limits: &HashMap<String, [f64; 2]>) -> Self {
        let limits = limits
            .iter()
            .map(|(joint, range)| {
                (
                    joint.clone(),
                    JointRange {
                        min: range[0],
                        max: range[1],
                    },
                )
            })
            .collect();

        Self { limits }
    }

    /// Check whether a position is acceptable for a joint
    ///
    /// Returns true for joints without a declared range.
    pub fn check(&self, joint: &str, position: f64) -> bool {
        match self.limits.get(joint) {
            Some(range) => position >= range.min && position <= range.max,
            None => {
                warn!("No safety limits defined for joint: {}", joint);
                true
            }
        }
    }

    /// Describe the violation for a rejected target, if any
    pub fn violation(&self, joint: &str, position: f64) -> Option<SafetyViolation> {
        let range = self.limits.get(joint)?;
        if position < range.min || position > range.max {
            Some(SafetyViolation {
                joint: joint.to_string(),
                position,
                min: range.min,
                max: range.max,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> SafetyLimiter {
        let mut limits = HashMap::new();
        limits.insert("left_elbow_pitch".to_string(), [-2.09, 2.09]);
        limits.insert("waist_yaw".to_string(), [-0.79, 0.79]);
        SafetyLimiter::new(&limits)
    }

    #[test]
    fn test_check_within_range() {
        let limiter = limiter();

        assert!(limiter.check("left_elbow_pitch", 0.0));
        assert!(limiter.check("left_elbow_pitch", 1.57));
        assert!(!limiter.check("left_elbow_pitch", 2.5));
        assert!(!limiter.check("left_elbow_pitch", -2.5));
    }

    #[test]
    fn test_check_boundaries_inclusive() {
        let limiter = limiter();

        assert!(limiter.check("waist_yaw", -0.79));
        assert!(limiter.check("waist_yaw", 0.79));
        assert!(!limiter.check("waist_yaw", 0.7901));
    }

    #[test]
    fn test_undeclared_joint_is_permissive() {
        let limiter = limiter();

        assert!(limiter.check("left_wrist_roll", 100.0));
        assert!(limiter.violation("left_wrist_roll", 100.0).is_none());
    }

    #[test]
    fn test_violation_carries_range() {
        let limiter = limiter();

        let violation = limiter.violation("waist_yaw", 1.2).unwrap();
        assert_eq!(violation.joint, "waist_yaw");
        assert_eq!(violation.position, 1.2);
        assert_eq!(violation.min, -0.79);
        assert_eq!(violation.max, 0.79);

        assert!(limiter.violation("waist_yaw", 0.5).is_none());
    }
}
