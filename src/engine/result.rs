//! Execution result types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(rename = "stepName")]
    pub step_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "duration_ms", with = "millis")]
    pub duration: Duration,
}

impl StepResult {
    pub fn passed(step_name: impl Into<String>, duration: Duration) -> Self {
        Self {
            step_name: step_name.into(),
            success: true,
            error: None,
            duration,
        }
    }

    pub fn failed(step_name: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            step_name: step_name.into(),
            success: false,
            error: Some(error.into()),
            duration,
        }
    }
}

/// Outcome of a workflow execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub success: bool,
    /// Results of the steps that ran, in order. Steps after a failure are absent.
    pub step_results: Vec<StepResult>,
    /// Message of the failing step
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn total_duration(&self) -> Duration {
        self.step_results.iter().map(|r| r.duration).sum()
    }
}

/// Durations stored as whole milliseconds
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
