use evalflow_logging::FlowStage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::FlowResult;

/// The terminal state of one evaluation flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlowOutcome {
    /// All three stages succeeded
    Completed {
        result: FlowResult,
        duration_secs: f64,
    },
    /// A stage exhausted its retries; `partial` holds what earlier stages produced
    Failed {
        stage: FlowStage,
        error: String,
        partial: FlowResult,
        duration_secs: f64,
    },
}

impl FlowOutcome {
    pub fn completed(result: FlowResult, duration: Duration) -> Self {
        Self::Completed {
            result,
            duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn failed(stage: FlowStage, error: String, mut partial: FlowResult, duration: Duration) -> Self {
        partial.error = Some(error.clone());
        Self::Failed {
            stage,
            error,
            partial,
            duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn result(&self) -> &FlowResult {
        match self {
            Self::Completed { result, .. } => result,
            Self::Failed { partial, .. } => partial,
        }
    }

    /// The flow result; `error` is set only if the flow failed
    pub fn into_result(self) -> FlowResult {
        match self {
            Self::Completed { result, .. } => result,
            Self::Failed { partial, .. } => partial,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    pub fn failed_stage(&self) -> Option<FlowStage> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { stage, .. } => Some(*stage),
        }
    }

    pub fn duration_secs(&self) -> f64 {
        match self {
            Self::Completed { duration_secs, .. } => *duration_secs,
            Self::Failed { duration_secs, .. } => *duration_secs,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } => 0,
            Self::Failed { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_sets_error_on_partial() {
        let outcome = FlowOutcome::failed(
            FlowStage::ContentGeneration,
            "generation exhausted".into(),
            FlowResult::new(),
            Duration::from_secs(3),
        );

        assert!(!outcome.is_completed());
        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(outcome.failed_stage(), Some(FlowStage::ContentGeneration));
        let result = outcome.into_result();
        assert_eq!(result.error.as_deref(), Some("generation exhausted"));
    }

    #[test]
    fn test_serialized_outcome_is_tagged() {
        let outcome = FlowOutcome::completed(FlowResult::new(), Duration::from_millis(250));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["duration_secs"], 0.25);
        assert!(outcome.error().is_none());
    }
}
