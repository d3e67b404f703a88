//! Trials handed to the downstream trial sink.

use serde::{Deserialize, Serialize};

use crate::parameter::GridPoint;

/// Identifies one pagination stream: a study and one of its parameter sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SuggestionKey {
    pub study_id: String,
    pub param_set_id: String,
}

impl SuggestionKey {
    pub fn new(study_id: impl Into<String>, param_set_id: impl Into<String>) -> Self {
        Self {
            study_id: study_id.into(),
            param_set_id: param_set_id.into(),
        }
    }
}

impl std::fmt::Display for SuggestionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.study_id, self.param_set_id)
    }
}

/// A grid point submitted for trial creation.
///
/// `(key, parameter_set.index)` is stable across retries, so sinks can use it
/// to deduplicate a batch that is replayed after a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRequest {
    pub key: SuggestionKey,
    pub parameter_set: GridPoint,
}

impl TrialRequest {
    pub fn idempotency_key(&self) -> String {
        format!("{}#{}", self.key, self.parameter_set.index)
    }
}

/// A trial accepted by the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    pub trial_id: String,
    pub study_id: String,
    pub parameter_set: GridPoint,
}

impl Trial {
    pub fn from_request(request: TrialRequest, trial_id: String) -> Self {
        Self {
            trial_id,
            study_id: request.key.study_id,
            parameter_set: request.parameter_set,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_key_includes_grid_index() {
        let request = TrialRequest {
            key: SuggestionKey::new("study-1", "params-a"),
            parameter_set: GridPoint {
                index: 7,
                parameters: Vec::new(),
            },
        };
        assert_eq!(request.idempotency_key(), "study-1/params-a#7");

        let trial = Trial::from_request(request, "t-1".into());
        assert_eq!(trial.study_id, "study-1");
        assert_eq!(trial.parameter_set.index, 7);
    }
}
