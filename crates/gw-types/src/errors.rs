use thiserror::Error;

use crate::parameter::GridPoint;
use crate::trial::Trial;

/// Main error type for the Gridwalk system
#[derive(Error, Debug)]
pub enum GwError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Trial creation error: {0}")]
    TrialCreation(Box<PartialSuggestion>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GwError {
    /// Whether the error left the persisted cursor untouched and the call can
    /// be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GwError::Store(StoreError::VersionConflict { .. }) | GwError::Store(StoreError::WriteFailed { .. })
        )
    }
}

/// Persisted suggestion state could not be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("State corruption: key {key} has unparsable value {value:?}")]
    Corruption { key: String, value: String },
}

/// Failures of the external collaborators (study provider and state store).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Study not found: {study_id}")]
    StudyNotFound { study_id: String },

    #[error("Version conflict for {key}: expected {expected:?}, found {actual:?}")]
    VersionConflict {
        key: String,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("State write failed for {key}: {message}")]
    WriteFailed { key: String, message: String },
}

/// Outcome of a batch whose trial creation stopped part way.
///
/// `created` holds every trial the sink accepted, in grid order; the cursor
/// was advanced past exactly those points. `failed` is the first point the
/// sink rejected; points after it were not attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialSuggestion {
    pub created: Vec<Trial>,
    pub failed: GridPoint,
    pub not_attempted: usize,
    pub reason: String,
    /// Set when the cursor for the created prefix could not be persisted either.
    pub persist_error: Option<StoreError>,
}

impl std::fmt::Display for PartialSuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "point {} rejected after {} trials were created ({} not attempted): {}",
            self.failed.index,
            self.created.len(),
            self.not_attempted,
            self.reason
        )?;
        if let Some(err) = &self.persist_error {
            write!(f, "; cursor not persisted: {err}")?;
        }
        Ok(())
    }
}

impl From<PartialSuggestion> for GwError {
    fn from(partial: PartialSuggestion) -> Self {
        GwError::TrialCreation(Box::new(partial))
    }
}

/// Result type alias for Gridwalk operations
pub type GwResult<T> = Result<T, GwError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::GwError::Config(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::GwError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::{GridPoint, Parameter, ParameterType};

    #[test]
    fn test_error_display() {
        let error = StateError::Corruption {
            key: "DefaultGrid".to_string(),
            value: "abc".to_string(),
        };

        assert!(error.to_string().contains("State corruption"));
        assert!(error.to_string().contains("DefaultGrid"));
        assert!(error.to_string().contains("abc"));
    }

    #[test]
    fn test_error_conversion() {
        let store_error = StoreError::StudyNotFound {
            study_id: "s1".to_string(),
        };
        let gw_error: GwError = store_error.into();

        match gw_error {
            GwError::Store(StoreError::StudyNotFound { .. }) => (),
            _ => panic!("Expected Store error"),
        }
    }

    #[test]
    fn test_retryable() {
        let conflict: GwError = StoreError::VersionConflict {
            key: "s1/p1".into(),
            expected: Some(1),
            actual: Some(2),
        }
        .into();
        assert!(conflict.is_retryable());
        assert!(!config_error!("resolution {} < 1", 0).is_retryable());
    }

    #[test]
    fn test_partial_suggestion_display() {
        let failed = GridPoint {
            index: 3,
            parameters: vec![Parameter {
                name: "lr".into(),
                parameter_type: ParameterType::Real,
                value: "0.5000".into(),
            }],
        };
        let err: GwError = PartialSuggestion {
            created: Vec::new(),
            failed,
            not_attempted: 2,
            reason: "sink unavailable".into(),
            persist_error: None,
        }
        .into();

        let msg = err.to_string();
        assert!(msg.contains("point 3"));
        assert!(msg.contains("2 not attempted"));
        assert!(msg.contains("sink unavailable"));
    }

    #[test]
    fn test_macros() {
        let _config_err = config_error!("Missing required field: {}", "min");
        let _internal_err = internal_error!("Something went wrong");
    }
}
