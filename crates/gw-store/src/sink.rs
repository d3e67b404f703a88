use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use gw_types::{internal_error, GwResult, Trial, TrialRequest};
use parking_lot::RwLock;
use uuid::Uuid;

/// Downstream consumer that turns grid points into trials.
#[async_trait]
pub trait TrialSink: Send + Sync {
    /// Create a trial for `request`, returning its assigned identifier.
    async fn create(&self, request: &TrialRequest) -> GwResult<String>;
}

/// In-memory trial registry.
///
/// Creation is idempotent on [`TrialRequest::idempotency_key`]: replaying a
/// request returns the identifier assigned the first time.
#[derive(Debug, Default)]
pub struct MemoryTrialSink {
    ids: DashMap<String, String>,
    trials: RwLock<Vec<Trial>>,
    fail_on: RwLock<HashSet<usize>>,
}

impl MemoryTrialSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject requests for the grid point at `index` until cleared.
    pub fn fail_on_index(&self, index: usize) {
        self.fail_on.write().insert(index);
    }

    pub fn clear_failures(&self) {
        self.fail_on.write().clear();
    }

    /// All distinct trials created so far, in creation order.
    pub fn trials(&self) -> Vec<Trial> {
        self.trials.read().clone()
    }

    pub fn len(&self) -> usize {
        self.trials.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.read().is_empty()
    }
}

#[async_trait]
impl TrialSink for MemoryTrialSink {
    async fn create(&self, request: &TrialRequest) -> GwResult<String> {
        if self.fail_on.read().contains(&request.parameter_set.index) {
            return Err(internal_error!(
                "trial creation rejected for point {}",
                request.parameter_set.index
            ));
        }

        let key = request.idempotency_key();
        let mut created = None;
        let trial_id = self
            .ids
            .entry(key)
            .or_insert_with(|| {
                let id = Uuid::new_v4().to_string();
                created = Some(id.clone());
                id
            })
            .value()
            .clone();

        if let Some(id) = created {
            tracing::debug!(trial_id = %id, index = request.parameter_set.index, "trial created");
            self.trials
                .write()
                .push(Trial::from_request(request.clone(), id));
        }

        Ok(trial_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_types::{GridPoint, GwError, SuggestionKey};

    fn request(index: usize) -> TrialRequest {
        TrialRequest {
            key: SuggestionKey::new("s1", "p1"),
            parameter_set: GridPoint {
                index,
                parameters: Vec::new(),
            },
        }
    }

    #[tokio::test]
    async fn test_create_assigns_distinct_ids() {
        let sink = MemoryTrialSink::new();
        let a = sink.create(&request(0)).await.unwrap();
        let b = sink.create(&request(1)).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_replay_returns_same_id() {
        let sink = MemoryTrialSink::new();
        let first = sink.create(&request(3)).await.unwrap();
        let again = sink.create(&request(3)).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.trials()[0].trial_id, first);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let sink = MemoryTrialSink::new();
        sink.fail_on_index(2);
        let err = sink.create(&request(2)).await.unwrap_err();
        assert!(matches!(err, GwError::Internal(_)));
        assert!(sink.is_empty());

        sink.clear_failures();
        assert!(sink.create(&request(2)).await.is_ok());
    }
}
