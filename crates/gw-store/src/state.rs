use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gw_types::{GwResult, StoreError, SuggestionKey};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One flat name/value pair of persisted suggestion state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionParameter {
    pub name: String,
    pub value: String,
}

impl SuggestionParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// State record as read back from a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    pub parameters: Vec<SuggestionParameter>,
    /// Monotonic write counter, used for compare-and-swap.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Keyed store for pagination state.
///
/// `put` is a compare-and-swap: it succeeds only if the stored version still
/// equals `expected_version` (`None` meaning "no record yet"), and returns the
/// new version. This is what serializes concurrent callers on the same key.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &SuggestionKey) -> GwResult<Option<StoredState>>;

    async fn put(
        &self,
        key: &SuggestionKey,
        parameters: Vec<SuggestionParameter>,
        expected_version: Option<u64>,
    ) -> GwResult<u64>;
}

/// In-memory state store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: DashMap<SuggestionKey, StoredState>,
    fail_writes: AtomicBool,
    stats: RwLock<StoreStats>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail with `WriteFailed`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current record for `key`, bypassing the async interface.
    pub fn snapshot(&self, key: &SuggestionKey) -> Option<StoredState> {
        self.states.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get_stats(&self) -> StoreStats {
        self.stats.read().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &SuggestionKey) -> GwResult<Option<StoredState>> {
        self.stats.write().reads += 1;
        Ok(self.snapshot(key))
    }

    async fn put(
        &self,
        key: &SuggestionKey,
        parameters: Vec<SuggestionParameter>,
        expected_version: Option<u64>,
    ) -> GwResult<u64> {
        if self.fail_writes.load(Ordering::SeqCst) {
            self.stats.write().failed_writes += 1;
            return Err(StoreError::WriteFailed {
                key: key.to_string(),
                message: "writes disabled".to_string(),
            }
            .into());
        }

        // The entry guard holds the shard lock, so check and write are atomic.
        let version = match self.states.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get().version;
                if expected_version != Some(current) {
                    self.stats.write().conflicts += 1;
                    return Err(StoreError::VersionConflict {
                        key: key.to_string(),
                        expected: expected_version,
                        actual: Some(current),
                    }
                    .into());
                }
                let next = current + 1;
                occupied.insert(StoredState {
                    parameters,
                    version: next,
                    updated_at: Utc::now(),
                });
                next
            }
            Entry::Vacant(vacant) => {
                if expected_version.is_some() {
                    self.stats.write().conflicts += 1;
                    return Err(StoreError::VersionConflict {
                        key: key.to_string(),
                        expected: expected_version,
                        actual: None,
                    }
                    .into());
                }
                vacant.insert(StoredState {
                    parameters,
                    version: 1,
                    updated_at: Utc::now(),
                });
                1
            }
        };

        self.stats.write().writes += 1;
        Ok(version)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub writes: u64,
    pub conflicts: u64,
    pub failed_writes: u64,
}
