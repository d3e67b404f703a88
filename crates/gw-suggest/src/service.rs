//! Pagination over a study's grid across repeated, independent calls.
//!
//! Each call reads the persisted [`SuggestionState`], derives the grid from
//! the study configuration, creates trials for the next batch and then moves
//! the cursor with a compare-and-swap write. The cursor only ever moves past
//! points that the trial sink accepted.

use std::ops::Range;
use std::sync::Arc;

use gw_store::{ParameterSpaceProvider, StateStore, SuggestionParameter, TrialSink};
use gw_types::{
    GwError, GwResult, PartialSuggestion, StoreError, SuggestionKey, Trial, TrialRequest,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::GridCache;
use crate::grid::Grid;
use crate::state::{PaginationPhase, SuggestionState, ITERATION_KEY};

/// Request for the next batch of a pagination stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSuggestionsRequest {
    pub study_id: String,
    pub param_set_id: String,
    /// Number of points wanted; 0 means the rest of the grid.
    #[serde(default)]
    pub request_number: usize,
}

impl GetSuggestionsRequest {
    pub fn new(study_id: impl Into<String>, param_set_id: impl Into<String>, request_number: usize) -> Self {
        Self {
            study_id: study_id.into(),
            param_set_id: param_set_id.into(),
            request_number,
        }
    }

    pub fn key(&self) -> SuggestionKey {
        SuggestionKey::new(self.study_id.clone(), self.param_set_id.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSuggestionsReply {
    pub trials: Vec<Trial>,
}

/// Read-only view of a stream's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionProgress {
    pub cursor: usize,
    pub total: usize,
    pub phase: PaginationPhase,
}

/// Range of grid indices to deliver next.
///
/// `requested == 0` asks for the remainder. The range is empty once the
/// cursor has reached (or passed) the end of the grid.
pub fn next_batch(cursor: usize, total: usize, requested: usize) -> Range<usize> {
    let remaining = total.saturating_sub(cursor);
    let size = if requested == 0 {
        remaining
    } else {
        requested.min(remaining)
    };
    if size == 0 {
        return cursor..cursor;
    }
    cursor..cursor + size
}

/// Grid suggestion service. Generic over its collaborators so callers can
/// plug in in-memory implementations or real backends.
pub struct GridSuggestService<P, S, T>
where
    P: ParameterSpaceProvider,
    S: StateStore,
    T: TrialSink,
{
    provider: P,
    store: S,
    sink: T,
    cache: GridCache,
}

impl<P, S, T> GridSuggestService<P, S, T>
where
    P: ParameterSpaceProvider,
    S: StateStore,
    T: TrialSink,
{
    pub fn new(provider: P, store: S, sink: T) -> Self {
        Self::with_cache(provider, store, sink, GridCache::new())
    }

    pub fn with_cache(provider: P, store: S, sink: T, cache: GridCache) -> Self {
        Self {
            provider,
            store,
            sink,
            cache,
        }
    }

    /// Deliver the next batch of grid points as trials.
    pub async fn get_suggestions(&self, request: &GetSuggestionsRequest) -> GwResult<GetSuggestionsReply> {
        let key = request.key();
        let (state, version) = self.load_state(&key).await?;
        let grid = self.grid_for(&key, &state).await?;

        info!(
            study_id = %key.study_id,
            param_set_id = %key.param_set_id,
            cursor = state.cursor,
            default_resolution = state.grid.default_resolution,
            overrides = ?state.grid.overrides,
            "get suggestions"
        );

        let batch = next_batch(state.cursor, grid.len(), request.request_number);
        if batch.is_empty() {
            debug!(
                study_id = %key.study_id,
                param_set_id = %key.param_set_id,
                total = grid.len(),
                "grid exhausted"
            );
            return Ok(GetSuggestionsReply::default());
        }

        let mut trials = Vec::new();
        let mut rejected = None;
        for point in grid.points(batch.clone()) {
            let trial_request = TrialRequest {
                key: key.clone(),
                parameter_set: point,
            };
            match self.sink.create(&trial_request).await {
                Ok(trial_id) => trials.push(Trial::from_request(trial_request, trial_id)),
                Err(e) => {
                    warn!(
                        study_id = %key.study_id,
                        index = trial_request.parameter_set.index,
                        error = %e,
                        "trial creation failed"
                    );
                    rejected = Some((trial_request.parameter_set, e));
                    break;
                }
            }
        }

        let persisted = if trials.is_empty() {
            Ok(())
        } else {
            self.persist(&key, &state.advanced(trials.len()), version)
                .await
        };

        match rejected {
            None => {
                persisted?;
                info!(
                    study_id = %key.study_id,
                    param_set_id = %key.param_set_id,
                    delivered = trials.len(),
                    cursor = state.cursor + trials.len(),
                    total = grid.len(),
                    "suggestions delivered"
                );
                Ok(GetSuggestionsReply { trials })
            }
            Some((failed, cause)) => {
                let not_attempted = batch.len() - trials.len() - 1;
                let persist_error = persisted.err().map(|e| match e {
                    GwError::Store(store_error) => store_error,
                    other => StoreError::WriteFailed {
                        key: key.to_string(),
                        message: other.to_string(),
                    },
                });
                Err(PartialSuggestion {
                    created: trials,
                    failed,
                    not_attempted,
                    reason: cause.to_string(),
                    persist_error,
                }
                .into())
            }
        }
    }

    /// Replace the stream's grid settings, keeping its cursor.
    ///
    /// The parameters are decoded before anything is written, so corrupt input
    /// never reaches the store.
    pub async fn set_suggestion_parameters(
        &self,
        key: &SuggestionKey,
        parameters: Vec<SuggestionParameter>,
    ) -> GwResult<SuggestionState> {
        let requested = SuggestionState::decode(&parameters)?;
        let stored = self.store.get(key).await?;
        let version = stored.as_ref().map(|s| s.version);

        // An explicit cursor wins; otherwise keep the stored one. Supplying
        // the cursor is also how a corrupt record gets repaired.
        let has_cursor = parameters.iter().any(|sp| sp.name == ITERATION_KEY);
        let cursor = match (&stored, has_cursor) {
            (_, true) => requested.cursor,
            (Some(stored), false) => SuggestionState::decode(&stored.parameters)?.cursor,
            (None, false) => 0,
        };
        let next = SuggestionState {
            grid: requested.grid,
            cursor,
        };

        self.persist(key, &next, version).await?;
        info!(
            study_id = %key.study_id,
            param_set_id = %key.param_set_id,
            default_resolution = next.grid.default_resolution,
            cursor = next.cursor,
            "suggestion parameters updated"
        );
        Ok(next)
    }

    /// Current position of a stream, without side effects.
    pub async fn progress(&self, key: &SuggestionKey) -> GwResult<SuggestionProgress> {
        let (state, _) = self.load_state(key).await?;
        let grid = self.grid_for(key, &state).await?;
        Ok(SuggestionProgress {
            cursor: state.cursor,
            total: grid.len(),
            phase: state.phase(grid.len()),
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &T {
        &self.sink
    }

    pub fn cache(&self) -> &GridCache {
        &self.cache
    }

    async fn load_state(&self, key: &SuggestionKey) -> GwResult<(SuggestionState, Option<u64>)> {
        match self.store.get(key).await? {
            Some(stored) => Ok((SuggestionState::decode(&stored.parameters)?, Some(stored.version))),
            None => Ok((SuggestionState::default(), None)),
        }
    }

    async fn grid_for(&self, key: &SuggestionKey, state: &SuggestionState) -> GwResult<Arc<Grid>> {
        let study = self.provider.get_study(&key.study_id).await?;
        study.validate()?;
        self.cache
            .get_or_build(&key.study_id, &study.parameter_configs, &state.grid)
    }

    async fn persist(&self, key: &SuggestionKey, state: &SuggestionState, version: Option<u64>) -> GwResult<()> {
        match self.store.put(key, state.encode(), version).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(
                    study_id = %key.study_id,
                    param_set_id = %key.param_set_id,
                    error = %e,
                    "saving suggestion state failed"
                );
                Err(e)
            }
        }
    }
}
