//! Pagination state and its flat name/value encoding.

use gw_store::SuggestionParameter;
use gw_types::{GwResult, StateError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::grid::GridSpec;

/// Reserved key holding the default resolution.
pub const DEFAULT_GRID_KEY: &str = "DefaultGrid";
/// Reserved key holding the cursor.
pub const ITERATION_KEY: &str = "Iteration";

/// Where a pagination stream stands relative to its grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationPhase {
    /// Nothing delivered yet.
    Idle,
    InProgress,
    /// Every point delivered; further calls return empty batches.
    Exhausted,
}

impl PaginationPhase {
    pub fn of(cursor: usize, total: usize) -> Self {
        if cursor >= total {
            Self::Exhausted
        } else if cursor == 0 {
            Self::Idle
        } else {
            Self::InProgress
        }
    }
}

/// Persisted progress of one `(study, parameter set)` stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionState {
    pub grid: GridSpec,
    /// Number of grid points already delivered.
    pub cursor: usize,
}

impl SuggestionState {
    pub fn new(grid: GridSpec) -> Self {
        Self { grid, cursor: 0 }
    }

    /// Decode the flat representation.
    ///
    /// Missing reserved keys fall back to a default resolution of 1 and a
    /// cursor of 0. A non-positive default resolution is reset to 1. Any value
    /// that does not parse is reported as corruption.
    pub fn decode(parameters: &[SuggestionParameter]) -> GwResult<Self> {
        let mut state = Self::default();

        for sp in parameters {
            match sp.name.as_str() {
                DEFAULT_GRID_KEY => {
                    let raw: i64 = parse(sp)?;
                    state.grid.default_resolution = if raw <= 0 {
                        warn!(value = raw, "non-positive default resolution reset to 1");
                        1
                    } else {
                        usize::try_from(raw).map_err(|_| corruption(sp))?
                    };
                }
                ITERATION_KEY => {
                    let raw: i64 = parse(sp)?;
                    state.cursor = usize::try_from(raw).map_err(|_| corruption(sp))?;
                }
                name => {
                    let resolution: i64 = parse(sp)?;
                    state.grid.overrides.insert(name.to_string(), resolution);
                }
            }
        }

        Ok(state)
    }

    /// Encode into the flat representation: both reserved keys, then every
    /// override sorted by name.
    pub fn encode(&self) -> Vec<SuggestionParameter> {
        let mut out = Vec::with_capacity(self.grid.overrides.len() + 2);
        out.push(SuggestionParameter::new(
            DEFAULT_GRID_KEY,
            self.grid.default_resolution.to_string(),
        ));
        out.push(SuggestionParameter::new(ITERATION_KEY, self.cursor.to_string()));
        out.extend(
            self.grid
                .overrides
                .iter()
                .map(|(name, resolution)| SuggestionParameter::new(name.clone(), resolution.to_string())),
        );
        out
    }

    /// The same state with the cursor moved forward by `delivered` points.
    pub fn advanced(&self, delivered: usize) -> Self {
        Self {
            grid: self.grid.clone(),
            cursor: self.cursor + delivered,
        }
    }

    pub fn phase(&self, total: usize) -> PaginationPhase {
        PaginationPhase::of(self.cursor, total)
    }
}

fn parse(sp: &SuggestionParameter) -> GwResult<i64> {
    sp.value.trim().parse::<i64>().map_err(|_| corruption(sp).into())
}

fn corruption(sp: &SuggestionParameter) -> StateError {
    StateError::Corruption {
        key: sp.name.clone(),
        value: sp.value.clone(),
    }
}
