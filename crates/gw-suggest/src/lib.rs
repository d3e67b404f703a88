//! # gw-suggest
//!
//! Grid search suggestions for hyperparameter tuning.
//!
//! Discretizes each parameter's feasible space at a requested resolution,
//! composes the ordered cartesian product, and pages through it across
//! repeated calls using a persisted cursor.

pub mod cache;
pub mod config;
pub mod discretize;
pub mod grid;
pub mod server;
pub mod service;
pub mod state;

pub use cache::{CacheStats, GridCache};
pub use config::ServiceConfig;
pub use discretize::{discretize, discretize_categorical, discretize_integer, discretize_real};
pub use grid::{Axis, Grid, GridSpec};
pub use server::{handle_line, serve, ServiceRequest, ServiceResponse};
pub use service::{
    next_batch, GetSuggestionsReply, GetSuggestionsRequest, GridSuggestService, SuggestionProgress,
};
pub use state::{PaginationPhase, SuggestionState, DEFAULT_GRID_KEY, ITERATION_KEY};
