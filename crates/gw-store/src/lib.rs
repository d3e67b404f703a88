//! # gw-store
//!
//! External collaborators of the grid suggestion service: the study
//! configuration provider, the pagination state store and the trial sink,
//! each with an in-memory implementation.

pub mod provider;
pub mod sink;
pub mod state;

pub use provider::{MemoryStudyProvider, ParameterSpaceProvider};
pub use sink::{MemoryTrialSink, TrialSink};
pub use state::{MemoryStateStore, StateStore, StoreStats, StoredState, SuggestionParameter};
