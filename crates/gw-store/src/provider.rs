use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use gw_types::{GwResult, StoreError, StudyConfig};

/// Source of study configurations (the ordered parameter space).
#[async_trait]
pub trait ParameterSpaceProvider: Send + Sync {
    /// Fetch the configuration of `study_id`.
    async fn get_study(&self, study_id: &str) -> GwResult<StudyConfig>;
}

/// Study catalog held in memory, optionally seeded from a JSON file.
#[derive(Debug, Default)]
pub struct MemoryStudyProvider {
    studies: DashMap<String, StudyConfig>,
}

impl MemoryStudyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog file shaped as `{"<study id>": StudyConfig, ...}`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> GwResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let catalog: HashMap<String, StudyConfig> = serde_json::from_str(&raw)?;

        tracing::info!("Loaded {} studies from {}", catalog.len(), path.display());

        let provider = Self::new();
        for (study_id, config) in catalog {
            provider.insert(study_id, config);
        }
        Ok(provider)
    }

    pub fn insert(&self, study_id: impl Into<String>, config: StudyConfig) {
        self.studies.insert(study_id.into(), config);
    }

    pub fn len(&self) -> usize {
        self.studies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.studies.is_empty()
    }
}

#[async_trait]
impl ParameterSpaceProvider for MemoryStudyProvider {
    async fn get_study(&self, study_id: &str) -> GwResult<StudyConfig> {
        self.studies
            .get(study_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                StoreError::StudyNotFound {
                    study_id: study_id.to_string(),
                }
                .into()
            })
    }
}
