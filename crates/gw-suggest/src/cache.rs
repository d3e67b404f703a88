use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gw_types::{GwResult, ParameterConfig};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::grid::{Grid, GridSpec};

/// Cache key for composed grids
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    study_id: String,
    resolutions: Vec<usize>,
}

/// Cached grid with the parameter space it was built from
#[derive(Debug, Clone)]
struct CacheEntry {
    parameters: Vec<ParameterConfig>,
    grid: Arc<Grid>,
    last_accessed: DateTime<Utc>,
}

impl CacheEntry {
    fn new(parameters: Vec<ParameterConfig>, grid: Arc<Grid>) -> Self {
        Self {
            parameters,
            grid,
            last_accessed: Utc::now(),
        }
    }

    fn access(&mut self) {
        self.last_accessed = Utc::now();
    }
}

/// In-memory cache of composed grids, keyed by study and resolutions.
///
/// A hit is only served when the study's parameter configs still equal the
/// ones the grid was built from.
#[derive(Debug)]
pub struct GridCache {
    cache: DashMap<CacheKey, RwLock<CacheEntry>>,
    max_entries: usize,
    stats: RwLock<CacheStats>,
}

impl GridCache {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            cache: DashMap::new(),
            max_entries: max_entries.max(1),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Return the grid for `parameters` under `spec`, composing it on a miss.
    pub fn get_or_build(
        &self,
        study_id: &str,
        parameters: &[ParameterConfig],
        spec: &GridSpec,
    ) -> GwResult<Arc<Grid>> {
        let key = CacheKey {
            study_id: study_id.to_string(),
            resolutions: spec.resolutions(parameters)?,
        };

        if let Some(entry_lock) = self.cache.get(&key) {
            let mut entry = entry_lock.write();
            if entry.parameters.as_slice() == parameters {
                entry.access();
                self.stats.write().hits += 1;
                return Ok(Arc::clone(&entry.grid));
            }
        }

        self.stats.write().misses += 1;

        let grid = Arc::new(Grid::build(parameters, &key.resolutions)?);
        info!(
            study_id = %study_id,
            points = grid.len(),
            resolutions = ?key.resolutions,
            "grid generated"
        );

        if !self.cache.contains_key(&key) && self.cache.len() >= self.max_entries {
            self.evict_lru();
        }
        self.cache.insert(
            key,
            RwLock::new(CacheEntry::new(parameters.to_vec(), Arc::clone(&grid))),
        );
        self.stats.write().stores += 1;

        Ok(grid)
    }

    /// Evict least recently used entries
    fn evict_lru(&self) {
        let entries_to_remove = (self.cache.len() / 10).max(1);
        let mut candidates: Vec<(CacheKey, DateTime<Utc>)> = self
            .cache
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().read().last_accessed))
            .collect();

        candidates.sort_by(|a, b| a.1.cmp(&b.1));

        for (key, _) in candidates.into_iter().take(entries_to_remove) {
            if self.cache.remove(&key).is_some() {
                debug!(study_id = %key.study_id, "evicted cached grid");
                self.stats.write().evictions += 1;
            }
        }
    }

    pub fn clear(&self) {
        self.cache.clear();
        *self.stats.write() = CacheStats::default();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn get_stats(&self) -> CacheStats {
        self.stats.read().clone()
    }
}

impl Default for GridCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}
