//! Service configuration read from the environment.

use std::path::PathBuf;

use gw_types::{config_error, GwResult};
use serde::{Deserialize, Serialize};

pub const ADDR_VAR: &str = "GRIDWALK_ADDR";
pub const STUDIES_VAR: &str = "GRIDWALK_STUDIES";
pub const GRID_CACHE_VAR: &str = "GRIDWALK_GRID_CACHE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Listen address.
    pub addr: String,
    /// JSON study catalog loaded at startup.
    pub studies_path: Option<PathBuf>,
    /// Maximum number of composed grids kept in memory.
    pub grid_cache_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:6789".to_string(),
            studies_path: None,
            grid_cache_capacity: 256,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> GwResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> GwResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup(ADDR_VAR) {
            config.addr = addr;
        }
        if let Some(path) = lookup(STUDIES_VAR).filter(|p| !p.is_empty()) {
            config.studies_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(GRID_CACHE_VAR) {
            config.grid_cache_capacity = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(config_error!(
                        "{} must be a positive integer, got {:?}",
                        GRID_CACHE_VAR,
                        raw
                    ))
                }
            };
        }

        Ok(config)
    }
}
