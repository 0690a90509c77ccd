use super::traits::ConfigSection;
use crate::error::GridmorphError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Entries held by the program cache before LRU eviction.
    pub cache_capacity: usize,
    /// Seconds a cache entry stays valid after insertion.
    pub cache_ttl_secs: u64,
    /// Entries held by the strategy bank before LRU eviction.
    pub bank_capacity: usize,
    /// Classifier confidence required before bank programs seed a
    /// population.
    pub seed_threshold: f64,
    /// Programs retrieved from the bank per seeded task.
    pub seed_count: usize,
    /// Training fitness a program must reach to be stored in the bank.
    pub bank_store_min_rate: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 50_000,
            cache_ttl_secs: 300,
            bank_capacity: 256,
            seed_threshold: 0.7,
            seed_count: 3,
            bank_store_min_rate: 0.7,
        }
    }
}

impl ConfigSection for MemoryConfig {
    fn section_name() -> &'static str {
        "memory"
    }

    fn validate(&self) -> Result<(), GridmorphError> {
        if self.cache_ttl_secs == 0 {
            return Err(GridmorphError::Configuration(
                "Cache TTL must be at least one second".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.seed_threshold) {
            return Err(GridmorphError::Configuration(
                "Seed threshold must be between 0 and 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.bank_store_min_rate) {
            return Err(GridmorphError::Configuration(
                "Bank store rate must be between 0 and 1".to_string(),
            ));
        }
        if self.seed_count == 0 {
            return Err(GridmorphError::Configuration(
                "Seed count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
