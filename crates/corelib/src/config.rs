//! Clustering configuration.
//!
//! Values are plain data with serde defaults, so a partial JSON document
//! (or none at all) yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::address::Address;
use crate::error::{Error, Result};
use crate::hash::HashFunction;

pub const DEFAULT_NUM_SEGMENTS: u32 = 256;
pub const DEFAULT_NUM_OWNERS: u32 = 2;

/// Capacity factor of one member. Members without an entry default to 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapacityFactor {
    pub address: Address,
    pub factor: f32,
}

/// Hash-space and replication settings, fixed for the lifetime of a cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Number of segments the hash space is split into.
    pub num_segments: u32,
    /// Replication factor per segment, primary included.
    pub num_owners: u32,
    pub hash_function: HashFunction,
    pub capacity_factors: Vec<CapacityFactor>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            num_segments: DEFAULT_NUM_SEGMENTS,
            num_owners: DEFAULT_NUM_OWNERS,
            hash_function: HashFunction::default(),
            capacity_factors: Vec::new(),
        }
    }
}

impl ClusteringConfig {
    pub fn new(num_segments: u32, num_owners: u32) -> Self {
        Self {
            num_segments,
            num_owners,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ClusteringConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_segments == 0 {
            return Err(Error::InvalidConfig("num_segments must be positive".into()));
        }
        if self.num_owners == 0 {
            return Err(Error::InvalidConfig("num_owners must be positive".into()));
        }
        if let Some(bad) = self
            .capacity_factors
            .iter()
            .find(|cf| !cf.factor.is_finite() || cf.factor < 0.0)
        {
            return Err(Error::InvalidConfig(format!(
                "capacity factor of {} must be a non-negative number, got {}",
                bad.address, bad.factor
            )));
        }
        Ok(())
    }

    pub fn capacity_factors(&self) -> HashMap<Address, f32> {
        self.capacity_factors
            .iter()
            .map(|cf| (cf.address, cf.factor))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = ClusteringConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ClusteringConfig::default());
        assert_eq!(config.num_segments, 256);
        assert_eq!(config.num_owners, 2);
    }

    #[test]
    fn test_partial_document() {
        let config = ClusteringConfig::from_json_str(
            r#"{"num_segments": 60, "hash_function": "sip_hash13",
                "capacity_factors": [{"address": 3, "factor": 0.5}]}"#,
        )
        .unwrap();
        assert_eq!(config.num_segments, 60);
        assert_eq!(config.num_owners, DEFAULT_NUM_OWNERS);
        assert_eq!(config.hash_function, HashFunction::SipHash13);
        assert_eq!(config.capacity_factors().get(&Address(3)), Some(&0.5));
    }

    #[test]
    fn test_rejects_zero_segments_and_owners() {
        assert!(matches!(
            ClusteringConfig::new(0, 2).validate(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ClusteringConfig::new(16, 0).validate(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_negative_capacity() {
        let mut config = ClusteringConfig::default();
        config.capacity_factors.push(CapacityFactor {
            address: Address(1),
            factor: -1.0,
        });
        assert!(config.validate().is_err());
    }
}
