//! Catalog of configurable device features.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Name of the camera feature.
pub const CAMERA: &str = "camera";
/// Name of the storage feature.
pub const STORAGE: &str = "storage";

/// A catalog feature and the state every new device starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDefault {
    /// Feature name.
    pub name: String,
    /// Initial state for newly registered devices.
    pub default: bool,
}

/// The fixed set of boolean features every device carries.
///
/// Built once at startup and shared read-only. Every registered device
/// gets exactly one configuration entry per catalog feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FeatureDefault>", into = "Vec<FeatureDefault>")]
pub struct FeatureCatalog {
    entries: Vec<FeatureDefault>,
}

impl FeatureCatalog {
    /// Creates a catalog, rejecting empty, blank or duplicate names.
    pub fn new(entries: Vec<FeatureDefault>) -> CoreResult<Self> {
        if entries.is_empty() {
            return Err(CoreError::invalid_catalog("catalog has no features"));
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(CoreError::invalid_catalog("feature name is empty"));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(CoreError::invalid_catalog(format!(
                    "duplicate feature: {}",
                    entry.name
                )));
            }
        }

        Ok(Self { entries })
    }

    /// Builds a catalog from `(name, default)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, bool)>) -> CoreResult<Self> {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, default)| FeatureDefault {
                    name: name.to_string(),
                    default,
                })
                .collect(),
        )
    }

    /// Iterates over catalog entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureDefault> {
        self.entries.iter()
    }

    /// Returns the number of catalog features.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if `name` is a catalog feature.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Returns the default configuration as a name to state map.
    pub fn defaults(&self) -> BTreeMap<String, bool> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.default))
            .collect()
    }
}

impl Default for FeatureCatalog {
    fn default() -> Self {
        Self {
            entries: vec![
                FeatureDefault {
                    name: CAMERA.to_string(),
                    default: false,
                },
                FeatureDefault {
                    name: STORAGE.to_string(),
                    default: false,
                },
            ],
        }
    }
}

impl TryFrom<Vec<FeatureDefault>> for FeatureCatalog {
    type Error = CoreError;

    fn try_from(entries: Vec<FeatureDefault>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<FeatureCatalog> for Vec<FeatureDefault> {
    fn from(catalog: FeatureCatalog) -> Self {
        catalog.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog() {
        let catalog = FeatureCatalog::default();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(CAMERA));
        assert!(catalog.contains(STORAGE));
        assert!(!catalog.contains("gps"));
        assert!(catalog.defaults().values().all(|&state| !state));
    }

    #[test]
    fn rejects_bad_catalogs() {
        assert!(FeatureCatalog::new(vec![]).is_err());
        assert!(FeatureCatalog::from_pairs([("", true)]).is_err());
        assert!(FeatureCatalog::from_pairs([("camera", true), ("camera", false)]).is_err());
    }

    #[test]
    fn defaults_map() {
        let catalog = FeatureCatalog::from_pairs([("wifi", true), ("camera", false)]).unwrap();
        let defaults = catalog.defaults();
        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults["wifi"], true);
        assert_eq!(defaults["camera"], false);
    }
}
