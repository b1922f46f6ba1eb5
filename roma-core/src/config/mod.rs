//! Layered pipeline configuration.
//!
//! Resolution order (highest priority first):
//! 1. Environment variables (`ROMA_*`)
//! 2. Project config (`roma.toml` in the working directory)
//! 3. Compiled defaults

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SOURCE_PRIORITY;
use crate::errors::ConfigError;
use crate::types::SourceName;

/// Versioned source-priority table.
///
/// The ingestion order and all merge tie-breaks depend on this ranking, so
/// it is explicit configuration rather than an accident of iteration order.
/// Bump `version` when the ranking changes; the version is recorded with
/// run output so results stay attributable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorityTable {
    pub version: u32,
    /// Highest priority first.
    pub order: Vec<SourceName>,
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self {
            version: 1,
            order: DEFAULT_SOURCE_PRIORITY.to_vec(),
        }
    }
}

impl PriorityTable {
    /// Rank of a source, 0 = highest. Sources absent from the table sort last.
    pub fn rank(&self, source: SourceName) -> usize {
        self.order
            .iter()
            .position(|s| *s == source)
            .unwrap_or(self.order.len())
    }

    /// True when `a` strictly outranks `b`.
    pub fn outranks(&self, a: SourceName, b: SourceName) -> bool {
        self.rank(a) < self.rank(b)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.order.is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "priorities.order".to_string(),
                message: "must list at least one source".to_string(),
            });
        }
        for (i, s) in self.order.iter().enumerate() {
            if self.order[i + 1..].contains(s) {
                return Err(ConfigError::ValidationFailed {
                    field: "priorities.order".to_string(),
                    message: format!("duplicate source: {s}"),
                });
            }
        }
        Ok(())
    }
}

/// Knobs for the entity-resolution stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Spatial candidate radius in km.
    pub match_radius_km: f64,
    /// Minimum name-similarity score to accept a spatial candidate.
    pub name_threshold: f64,
    /// Grid cell size in degrees for the spatial index.
    pub grid_cell_deg: f64,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            match_radius_km: 5.0,
            name_threshold: 0.85,
            grid_cell_deg: 0.5,
        }
    }
}

/// Knobs for schema assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Maximum squared centroid distance, in degrees², for assigning a
    /// location to its nearest province.
    pub province_max_sq_deg: f64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            province_max_sq_deg: 100.0,
        }
    }
}

/// Knobs for travel-network endpoint resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Minimum name-similarity score for a fuzzy endpoint match.
    pub name_threshold: f64,
    /// Confirm fuzzy endpoint matches spatially when the edge carries
    /// endpoint coordinates.
    pub spatial_confirm_km: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name_threshold: 0.85,
            spatial_confirm_km: 25.0,
        }
    }
}

/// Top-level configuration aggregating all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RomaConfig {
    pub resolve: ResolveConfig,
    pub assembly: AssemblyConfig,
    pub network: NetworkConfig,
    pub priorities: PriorityTable,
}

impl RomaConfig {
    /// Load configuration with layered resolution: defaults, then
    /// `roma.toml` in `root` (if present), then `ROMA_*` env overrides.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join("roma.toml");
        if project_config_path.exists() {
            let content = std::fs::read_to_string(&project_config_path).map_err(|_| {
                ConfigError::FileNotFound {
                    path: project_config_path.display().to_string(),
                }
            })?;
            config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: project_config_path.display().to_string(),
                message: e.to_string(),
            })?;
        }

        Self::apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.resolve.name_threshold) {
            return Err(ConfigError::ValidationFailed {
                field: "resolve.name_threshold".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.network.name_threshold) {
            return Err(ConfigError::ValidationFailed {
                field: "network.name_threshold".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.resolve.match_radius_km <= 0.0 {
            return Err(ConfigError::ValidationFailed {
                field: "resolve.match_radius_km".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.resolve.grid_cell_deg <= 0.0 || self.resolve.grid_cell_deg > 10.0 {
            return Err(ConfigError::ValidationFailed {
                field: "resolve.grid_cell_deg".to_string(),
                message: "must be in (0, 10]".to_string(),
            });
        }
        self.priorities.validate()
    }

    /// Apply environment variable overrides.
    /// Pattern: `ROMA_MATCH_RADIUS_KM`, `ROMA_NAME_THRESHOLD`, ...
    fn apply_env_overrides(config: &mut RomaConfig) {
        if let Ok(val) = std::env::var("ROMA_MATCH_RADIUS_KM") {
            if let Ok(v) = val.parse::<f64>() {
                config.resolve.match_radius_km = v;
            }
        }
        if let Ok(val) = std::env::var("ROMA_NAME_THRESHOLD") {
            if let Ok(v) = val.parse::<f64>() {
                config.resolve.name_threshold = v;
            }
        }
        if let Ok(val) = std::env::var("ROMA_GRID_CELL_DEG") {
            if let Ok(v) = val.parse::<f64>() {
                config.resolve.grid_cell_deg = v;
            }
        }
        if let Ok(val) = std::env::var("ROMA_NETWORK_NAME_THRESHOLD") {
            if let Ok(v) = val.parse::<f64>() {
                config.network.name_threshold = v;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = RomaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.priorities.rank(SourceName::Pleiades), 0);
        assert!(config
            .priorities
            .outranks(SourceName::Pleiades, SourceName::Orbis));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = RomaConfig::from_toml(
            r#"
            [resolve]
            match_radius_km = 10.0
            "#,
        )
        .unwrap();
        assert_eq!(config.resolve.match_radius_km, 10.0);
        // Untouched fields keep compiled defaults.
        assert_eq!(config.resolve.name_threshold, 0.85);
    }

    #[test]
    fn test_threshold_range_checked() {
        let result = RomaConfig::from_toml(
            r#"
            [resolve]
            name_threshold = 1.5
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_duplicate_priority_rejected() {
        let result = RomaConfig::from_toml(
            r#"
            [priorities]
            version = 2
            order = ["pleiades", "pleiades"]
            "#,
        );
        assert!(result.is_err());
    }
}
