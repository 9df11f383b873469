//! Estimation settings file support.
//!
//! Settings are read from a TOML file. Builder sections (`rt`, `gp`, `obs`,
//! `sampler`) are kept as raw override tables and resolved against each
//! builder's defaults at estimation time; the remaining sections are typed
//! here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml::Table;

use crate::core::errors::{EstimationError, EstimationResult};
use crate::models::delays::DelayRecord;

/// Settings for one estimation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimationSettings {
    #[serde(default)]
    pub cleaning: CleaningSettings,
    #[serde(default = "default_generation_time")]
    pub generation_time: DelayRecord,
    #[serde(default)]
    pub delays: Vec<DelayRecord>,
    #[serde(default)]
    pub rt: FeatureSettings,
    #[serde(default)]
    pub gp: FeatureSettings,
    #[serde(default)]
    pub obs: Table,
    #[serde(default)]
    pub sampler: Table,
    #[serde(default)]
    pub orchestration: OrchestrationSettings,
    #[serde(default)]
    pub summary: SummarySettings,
}

/// A model feature given as `true`/`false` or as a table of overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureSettings {
    Toggle(bool),
    Overrides(Table),
}

impl Default for FeatureSettings {
    fn default() -> Self {
        FeatureSettings::Toggle(true)
    }
}

impl FeatureSettings {
    /// Overrides to resolve, or `None` when the feature is switched off.
    pub fn overrides(&self) -> Option<Table> {
        match self {
            FeatureSettings::Toggle(false) => None,
            FeatureSettings::Toggle(true) => Some(Table::new()),
            FeatureSettings::Overrides(table) => Some(table.clone()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, FeatureSettings::Toggle(false))
    }
}

/// Case-series cleaning settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleaningSettings {
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    /// Trailing 7-day mean above which a zero count is imputed
    #[serde(default)]
    pub zero_threshold: Option<f64>,
    #[serde(default = "default_true")]
    pub filter_leading_zeros: bool,
}

impl Default for CleaningSettings {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            zero_threshold: None,
            filter_leading_zeros: default_true(),
        }
    }
}

/// Cross-region scheduling settings.
///
/// The per-region wall-clock limit lives with the sampler settings
/// (`max_execution_time`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestrationSettings {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Posterior summary settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummarySettings {
    #[serde(default = "default_credible_intervals")]
    pub credible_intervals: Vec<f64>,
    #[serde(default = "default_ranking_window")]
    pub ranking_window: usize,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            credible_intervals: default_credible_intervals(),
            ranking_window: default_ranking_window(),
        }
    }
}

fn default_horizon() -> usize {
    7
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    1
}

fn default_credible_intervals() -> Vec<f64> {
    vec![0.2, 0.5, 0.9]
}

fn default_ranking_window() -> usize {
    7
}

fn default_generation_time() -> DelayRecord {
    DelayRecord::new(3.64, 0.71, 3.08, 0.77, 30)
}

impl Default for EstimationSettings {
    fn default() -> Self {
        Self {
            cleaning: CleaningSettings::default(),
            generation_time: default_generation_time(),
            delays: Vec::new(),
            rt: FeatureSettings::default(),
            gp: FeatureSettings::default(),
            obs: Table::new(),
            sampler: Table::new(),
            orchestration: OrchestrationSettings::default(),
            summary: SummarySettings::default(),
        }
    }
}

impl EstimationSettings {
    /// Parse settings from TOML text.
    ///
    /// # Returns
    /// * `Ok(EstimationSettings)` if the text parses and validates
    /// * `Err(EstimationError::Configuration)` naming the offending key otherwise
    pub fn from_toml_str(content: &str) -> EstimationResult<Self> {
        let settings: EstimationSettings =
            serde_path_to_error::deserialize(toml::Deserializer::new(content))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the settings file
    pub fn from_file<P: AsRef<Path>>(path: P) -> EstimationResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            EstimationError::config(format!(
                "Failed to read settings file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load settings from the default location.
    ///
    /// Searches for `estimation.toml` in:
    /// 1. Current directory
    /// 2. `rust_backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> EstimationResult<Self> {
        let search_paths = vec![
            PathBuf::from("estimation.toml"),
            PathBuf::from("rust_backend/estimation.toml"),
            PathBuf::from("../estimation.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(EstimationError::config(
            "No estimation.toml found in standard locations",
        ))
    }

    fn validate(&self) -> EstimationResult<()> {
        if let Some(threshold) = self.cleaning.zero_threshold {
            if threshold.is_nan() || threshold < 0.0 {
                return Err(EstimationError::config(format!(
                    "zero_threshold must be non-negative; got {}",
                    threshold
                )));
            }
        }
        if self.orchestration.concurrency == 0 {
            return Err(EstimationError::config("concurrency must be at least 1"));
        }
        if self.summary.credible_intervals.is_empty() {
            return Err(EstimationError::config(
                "at least one credible interval level is required",
            ));
        }
        for level in &self.summary.credible_intervals {
            if !(*level > 0.0 && *level < 1.0) {
                return Err(EstimationError::config(format!(
                    "credible interval levels must lie in (0, 1); got {}",
                    level
                )));
            }
        }
        if self.summary.ranking_window == 0 {
            return Err(EstimationError::config("ranking_window must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
gp = false

[cleaning]
horizon = 14
zero_threshold = 50.0

[generation_time]
mean = 3.6
mean_sd = 0.7
sd = 3.1
sd_sd = 0.8
max = 30

[[delays]]
mean = 1.6
mean_sd = 0.06
sd = 0.42
sd_sd = 0.06
max = 15

[[delays]]
mean = 1.0
mean_sd = 0.1
sd = 0.5
sd_sd = 0.1
max = 10

[rt]
prior = { mean = 2.0, sd = 0.2 }
future_policy = "estimate"

[obs]
family = "poisson"

[sampler]
samples = 1000
chains = 2
max_execution_time = 600

[orchestration]
concurrency = 4

[summary]
credible_intervals = [0.5, 0.9]
"#;

    #[test]
    fn test_defaults_from_empty_file() {
        let settings = EstimationSettings::from_toml_str("").unwrap();
        assert_eq!(settings, EstimationSettings::default());
        assert_eq!(settings.cleaning.horizon, 7);
        assert!(settings.rt.is_enabled());
        assert_eq!(settings.rt.overrides(), Some(Table::new()));
    }

    #[test]
    fn test_full_file() {
        let settings = EstimationSettings::from_toml_str(FULL).unwrap();
        assert_eq!(settings.cleaning.horizon, 14);
        assert_eq!(settings.cleaning.zero_threshold, Some(50.0));
        assert_eq!(settings.delays.len(), 2);
        assert_eq!(settings.delays[1].max, 10);
        assert!(!settings.gp.is_enabled());
        assert_eq!(settings.gp.overrides(), None);

        let rt = settings.rt.overrides().unwrap();
        assert_eq!(rt["future_policy"].as_str(), Some("estimate"));
        assert_eq!(settings.sampler["chains"].as_integer(), Some(2));
        assert_eq!(settings.orchestration.concurrency, 4);
        assert_eq!(settings.summary.credible_intervals, vec![0.5, 0.9]);
        assert_eq!(settings.summary.ranking_window, 7);
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = EstimationSettings::from_toml_str("[plotting]\nwidth = 3").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_error_names_offending_key() {
        let err = EstimationSettings::from_toml_str("[cleaning]\nhorizon = 'soon'").unwrap_err();
        assert!(err.to_string().contains("cleaning.horizon"), "{}", err);
    }

    #[test]
    fn test_invalid_levels_rejected() {
        let err =
            EstimationSettings::from_toml_str("[summary]\ncredible_intervals = [1.5]").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let settings = EstimationSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.delays.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = EstimationSettings::from_file("/nonexistent/estimation.toml").unwrap_err();
        assert!(err.is_configuration());
    }
}
