//! Reporting model: count family, weekly reporting pattern and the optional
//! fraction of infections that end up observed.

use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::config::resolver::resolve_into;
use crate::core::errors::{EstimationError, EstimationResult};

/// Count distribution of reported cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Poisson,
    Negbin,
}

impl Family {
    pub fn code(self) -> u8 {
        match self {
            Family::Poisson => 0,
            Family::Negbin => 1,
        }
    }
}

/// Prior on the observed fraction; both fields or neither.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScaleSpec {
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub sd: Option<f64>,
}

impl ScaleSpec {
    /// `Some((mean, sd))` when scaling is active.
    pub fn pair(&self) -> EstimationResult<Option<(f64, f64)>> {
        match (self.mean, self.sd) {
            (None, None) => Ok(None),
            (Some(mean), Some(sd)) => Ok(Some((mean, sd))),
            _ => Err(EstimationError::config("incomplete scale specification")),
        }
    }
}

/// Resolved observation-model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservationConfig {
    pub family: Family,
    pub weight: f64,
    pub week_effect: bool,
    pub scale: ScaleSpec,
    pub week_length: usize,
}

impl ObservationConfig {
    pub fn defaults() -> Table {
        let mut table = Table::new();
        table.insert("family".into(), Value::String("negbin".into()));
        table.insert("weight".into(), Value::Float(1.0));
        table.insert("week_effect".into(), Value::Boolean(true));
        table.insert("scale".into(), Value::Table(Table::new()));
        table.insert("week_length".into(), Value::Integer(7));
        table
    }

    pub fn resolve(overrides: &Table) -> EstimationResult<Self> {
        let config: ObservationConfig = resolve_into(&Self::defaults(), overrides)?;

        if config.weight < 0.0 || !config.weight.is_finite() {
            return Err(EstimationError::config(format!(
                "observation weight must be non-negative; got {}",
                config.weight
            )));
        }
        if config.week_length == 0 {
            return Err(EstimationError::config("week_length must be at least 1"));
        }
        if let Some((mean, sd)) = config.scale.pair()? {
            if mean <= 0.0 || !mean.is_finite() {
                return Err(EstimationError::config(format!(
                    "observation scale mean must be positive; got {}",
                    mean
                )));
            }
            if sd < 0.0 || !sd.is_finite() {
                return Err(EstimationError::config(format!(
                    "observation scale sd must be non-negative; got {}",
                    sd
                )));
            }
        }
        Ok(config)
    }
}

/// Numeric observation fields of the model payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationData {
    #[serde(rename = "model_type")]
    pub family_code: u8,
    #[serde(with = "super::flag")]
    pub week_effect: bool,
    pub week_length: usize,
    #[serde(rename = "obs_weight")]
    pub weight: f64,
    #[serde(with = "super::flag")]
    pub obs_scale: bool,
    pub obs_scale_mean: f64,
    pub obs_scale_sd: f64,
}

impl ObservationData {
    pub fn is_negbin(&self) -> bool {
        self.family_code == Family::Negbin.code()
    }
}

/// Resolve overrides and build the observation payload fields.
pub fn build_observation_data(overrides: &Table) -> EstimationResult<ObservationData> {
    let config = ObservationConfig::resolve(overrides)?;
    let scale = config.scale.pair()?;

    Ok(ObservationData {
        family_code: config.family.code(),
        week_effect: config.week_effect,
        week_length: config.week_length,
        weight: config.weight,
        obs_scale: scale.is_some(),
        obs_scale_mean: scale.map(|(mean, _)| mean).unwrap_or(0.0),
        obs_scale_sd: scale.map(|(_, sd)| sd).unwrap_or(0.0),
    })
}
