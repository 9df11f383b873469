//! Reproduction-number policy.
//!
//! Resolves the user's Rt settings (prior, random walk, breakpoints and the
//! rule for Rt beyond the last fully observed day) into the numeric fields
//! the model consumes.

use log::debug;
use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::config::resolver::resolve_into;
use crate::core::errors::{EstimationError, EstimationResult};

/// Natural-scale prior on a positive quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Prior {
    pub mean: f64,
    pub sd: f64,
}

impl Prior {
    pub fn new(mean: f64, sd: f64) -> Self {
        Self { mean, sd }
    }
}

/// How Rt evolves past the last fully informed estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FuturePolicyRepr", into = "FuturePolicyRepr")]
pub enum FuturePolicy {
    /// Rt keeps evolving according to the model
    Project,
    /// Rt is held at the last estimate
    Latest,
    /// Rt is held at the estimate one mean delay before the horizon
    Estimate,
    /// Rt is held at a fixed offset from the end of the data
    Offset(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum FuturePolicyRepr {
    Offset(i64),
    Named(String),
}

impl TryFrom<FuturePolicyRepr> for FuturePolicy {
    type Error = String;

    fn try_from(repr: FuturePolicyRepr) -> Result<Self, Self::Error> {
        match repr {
            FuturePolicyRepr::Offset(k) => Ok(FuturePolicy::Offset(k)),
            FuturePolicyRepr::Named(name) => match name.as_str() {
                "project" => Ok(FuturePolicy::Project),
                "latest" => Ok(FuturePolicy::Latest),
                "estimate" => Ok(FuturePolicy::Estimate),
                other => Err(format!(
                    "unknown future policy '{}'. Use 'project', 'latest', 'estimate' or an integer",
                    other
                )),
            },
        }
    }
}

impl From<FuturePolicy> for FuturePolicyRepr {
    fn from(policy: FuturePolicy) -> Self {
        match policy {
            FuturePolicy::Project => FuturePolicyRepr::Named("project".to_string()),
            FuturePolicy::Latest => FuturePolicyRepr::Named("latest".to_string()),
            FuturePolicy::Estimate => FuturePolicyRepr::Named("estimate".to_string()),
            FuturePolicy::Offset(k) => FuturePolicyRepr::Offset(k),
        }
    }
}

/// Resolved future rule: whether Rt is fixed and from which offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FutureRt {
    pub fixed: bool,
    pub from: i64,
}

impl FuturePolicy {
    /// Resolve to `(fixed, offset)`; `mean_delay` is used by
    /// [`FuturePolicy::Estimate`].
    pub fn resolve(self, mean_delay: usize) -> FutureRt {
        match self {
            FuturePolicy::Project => FutureRt { fixed: false, from: 0 },
            FuturePolicy::Latest => FutureRt { fixed: true, from: 0 },
            FuturePolicy::Estimate => FutureRt {
                fixed: true,
                from: -(mean_delay as i64),
            },
            FuturePolicy::Offset(k) => FutureRt { fixed: true, from: k },
        }
    }
}

/// What the Gaussian process perturbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpOn {
    /// Deviations accumulate on the previous Rt
    #[serde(rename = "R_t-1")]
    PreviousRt,
    /// Deviations are taken around the initial R0 (stationary)
    #[serde(rename = "R0")]
    InitialR,
}

/// Reproduction-number settings after default resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RtConfig {
    pub prior: Prior,
    pub use_rt: bool,
    pub random_walk_step: u32,
    pub use_breakpoints: bool,
    pub future_policy: FuturePolicy,
    pub gp_on: GpOn,
    pub pop: f64,
}

impl RtConfig {
    /// Defaults table merged under user overrides.
    pub fn defaults() -> Table {
        let mut prior = Table::new();
        prior.insert("mean".into(), Value::Float(1.0));
        prior.insert("sd".into(), Value::Float(1.0));

        let mut table = Table::new();
        table.insert("prior".into(), Value::Table(prior));
        table.insert("use_rt".into(), Value::Boolean(true));
        table.insert("random_walk_step".into(), Value::Integer(0));
        table.insert("use_breakpoints".into(), Value::Boolean(true));
        table.insert("future_policy".into(), Value::String("latest".into()));
        table.insert("gp_on".into(), Value::String("R_t-1".into()));
        table.insert("pop".into(), Value::Float(0.0));
        table
    }

    /// Resolve user overrides against [`RtConfig::defaults`] and validate.
    pub fn resolve(overrides: &Table) -> EstimationResult<Self> {
        let mut config: RtConfig = resolve_into(&Self::defaults(), overrides)?;

        if !(config.prior.mean > 0.0 && config.prior.mean.is_finite()) {
            return Err(EstimationError::config(format!(
                "Rt prior mean must be positive; got {}",
                config.prior.mean
            )));
        }
        if !(config.prior.sd > 0.0 && config.prior.sd.is_finite()) {
            return Err(EstimationError::config(format!(
                "Rt prior sd must be positive; got {}",
                config.prior.sd
            )));
        }
        if config.pop < 0.0 || !config.pop.is_finite() {
            return Err(EstimationError::config(format!(
                "Rt susceptible population must be non-negative; got {}",
                config.pop
            )));
        }
        if config.random_walk_step > 0 {
            config.use_breakpoints = true;
        }
        Ok(config)
    }
}

/// Numeric Rt fields of the model payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtData {
    pub r_mean: f64,
    pub r_sd: f64,
    #[serde(with = "super::flag")]
    pub estimate_r: bool,
    pub bp_n: usize,
    pub breakpoints: Vec<u8>,
    /// Running sum of `breakpoints`; the active effect at each time
    pub breakpoint_index: Vec<usize>,
    #[serde(with = "super::flag")]
    pub future_fixed: bool,
    pub fixed_from: i64,
    pub future_time: i64,
    pub pop: f64,
    #[serde(skip)]
    pub stationary_request: bool,
}

/// Build the Rt payload fields.
///
/// # Arguments
/// * `config` - Resolved settings, or `None` when Rt is not modelled at all
/// * `breakpoints` - 0/1 indicators aligned with the seeding-trimmed index
/// * `mean_delay` - Rounded mean delay, used by the `estimate` future rule
/// * `horizon` - Forecast days at the end of `breakpoints`
pub fn build_rt_data(
    config: Option<&RtConfig>,
    breakpoints: &[u8],
    mean_delay: usize,
    horizon: usize,
) -> RtData {
    let len = breakpoints.len();

    let config = match config {
        Some(config) => config,
        None => {
            debug!("Rt disabled; emitting back-calculation fields");
            return RtData {
                r_mean: 0.0,
                r_sd: 0.0,
                estimate_r: false,
                bp_n: 0,
                breakpoints: vec![0; len],
                breakpoint_index: vec![0; len],
                future_fixed: false,
                fixed_from: 0,
                future_time: horizon as i64,
                pop: 0.0,
                stationary_request: false,
            };
        }
    };

    let future = config.future_policy.resolve(mean_delay);
    let mut use_breakpoints = config.use_breakpoints;
    let mut breakpoints: Vec<u8> = breakpoints.iter().map(|b| u8::from(*b > 0)).collect();

    let step = config.random_walk_step as usize;
    if step > 0 {
        breakpoints = (1..=len).map(|i| u8::from(i % step == 0)).collect();
        use_breakpoints = true;

        if config.future_policy != FuturePolicy::Project {
            let limit = len as i64 - horizon as i64 + future.from;
            for (j, bp) in breakpoints.iter_mut().enumerate() {
                if j as i64 >= limit {
                    *bp = 0;
                }
            }
        }
    }

    if breakpoints.iter().all(|b| *b == 0) {
        use_breakpoints = false;
    }
    if !use_breakpoints {
        breakpoints.iter_mut().for_each(|b| *b = 0);
    }

    let mut running = 0usize;
    let breakpoint_index: Vec<usize> = breakpoints
        .iter()
        .map(|b| {
            running += *b as usize;
            running
        })
        .collect();

    RtData {
        r_mean: config.prior.mean,
        r_sd: config.prior.sd,
        estimate_r: config.use_rt,
        bp_n: running,
        breakpoints,
        breakpoint_index,
        future_fixed: future.fixed,
        fixed_from: future.from,
        future_time: horizon as i64 - future.from,
        pop: config.pop,
        stationary_request: config.gp_on == GpOn::InitialR,
    }
}
