//! Sampler algorithm settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::config::resolver::resolve_into;
use crate::core::errors::{EstimationError, EstimationResult};

/// Algorithm parameters passed to the inference engine with every chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerArgs {
    /// Total post-warmup draws across all chains
    pub samples: usize,
    pub warmup: usize,
    pub chains: usize,
    /// Chains run at once within one region
    pub cores: usize,
    pub adapt_delta: f64,
    pub max_treedepth: u32,
    /// Wall-clock limit per region in seconds
    #[serde(default)]
    pub max_execution_time: Option<u64>,
}

impl Default for SamplerArgs {
    fn default() -> Self {
        Self {
            samples: 2000,
            warmup: 250,
            chains: 4,
            cores: 1,
            adapt_delta: 0.95,
            max_treedepth: 15,
            max_execution_time: None,
        }
    }
}

impl SamplerArgs {
    pub fn defaults() -> Table {
        let defaults = Self::default();
        let mut table = Table::new();
        table.insert("samples".into(), Value::Integer(defaults.samples as i64));
        table.insert("warmup".into(), Value::Integer(defaults.warmup as i64));
        table.insert("chains".into(), Value::Integer(defaults.chains as i64));
        table.insert("cores".into(), Value::Integer(defaults.cores as i64));
        table.insert("adapt_delta".into(), Value::Float(defaults.adapt_delta));
        table.insert("max_treedepth".into(), Value::Integer(defaults.max_treedepth as i64));
        table
    }

    pub fn resolve(overrides: &Table) -> EstimationResult<Self> {
        let args: SamplerArgs = resolve_into(&Self::defaults(), overrides)?;

        if args.samples == 0 {
            return Err(EstimationError::config("samples must be at least 1"));
        }
        if args.chains == 0 {
            return Err(EstimationError::config("chains must be at least 1"));
        }
        if args.cores == 0 {
            return Err(EstimationError::config("cores must be at least 1"));
        }
        if !(args.adapt_delta > 0.0 && args.adapt_delta < 1.0) {
            return Err(EstimationError::config(format!(
                "adapt_delta must lie in (0, 1); got {}",
                args.adapt_delta
            )));
        }
        if args.max_execution_time == Some(0) {
            return Err(EstimationError::config(
                "max_execution_time must be positive when set",
            ));
        }
        Ok(args)
    }

    /// Post-warmup draws requested from each chain.
    pub fn samples_per_chain(&self) -> usize {
        self.samples.div_ceil(self.chains)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.max_execution_time.map(Duration::from_secs)
    }
}
