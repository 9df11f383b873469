//! Inference engine seam.
//!
//! The Bayesian sampler is an external capability. The orchestrator only
//! needs to run one chain at a time through [`InferenceEngine::sample_chain`]
//! and merge what comes back into [`PosteriorSamples`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::algorithms::initial_conditions::InitialValues;
use crate::core::domain::RegionId;
use crate::core::errors::EstimationError;
use crate::models::model_data::ModelInputData;
use crate::models::sampler::SamplerArgs;

/// Error type for a single chain
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("Sampler error: {0}")]
    Sampler(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Chain cancelled")]
    Cancelled,
}

impl From<InferenceError> for EstimationError {
    fn from(err: InferenceError) -> Self {
        EstimationError::Inference(err.to_string())
    }
}

/// Cooperative cancellation shared by the chains of one region.
///
/// Engines should poll [`CancellationFlag::is_cancelled`] between
/// iterations and return [`InferenceError::Cancelled`] once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one chain needs.
#[derive(Debug, Clone)]
pub struct ChainRequest {
    pub region: RegionId,
    pub chain_id: usize,
    pub data: Arc<ModelInputData>,
    pub init: InitialValues,
    pub args: Arc<SamplerArgs>,
    pub cancel: CancellationFlag,
    /// Wall-clock limit for the whole region, if any
    pub deadline: Option<Instant>,
}

impl ChainRequest {
    /// `true` once the chain should stop: cancelled or past the deadline.
    pub fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Post-warmup draws of one chain.
///
/// Each parameter maps to one vector per iteration; scalar parameters have
/// vectors of length 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainDraws {
    pub chain_id: usize,
    pub draws: BTreeMap<String, Vec<Vec<f64>>>,
}

impl ChainDraws {
    pub fn new(chain_id: usize) -> Self {
        Self {
            chain_id,
            draws: BTreeMap::new(),
        }
    }

    /// Append one iteration's value of `parameter`.
    pub fn push(&mut self, parameter: &str, values: Vec<f64>) {
        self.draws.entry(parameter.to_string()).or_default().push(values);
    }

    pub fn iterations(&self, parameter: &str) -> usize {
        self.draws.get(parameter).map_or(0, Vec::len)
    }
}

/// Draws of every committed chain, indexed by parameter then time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSamples {
    parameters: BTreeMap<String, Vec<Vec<f64>>>,
    chains: usize,
}

impl PosteriorSamples {
    /// Merge chains in the given order.
    pub fn from_chains(chains: &[ChainDraws]) -> Self {
        let mut parameters: BTreeMap<String, Vec<Vec<f64>>> = BTreeMap::new();
        for chain in chains {
            for (name, iterations) in &chain.draws {
                let by_time = parameters.entry(name.clone()).or_default();
                for values in iterations {
                    if by_time.len() < values.len() {
                        by_time.resize_with(values.len(), Vec::new);
                    }
                    for (t, value) in values.iter().enumerate() {
                        by_time[t].push(*value);
                    }
                }
            }
        }
        Self {
            parameters,
            chains: chains.len(),
        }
    }

    /// Draws of `name`, one vector per time index.
    pub fn parameter(&self, name: &str) -> Option<&[Vec<f64>]> {
        self.parameters.get(name).map(Vec::as_slice)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn chains(&self) -> usize {
        self.chains
    }

    /// Draws per time index of `name`.
    pub fn draw_count(&self, name: &str) -> usize {
        self.parameter(name)
            .and_then(|p| p.first())
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// The external sampler.
///
/// Invoked once per chain, possibly from several threads at once.
/// Implementations must be `Send + Sync` and should return promptly with
/// [`InferenceError::Cancelled`] when [`ChainRequest::should_stop`] turns
/// true.
pub trait InferenceEngine: Send + Sync {
    fn sample_chain(&self, request: ChainRequest) -> Result<ChainDraws, InferenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_chains_by_time() {
        let mut a = ChainDraws::new(0);
        a.push("R", vec![1.0, 1.1]);
        a.push("R", vec![1.2, 1.3]);
        let mut b = ChainDraws::new(1);
        b.push("R", vec![0.9, 1.0]);
        b.push("phi", vec![4.0]);

        let samples = PosteriorSamples::from_chains(&[a, b]);
        let r = samples.parameter("R").unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r[0], vec![1.0, 1.2, 0.9]);
        assert_eq!(r[1], vec![1.1, 1.3, 1.0]);
        assert_eq!(samples.draw_count("phi"), 1);
        assert_eq!(samples.chains(), 2);
        assert_eq!(samples.parameter_names().collect::<Vec<_>>(), vec!["R", "phi"]);
    }

    #[test]
    fn test_cancellation_is_shared() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_error_conversion() {
        let err: EstimationError = InferenceError::Sampler("divergent".into()).into();
        assert_eq!(err, EstimationError::Inference("Sampler error: divergent".into()));
    }
}
