//! In-memory inference engine for tests and benchmarks.
//!
//! Produces plausible draws from the payload's own priors without running a
//! sampler. Individual regions can be told to fail, panic or run slowly so
//! that orchestration behaviour can be exercised deterministically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::inference::{ChainDraws, ChainRequest, InferenceEngine, InferenceError};
use super::report::{GROWTH_PARAMETER, INFECTIONS_PARAMETER, RT_PARAMETER};
use crate::algorithms::sampling::normal;
use crate::core::domain::RegionId;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Default)]
struct RegionScript {
    failure: Option<String>,
    panic: bool,
    delay: Option<Duration>,
    chain_delays: HashMap<usize, Duration>,
}

/// Scriptable engine returning draws generated from the priors.
///
/// # Example
/// ```
/// use epi_rt::core::domain::RegionId;
/// use epi_rt::services::synthetic::SyntheticEngine;
///
/// let engine = SyntheticEngine::new().failing(RegionId::from("south"), "divergent");
/// assert_eq!(engine.calls(), 0);
/// ```
#[derive(Clone, Default)]
pub struct SyntheticEngine {
    scripts: Arc<RwLock<HashMap<RegionId, RegionScript>>>,
    calls: Arc<AtomicUsize>,
}

impl SyntheticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(self, region: RegionId, edit: impl FnOnce(&mut RegionScript)) -> Self {
        if let Ok(mut scripts) = self.scripts.write() {
            edit(scripts.entry(region).or_default());
        }
        self
    }

    /// Every chain of `region` returns a sampler error.
    pub fn failing(self, region: RegionId, message: &str) -> Self {
        let message = message.to_string();
        self.script(region, |s| s.failure = Some(message))
    }

    /// Every chain of `region` panics.
    pub fn panicking(self, region: RegionId) -> Self {
        self.script(region, |s| s.panic = true)
    }

    /// Every chain of `region` takes at least `delay`.
    pub fn with_delay(self, region: RegionId, delay: Duration) -> Self {
        self.script(region, |s| s.delay = Some(delay))
    }

    /// Chain `chain_id` of `region` takes at least `delay`.
    pub fn with_chain_delay(self, region: RegionId, chain_id: usize, delay: Duration) -> Self {
        self.script(region, |s| {
            s.chain_delays.insert(chain_id, delay);
        })
    }

    /// Chains started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn script_for(&self, region: &RegionId) -> RegionScript {
        self.scripts
            .read()
            .ok()
            .and_then(|s| s.get(region).cloned())
            .unwrap_or_default()
    }
}

fn seed_for(region: &RegionId, chain_id: usize) -> u64 {
    region
        .as_str()
        .bytes()
        .fold(chain_id as u64 + 1, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
}

impl InferenceEngine for SyntheticEngine {
    fn sample_chain(&self, request: ChainRequest) -> Result<ChainDraws, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script_for(&request.region);

        let delay = script
            .chain_delays
            .get(&request.chain_id)
            .copied()
            .or(script.delay);
        if let Some(delay) = delay {
            let start = Instant::now();
            while start.elapsed() < delay {
                if request.should_stop() {
                    return Err(InferenceError::Cancelled);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }

        if script.panic {
            panic!("synthetic chain {} panicked", request.chain_id);
        }
        if let Some(message) = script.failure {
            return Err(InferenceError::Sampler(message));
        }

        let data = &request.data;
        let modelled = data.modelled_time();
        let generation_time = data.generation_time.gt_mean_mean.max(1.0);
        let mut rng = StdRng::seed_from_u64(seed_for(&request.region, request.chain_id));
        let mut draws = ChainDraws::new(request.chain_id);

        for _ in 0..request.args.samples_per_chain() {
            if request.should_stop() {
                return Err(InferenceError::Cancelled);
            }
            let growth = normal(&mut rng, data.prior_growth, 0.02);
            let level = data.prior_infections + normal(&mut rng, 0.0, 0.05);

            let infections: Vec<f64> = (0..modelled)
                .map(|t| (level + growth * t as f64).exp())
                .collect();
            let rt = vec![(growth * generation_time).exp(); modelled];

            draws.push(INFECTIONS_PARAMETER, infections);
            draws.push(RT_PARAMETER, rt);
            draws.push(GROWTH_PARAMETER, vec![growth; modelled]);
        }
        Ok(draws)
    }
}
