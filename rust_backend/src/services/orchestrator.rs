//! Per-region inference with fault isolation.
//!
//! Every region runs as its own task; a semaphore bounds how many run at
//! once. Within a region, chains run on the blocking pool, bounded by the
//! sampler's `cores` setting. A failing, panicking or slow region never
//! affects its siblings, and the ledger always comes back in input order.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

use super::inference::{
    CancellationFlag, ChainDraws, ChainRequest, InferenceEngine, InferenceError, PosteriorSamples,
};
use super::report::{summarise_region, RegionEstimate};
use super::summary::SummaryOptions;
use crate::core::domain::RegionId;
use crate::core::errors::EstimationError;
use crate::models::sampler::SamplerArgs;
use crate::preprocessing::assembler::AssembledModel;

/// Lifecycle of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

/// Progress notification sent on every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionEvent {
    pub region: RegionId,
    pub status: RegionStatus,
    /// Chains committed so far (final events only)
    pub chains: usize,
}

/// One region handed to the orchestrator: an assembled model, or the error
/// that prevented assembly.
#[derive(Debug)]
pub struct RegionJob {
    pub region: RegionId,
    pub model: Result<AssembledModel, EstimationError>,
}

/// Outcome of one region.
#[derive(Debug, Clone)]
pub struct RegionResult {
    pub region_id: RegionId,
    pub status: RegionStatus,
    pub samples: Option<PosteriorSamples>,
    pub summarised: Option<RegionEstimate>,
    pub error_message: Option<String>,
    pub elapsed: Duration,
    pub chains_committed: usize,
}

impl RegionResult {
    fn failed(region_id: RegionId, message: String, elapsed: Duration) -> Self {
        Self {
            region_id,
            status: RegionStatus::Failed,
            samples: None,
            summarised: None,
            error_message: Some(message),
            elapsed,
            chains_committed: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RegionStatus::Succeeded
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Regions run at once
    pub concurrency: usize,
    /// Wall-clock limit per region
    pub timeout: Option<Duration>,
    pub summary: SummaryOptions,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            timeout: None,
            summary: SummaryOptions::default(),
        }
    }
}

/// Runs an [`InferenceEngine`] once per region.
pub struct RegionalOrchestrator {
    engine: Arc<dyn InferenceEngine>,
    args: Arc<SamplerArgs>,
    config: OrchestratorConfig,
    events: Option<mpsc::UnboundedSender<RegionEvent>>,
}

impl RegionalOrchestrator {
    pub fn new(engine: Arc<dyn InferenceEngine>, args: SamplerArgs, config: OrchestratorConfig) -> Self {
        Self {
            engine,
            args: Arc::new(args),
            config,
            events: None,
        }
    }

    /// Send a [`RegionEvent`] for every transition to `sender`.
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<RegionEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Run every job and return one result per job, in input order.
    pub async fn run(&self, jobs: Vec<RegionJob>) -> Vec<RegionResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        info!(
            "Running {} regions ({} at a time, {} chains each)",
            jobs.len(),
            self.config.concurrency.max(1),
            self.args.chains
        );

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            emit(&self.events, &job.region, RegionStatus::Pending, 0);
            let region = job.region.clone();
            let task = RegionTask {
                engine: Arc::clone(&self.engine),
                args: Arc::clone(&self.args),
                timeout: self.config.timeout,
                summary: self.config.summary.clone(),
                events: self.events.clone(),
            };
            let semaphore = Arc::clone(&semaphore);
            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return RegionResult::failed(job.region, e.to_string(), Duration::ZERO)
                    }
                };
                task.run(job).await
            });
            handles.push((region, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (region, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Region {} task failed: {}", region, e);
                    emit(&self.events, &region, RegionStatus::Failed, 0);
                    RegionResult::failed(region, format!("region task failed: {}", e), Duration::ZERO)
                }
            };
            results.push(result);
        }
        results
    }
}

fn emit(
    events: &Option<mpsc::UnboundedSender<RegionEvent>>,
    region: &RegionId,
    status: RegionStatus,
    chains: usize,
) {
    if let Some(sender) = events {
        // A dropped receiver only means nobody is listening
        let _ = sender.send(RegionEvent {
            region: region.clone(),
            status,
            chains,
        });
    }
}

struct RegionTask {
    engine: Arc<dyn InferenceEngine>,
    args: Arc<SamplerArgs>,
    timeout: Option<Duration>,
    summary: SummaryOptions,
    events: Option<mpsc::UnboundedSender<RegionEvent>>,
}

impl RegionTask {
    async fn run(self, job: RegionJob) -> RegionResult {
        let start = Instant::now();
        let region = job.region;

        let model = match job.model {
            Ok(model) => model,
            Err(e) => {
                warn!("Region {} skipped: {}", region, e);
                emit(&self.events, &region, RegionStatus::Failed, 0);
                return RegionResult::failed(region, e.to_string(), start.elapsed());
            }
        };

        info!("Region {} running", region);
        emit(&self.events, &region, RegionStatus::Running, 0);

        let deadline = self.timeout.map(|t| start + t);
        let cancel = CancellationFlag::new();
        let chain_slots = Arc::new(Semaphore::new(self.args.cores.max(1)));
        let mut chains: JoinSet<Result<ChainDraws, InferenceError>> = JoinSet::new();

        for chain_id in 0..self.args.chains {
            let request = ChainRequest {
                region: region.clone(),
                chain_id,
                data: Arc::clone(&model.data),
                init: model.init.draw(),
                args: Arc::clone(&self.args),
                cancel: cancel.clone(),
                deadline: deadline.map(Instant::into_std),
            };
            let engine = Arc::clone(&self.engine);
            let slots = Arc::clone(&chain_slots);
            chains.spawn(async move {
                let _slot = slots
                    .acquire_owned()
                    .await
                    .map_err(|e| InferenceError::Sampler(e.to_string()))?;
                if request.should_stop() {
                    return Err(InferenceError::Cancelled);
                }
                tokio::task::spawn_blocking(move || engine.sample_chain(request))
                    .await
                    .map_err(|e| InferenceError::Sampler(format!("chain panicked: {}", e)))?
            });
        }

        let mut committed: Vec<ChainDraws> = Vec::new();
        let mut failure: Option<String> = None;
        let mut timed_out = false;

        loop {
            let next = match deadline {
                Some(deadline) => match timeout_at(deadline, chains.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        timed_out = true;
                        break;
                    }
                },
                None => chains.join_next().await,
            };
            match next {
                None => break,
                Some(Ok(Ok(draws))) => {
                    debug!("Region {} chain {} finished", region, draws.chain_id);
                    committed.push(draws);
                }
                Some(Ok(Err(InferenceError::Cancelled))) => {
                    // Only reachable once the deadline has passed
                    timed_out = true;
                }
                Some(Ok(Err(e))) => {
                    failure = Some(e.to_string());
                    break;
                }
                Some(Err(e)) => {
                    failure = Some(format!("chain task failed: {}", e));
                    break;
                }
            }
        }

        if timed_out || failure.is_some() {
            cancel.cancel();
            chains.abort_all();
        }

        let elapsed = start.elapsed();
        if let Some(message) = failure {
            warn!("Region {} failed: {}", region, message);
            emit(&self.events, &region, RegionStatus::Failed, 0);
            return RegionResult::failed(region, message, elapsed);
        }

        committed.sort_by_key(|c| c.chain_id);
        let chains_committed = committed.len();
        let status = if timed_out {
            warn!(
                "Region {} timed out after {:.1}s with {} of {} chains",
                region,
                elapsed.as_secs_f64(),
                chains_committed,
                self.args.chains
            );
            RegionStatus::TimedOut
        } else {
            RegionStatus::Succeeded
        };

        let mut result = RegionResult {
            region_id: region.clone(),
            status,
            samples: None,
            summarised: None,
            error_message: timed_out.then(|| {
                EstimationError::Timeout(format!(
                    "{:.1}s elapsed with {} of {} chains",
                    elapsed.as_secs_f64(),
                    chains_committed,
                    self.args.chains
                ))
                .to_string()
            }),
            elapsed,
            chains_committed,
        };

        if chains_committed > 0 {
            let samples = PosteriorSamples::from_chains(&committed);
            match summarise_region(&model.data, &samples, &self.summary) {
                Ok(estimate) => result.summarised = Some(estimate),
                Err(e) => {
                    warn!("Region {} could not be summarised: {}", region, e);
                    emit(&self.events, &region, RegionStatus::Failed, chains_committed);
                    let mut failed = RegionResult::failed(region, e.to_string(), elapsed);
                    failed.chains_committed = chains_committed;
                    failed.samples = Some(samples);
                    return failed;
                }
            }
            result.samples = Some(samples);
        }

        info!("Region {} finished: {:?}", region, status);
        emit(&self.events, &region, status, chains_committed);
        result
    }
}
