//! Inference orchestration and posterior reporting.
//!
//! # Components
//!
//! - [`inference`]: The engine trait, chain requests and merged draws
//! - [`orchestrator`]: Per-region runs with bounded concurrency and timeouts
//! - [`summary`]: Quantiles, credible intervals and summary tables
//! - [`report`]: Headline measures and the cross-region report
//! - [`synthetic`]: Scriptable in-memory engine for tests and benchmarks

pub mod inference;
pub mod orchestrator;
pub mod report;
pub mod summary;
pub mod synthetic;

pub use inference::{
    CancellationFlag, ChainDraws, ChainRequest, InferenceEngine, InferenceError, PosteriorSamples,
};
pub use orchestrator::{
    OrchestratorConfig, RegionEvent, RegionJob, RegionResult, RegionStatus, RegionalOrchestrator,
};
pub use report::{
    doubling_interval, doubling_time, summarise_region, AggregateSummary, ExpectedChange, HeadlineNumbers,
    HeadlineRow, RegionEstimate,
};
pub use summary::{
    credible_interval, quantile, sample_table, summarise_samples, CredibleInterval, DrawSummary,
    EstimateType, SampleRow, SummaryOptions, SummaryRow,
};
pub use synthetic::SyntheticEngine;
