//! Rt estimation: model-input assembly and regional orchestration.
//!
//! Case tables are cleaned and combined with delay, reproduction-number,
//! Gaussian-process and observation settings into one validated payload per
//! region. Each payload is run through an external [`InferenceEngine`]
//! with bounded concurrency and per-region fault isolation, and the draws
//! are reduced to credible-interval summaries and headline measures.
//!
//! [`InferenceEngine`]: services::inference::InferenceEngine

pub mod algorithms;
pub mod config;
pub mod core;
pub mod io;
pub mod models;
pub mod preprocessing;
pub mod services;
pub mod transformations;

pub use crate::config::settings::EstimationSettings;
pub use crate::core::errors::{EstimationError, EstimationResult};
pub use crate::preprocessing::pipeline::{EstimationOutput, RegionalPipeline};
