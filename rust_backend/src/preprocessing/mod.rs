//! Model-input preparation.
//!
//! # Modules
//!
//! - [`validator`]: Raw case-row checks with errors and warnings
//! - [`priors`]: First-window infection level and growth priors
//! - [`assembler`]: Resolved settings plus a cleaned series into a payload
//! - [`pipeline`]: Multi-region estimation from case rows to summaries

pub mod assembler;
pub mod pipeline;
pub mod priors;
pub mod validator;

pub use assembler::{AssembledModel, ModelDataAssembler};
pub use pipeline::{EstimationOutput, RegionalPipeline};
pub use priors::{first_window_priors, CasePriors};
pub use validator::{CaseValidator, ValidationResult, ValidationStats};
