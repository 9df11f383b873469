//! Numerical building blocks for model assembly.
//!
//! # Components
//!
//! - [`moments`]: Lognormal moment matching and significant-figure rounding
//! - [`regression`]: Least-squares fits used for case-derived priors
//! - [`sampling`]: Scalar random draws (normal, lognormal, truncated normal)
//! - [`initial_conditions`]: Sampler starting values bound to a payload

pub mod initial_conditions;
pub mod moments;
pub mod regression;
pub mod sampling;

#[cfg(test)]
mod initial_conditions_tests;

pub use initial_conditions::{InitialConditionGenerator, InitialValues};
pub use moments::{lognormal_meanlog, lognormal_moments, lognormal_sdlog, signif};
pub use regression::{linear_fit, log_linear_fit};
