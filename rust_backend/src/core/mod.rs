//! Core domain models and the shared error type.
//!
//! This module defines the case-series data structures used throughout the
//! crate and the [`EstimationError`] taxonomy every stage reports through.

pub mod domain;
pub mod errors;

pub use domain::{split_by_region, CaseObservation, CaseSeries, DailyCases, DayKind, RegionId};
pub use errors::{EstimationError, EstimationResult};
