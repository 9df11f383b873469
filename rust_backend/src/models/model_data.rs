//! The assembled, validated input for one region's inference run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::delays::{DelayArrays, GenerationTimeData};
use super::gp::GpData;
use super::observation::ObservationData;
use super::rt::RtData;
use crate::core::domain::RegionId;
use crate::core::errors::{EstimationError, EstimationResult};

/// Everything the inference engine needs for one region.
///
/// Serialized flat to JSON, which is the wire format handed to external
/// engines. Time-indexed vectors after the seeding window have length
/// `t - seeding_time`; `cases` stops before the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInputData {
    #[serde(skip_serializing, default = "RegionId::default_region")]
    pub region: RegionId,
    /// Full series length including seeding and horizon
    pub t: usize,
    pub seeding_time: usize,
    pub horizon: usize,
    /// Observed counts
    pub cases: Vec<u64>,
    /// Smoothed, delay-shifted infection proxy
    pub shifted_cases: Vec<f64>,
    /// Dates of the full series
    pub dates: Vec<NaiveDate>,
    /// Position in the reporting week of each post-seeding day, from 1
    pub day_of_week: Vec<u32>,
    #[serde(flatten)]
    pub delays: DelayArrays,
    #[serde(flatten)]
    pub generation_time: GenerationTimeData,
    #[serde(flatten)]
    pub rt: RtData,
    #[serde(flatten)]
    pub gp: GpData,
    #[serde(flatten)]
    pub obs: ObservationData,
    pub prior_infections: f64,
    pub prior_growth: f64,
}

impl ModelInputData {
    /// Number of post-seeding time points (observed plus horizon).
    pub fn modelled_time(&self) -> usize {
        self.t - self.seeding_time
    }

    pub fn observed_days(&self) -> usize {
        self.cases.len()
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Check the cross-component invariants of an assembled payload.
    pub fn validate(&self) -> EstimationResult<()> {
        if self.seeding_time >= self.t {
            return Err(EstimationError::data(format!(
                "seeding time ({}) must be shorter than the series ({} days)",
                self.seeding_time, self.t
            )));
        }
        if self.seeding_time + self.horizon >= self.t {
            return Err(EstimationError::data(format!(
                "no observed days remain after {} seeding and {} horizon days",
                self.seeding_time, self.horizon
            )));
        }
        if self.dates.len() != self.t {
            return Err(mismatch("dates", self.dates.len(), self.t));
        }

        let modelled = self.modelled_time();
        if self.cases.len() != modelled - self.horizon {
            return Err(mismatch("cases", self.cases.len(), modelled - self.horizon));
        }
        for (name, len) in [
            ("shifted_cases", self.shifted_cases.len()),
            ("day_of_week", self.day_of_week.len()),
            ("breakpoints", self.rt.breakpoints.len()),
            ("breakpoint_index", self.rt.breakpoint_index.len()),
        ] {
            if len != modelled {
                return Err(mismatch(name, len, modelled));
            }
        }

        let delay_lengths = [
            self.delays.mean_mean.len(),
            self.delays.mean_sd.len(),
            self.delays.sd_mean.len(),
            self.delays.sd_sd.len(),
            self.delays.max.len(),
        ];
        if delay_lengths.iter().any(|len| *len != self.delays.count) {
            return Err(EstimationError::config(format!(
                "per-delay arrays must all have {} entries; got {:?}",
                self.delays.count, delay_lengths
            )));
        }

        let bp_sum: usize = self.rt.breakpoints.iter().map(|b| *b as usize).sum();
        if bp_sum != self.rt.bp_n {
            return Err(EstimationError::config(format!(
                "breakpoint count {} does not match the breakpoint vector ({})",
                self.rt.bp_n, bp_sum
            )));
        }
        if !self.prior_infections.is_finite() || !self.prior_growth.is_finite() {
            return Err(EstimationError::data("case-derived priors are not finite"));
        }
        Ok(())
    }
}

fn mismatch(name: &str, got: usize, expected: usize) -> EstimationError {
    EstimationError::data(format!(
        "{} has {} entries; expected {}",
        name, got, expected
    ))
}
