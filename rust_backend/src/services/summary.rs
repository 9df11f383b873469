//! Posterior draw summaries.
//!
//! Reduces per-time draws to mean, sd, median and credible intervals, labels
//! each date by how much data informs it, and flattens draws into a long
//! sample table.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::inference::PosteriorSamples;
use crate::core::domain::RegionId;
use crate::models::model_data::ModelInputData;

/// Summary settings shared by every region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryOptions {
    pub credible_intervals: Vec<f64>,
    /// Trailing days of confirmed cases used to rank regions
    pub ranking_window: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            credible_intervals: vec![0.2, 0.5, 0.9],
            ranking_window: 7,
        }
    }
}

impl SummaryOptions {
    /// Widest requested level.
    pub fn widest_level(&self) -> f64 {
        self.credible_intervals.iter().copied().fold(0.0, f64::max)
    }
}

/// Quantile `q` of sorted draws by linear interpolation of order statistics
/// at the 0-based position `q * (n - 1)`.
///
/// Returns NaN for empty input.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

fn sorted_copy(draws: &[f64]) -> Vec<f64> {
    let mut sorted = draws.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Central interval holding `level` of the draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CredibleInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Interval for one level: quantiles `0.5 - level/2` and `0.5 + level/2`.
pub fn credible_interval(draws: &[f64], level: f64) -> CredibleInterval {
    let sorted = sorted_copy(draws);
    interval_from_sorted(&sorted, level)
}

fn interval_from_sorted(sorted: &[f64], level: f64) -> CredibleInterval {
    CredibleInterval {
        level,
        lower: quantile(sorted, 0.5 - level / 2.0),
        upper: quantile(sorted, 0.5 + level / 2.0),
    }
}

/// Statistics of one set of draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawSummary {
    pub mean: f64,
    /// Population standard deviation
    pub sd: f64,
    pub median: f64,
    pub intervals: Vec<CredibleInterval>,
}

impl DrawSummary {
    pub fn from_draws(draws: &[f64], levels: &[f64]) -> Self {
        let sorted = sorted_copy(draws);
        let n = sorted.len() as f64;
        let (mean, sd) = if sorted.is_empty() {
            (f64::NAN, f64::NAN)
        } else {
            let mean = sorted.iter().sum::<f64>() / n;
            let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            (mean, variance.sqrt())
        };

        Self {
            mean,
            sd,
            median: quantile(&sorted, 0.5),
            intervals: levels
                .iter()
                .map(|level| interval_from_sorted(&sorted, *level))
                .collect(),
        }
    }

    /// Interval at exactly `level`, if it was requested.
    pub fn interval(&self, level: f64) -> Option<&CredibleInterval> {
        self.intervals.iter().find(|i| (i.level - level).abs() < 1e-9)
    }
}

/// How much observed data informs a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateType {
    #[serde(rename = "estimate")]
    Estimate,
    #[serde(rename = "estimate based on partial data")]
    PartialData,
    #[serde(rename = "forecast")]
    Forecast,
}

impl fmt::Display for EstimateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EstimateType::Estimate => "estimate",
            EstimateType::PartialData => "estimate based on partial data",
            EstimateType::Forecast => "forecast",
        };
        f.write_str(label)
    }
}

/// Type of the post-seeding time index `index`.
///
/// The last `seeding_time` observed days are only partially informed by
/// reports; anything after the observed window is a forecast.
pub fn estimate_type(index: usize, observed_days: usize, seeding_time: usize) -> EstimateType {
    if index >= observed_days {
        EstimateType::Forecast
    } else if index + seeding_time >= observed_days {
        EstimateType::PartialData
    } else {
        EstimateType::Estimate
    }
}

/// One summarised parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub region: RegionId,
    pub variable: String,
    pub time: usize,
    pub date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub estimate_type: Option<EstimateType>,
    #[serde(flatten)]
    pub summary: DrawSummary,
}

/// Summarise every parameter of `samples`.
///
/// Parameters with one value per post-seeding day are dated and typed;
/// anything else is reported by time index only.
pub fn summarise_samples(
    data: &ModelInputData,
    samples: &PosteriorSamples,
    levels: &[f64],
) -> Vec<SummaryRow> {
    let modelled = data.modelled_time();
    let dates = &data.dates[data.seeding_time..];
    let observed = data.observed_days();

    let mut rows = Vec::new();
    for name in samples.parameter_names() {
        let by_time = match samples.parameter(name) {
            Some(by_time) => by_time,
            None => continue,
        };
        let dated = by_time.len() == modelled;
        for (time, draws) in by_time.iter().enumerate() {
            rows.push(SummaryRow {
                region: data.region.clone(),
                variable: name.to_string(),
                time,
                date: if dated { dates.get(time).copied() } else { None },
                estimate_type: dated.then(|| estimate_type(time, observed, data.seeding_time)),
                summary: DrawSummary::from_draws(draws, levels),
            });
        }
    }
    rows
}

/// One draw in long form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub parameter: String,
    pub time: usize,
    pub draw_id: usize,
    pub value: f64,
    pub region: RegionId,
}

/// Flatten draws into `{parameter, time, draw_id, value, region}` rows.
pub fn sample_table(region: &RegionId, samples: &PosteriorSamples) -> Vec<SampleRow> {
    let mut rows = Vec::new();
    for name in samples.parameter_names() {
        if let Some(by_time) = samples.parameter(name) {
            for (time, draws) in by_time.iter().enumerate() {
                rows.extend(draws.iter().enumerate().map(|(draw_id, value)| SampleRow {
                    parameter: name.to_string(),
                    time,
                    draw_id,
                    value: *value,
                    region: region.clone(),
                }));
            }
        }
    }
    rows
}
