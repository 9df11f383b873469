//! Headline measures and the cross-region report.

use std::fmt;

use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

use super::inference::PosteriorSamples;
use super::orchestrator::{RegionResult, RegionStatus};
use super::summary::{
    estimate_type, summarise_samples, CredibleInterval, DrawSummary, EstimateType, SummaryOptions,
    SummaryRow,
};
use crate::algorithms::moments::signif;
use crate::core::domain::RegionId;
use crate::core::errors::{EstimationError, EstimationResult};
use crate::models::model_data::ModelInputData;

/// Parameter holding Rt draws.
pub const RT_PARAMETER: &str = "R";
/// Parameter holding new-infection draws.
pub const INFECTIONS_PARAMETER: &str = "infections";
/// Parameter holding growth-rate draws; derived from infections if absent.
pub const GROWTH_PARAMETER: &str = "growth_rate";

/// Qualitative trend from the probability that Rt is at most 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedChange {
    Increasing,
    #[serde(rename = "Likely increasing")]
    LikelyIncreasing,
    Stable,
    #[serde(rename = "Likely decreasing")]
    LikelyDecreasing,
    Decreasing,
    /// No draws to judge the trend from
    Unknown,
}

impl ExpectedChange {
    pub fn from_prob_control(prob_control: f64) -> Self {
        if prob_control.is_nan() {
            ExpectedChange::Unknown
        } else if prob_control < 0.05 {
            ExpectedChange::Increasing
        } else if prob_control < 0.4 {
            ExpectedChange::LikelyIncreasing
        } else if prob_control < 0.6 {
            ExpectedChange::Stable
        } else if prob_control < 0.95 {
            ExpectedChange::LikelyDecreasing
        } else {
            ExpectedChange::Decreasing
        }
    }
}

impl fmt::Display for ExpectedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExpectedChange::Increasing => "Increasing",
            ExpectedChange::LikelyIncreasing => "Likely increasing",
            ExpectedChange::Stable => "Stable",
            ExpectedChange::LikelyDecreasing => "Likely decreasing",
            ExpectedChange::Decreasing => "Decreasing",
            ExpectedChange::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Doubling (or halving) time implied by a growth rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoublingTime {
    pub days: f64,
    pub halving: bool,
}

/// `ln 2 / r`, reported as a positive halving time when `r < 0`.
pub fn doubling_time(rate: f64) -> DoublingTime {
    DoublingTime {
        days: (std::f64::consts::LN_2 / rate).abs(),
        halving: rate < 0.0,
    }
}

/// Doubling-time estimate from a growth-rate estimate.
///
/// Bounds come from the signed `ln 2 / r` of the growth bounds, so the
/// upper growth bound gives the shortest time. When the growth interval
/// contains zero the long side is unbounded. The flag is `true` when the
/// median growth rate is negative and the times are halving times.
pub fn doubling_interval(growth: &HeadlineEstimate) -> (HeadlineEstimate, bool) {
    let median = doubling_time(growth.median);
    let shortest = if median.halving {
        doubling_time(growth.lower).days
    } else {
        doubling_time(growth.upper).days
    };
    let longest = if growth.lower > 0.0 {
        doubling_time(growth.lower).days
    } else if growth.upper < 0.0 {
        doubling_time(growth.upper).days
    } else {
        f64::INFINITY
    };
    let estimate = HeadlineEstimate {
        median: median.days,
        lower: shortest,
        upper: longest,
    };
    (estimate, median.halving)
}

/// Median and widest interval of one headline quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadlineEstimate {
    pub median: f64,
    pub lower: f64,
    pub upper: f64,
}

impl HeadlineEstimate {
    fn from_summary(summary: &DrawSummary, level: f64) -> Self {
        let interval = summary.interval(level).copied().unwrap_or(CredibleInterval {
            level,
            lower: summary.median,
            upper: summary.median,
        });
        Self {
            median: summary.median,
            lower: interval.lower,
            upper: interval.upper,
        }
    }

    /// `"median (lower–upper)"` with `digits` decimals.
    pub fn format(&self, digits: usize) -> String {
        format!(
            "{} ({}\u{2013}{})",
            format_number(self.median, digits),
            format_number(self.lower, digits),
            format_number(self.upper, digits)
        )
    }
}

fn format_number(value: f64, digits: usize) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else if value == f64::INFINITY {
        "Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{:.*}", digits, value)
    }
}

/// Headline numbers at the latest fully informed date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineNumbers {
    pub date: NaiveDate,
    pub infections: HeadlineEstimate,
    pub rt: Option<HeadlineEstimate>,
    pub growth_rate: HeadlineEstimate,
    pub doubling_time: HeadlineEstimate,
    pub halving: bool,
    pub prob_control: f64,
    pub expected_change: ExpectedChange,
}

/// One row of the five-row headline table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineRow {
    pub measure: String,
    pub estimate: String,
}

impl HeadlineNumbers {
    pub fn table(&self) -> Vec<HeadlineRow> {
        let row = |measure: &str, estimate: String| HeadlineRow {
            measure: measure.to_string(),
            estimate,
        };
        vec![
            row("New infections per day", self.infections.format(0)),
            row("Expected change in daily cases", self.expected_change.to_string()),
            row(
                "Effective reproduction no.",
                self.rt.map_or_else(|| "NA".to_string(), |rt| rt.format(1)),
            ),
            row("Rate of growth", self.growth_rate.format(2)),
            row(
                if self.halving {
                    "Halving time (days)"
                } else {
                    "Doubling time (days)"
                },
                self.doubling_time.format(1),
            ),
        ]
    }
}

/// Everything reported for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionEstimate {
    pub region: RegionId,
    pub summary: Vec<SummaryRow>,
    pub headline: Vec<HeadlineRow>,
    pub numbers: HeadlineNumbers,
    /// Confirmed cases over the trailing ranking window
    pub recent_cases: u64,
}

/// Index of the latest post-seeding day typed as a full estimate, falling
/// back to the last observed day.
fn latest_estimate_index(data: &ModelInputData) -> usize {
    let observed = data.observed_days();
    (0..observed)
        .rev()
        .find(|i| estimate_type(*i, observed, data.seeding_time) == EstimateType::Estimate)
        .unwrap_or(observed.saturating_sub(1))
}

fn growth_draws(samples: &PosteriorSamples, index: usize) -> Option<Vec<f64>> {
    if let Some(draws) = samples.parameter(GROWTH_PARAMETER).and_then(|p| p.get(index)) {
        return Some(draws.clone());
    }
    let infections = samples.parameter(INFECTIONS_PARAMETER)?;
    let (previous, current) = (infections.get(index.checked_sub(1)?)?, infections.get(index)?);
    Some(
        previous
            .iter()
            .zip(current)
            .map(|(p, c)| (c / p).ln())
            .collect(),
    )
}

/// Summarise one region's draws and build its headline.
///
/// # Errors
/// A data error when the draws carry no infections for the headline date.
pub fn summarise_region(
    data: &ModelInputData,
    samples: &PosteriorSamples,
    options: &SummaryOptions,
) -> EstimationResult<RegionEstimate> {
    let levels = &options.credible_intervals;
    let widest = options.widest_level();
    let index = latest_estimate_index(data);
    let date = data.dates[data.seeding_time + index];

    let infections = samples
        .parameter(INFECTIONS_PARAMETER)
        .and_then(|p| p.get(index))
        .ok_or_else(|| {
            EstimationError::data(format!(
                "region {}: no '{}' draws for {}",
                data.region, INFECTIONS_PARAMETER, date
            ))
        })?;
    let infections = HeadlineEstimate::from_summary(&DrawSummary::from_draws(infections, levels), widest);

    let growth = growth_draws(samples, index).unwrap_or_default();
    let growth_summary = DrawSummary::from_draws(&growth, levels);
    let growth_rate = HeadlineEstimate::from_summary(&growth_summary, widest);

    let rt_draws = samples.parameter(RT_PARAMETER).and_then(|p| p.get(index));
    let rt = rt_draws.map(|draws| HeadlineEstimate::from_summary(&DrawSummary::from_draws(draws, levels), widest));

    // Share of draws at or below the epidemic threshold
    let (controlled, total) = match rt_draws {
        Some(draws) => (draws.iter().filter(|r| **r <= 1.0).count(), draws.len()),
        None => (growth.iter().filter(|r| **r <= 0.0).count(), growth.len()),
    };
    let prob_control = if total == 0 {
        f64::NAN
    } else {
        signif(controlled as f64 / total as f64, 2)
    };

    let (doubling, halving) = doubling_interval(&growth_rate);

    let numbers = HeadlineNumbers {
        date,
        infections,
        rt,
        growth_rate,
        doubling_time: doubling,
        halving,
        prob_control,
        expected_change: ExpectedChange::from_prob_control(prob_control),
    };

    let window = options.ranking_window.min(data.cases.len());
    let recent_cases = data.cases[data.cases.len() - window..].iter().sum();

    Ok(RegionEstimate {
        region: data.region.clone(),
        summary: summarise_samples(data, samples, levels),
        headline: numbers.table(),
        numbers,
        recent_cases,
    })
}

/// One row of the cross-region reporting table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalReportRow {
    pub region: RegionId,
    pub new_infections: String,
    pub expected_change: String,
    pub effective_reproduction_no: String,
    pub rate_of_growth: String,
    pub doubling_halving_time: String,
}

/// Outcome of one region in the aggregate ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub region: RegionId,
    pub status: RegionStatus,
    pub chains: usize,
    pub elapsed_secs: f64,
    pub error: Option<String>,
}

/// Cross-region report over every region with a summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    /// Reporting table, ranked by recent cases
    pub table: Vec<RegionalReportRow>,
    /// Per-region numeric detail, same order as `table`
    pub regions: Vec<RegionEstimate>,
    /// `(region, recent confirmed cases)`, descending
    pub ranking: Vec<(RegionId, u64)>,
    /// Every region in input order
    pub ledger: Vec<LedgerEntry>,
    /// `(region, error)` of regions that failed
    pub failures: Vec<(RegionId, String)>,
}

impl AggregateSummary {
    /// Build the report from the orchestrator's ledger.
    ///
    /// Regions without a summary (failed, or timed out before any chain
    /// finished) appear in the ledger only.
    pub fn from_results(results: &[RegionResult]) -> Self {
        let ledger: Vec<LedgerEntry> = results
            .iter()
            .map(|r| LedgerEntry {
                region: r.region_id.clone(),
                status: r.status,
                chains: r.chains_committed,
                elapsed_secs: r.elapsed.as_secs_f64(),
                error: r.error_message.clone(),
            })
            .collect();

        let failures: Vec<(RegionId, String)> = results
            .iter()
            .filter(|r| r.status == RegionStatus::Failed)
            .map(|r| {
                (
                    r.region_id.clone(),
                    r.error_message.clone().unwrap_or_default(),
                )
            })
            .collect();

        let mut regions: Vec<RegionEstimate> =
            results.iter().filter_map(|r| r.summarised.clone()).collect();
        regions.sort_by(|a, b| {
            b.recent_cases
                .cmp(&a.recent_cases)
                .then_with(|| a.region.cmp(&b.region))
        });

        let ranking = regions
            .iter()
            .map(|r| (r.region.clone(), r.recent_cases))
            .collect();

        let table = regions
            .iter()
            .map(|r| {
                let estimate = |i: usize| {
                    r.headline
                        .get(i)
                        .map(|row| row.estimate.clone())
                        .unwrap_or_default()
                };
                RegionalReportRow {
                    region: r.region.clone(),
                    new_infections: estimate(0),
                    expected_change: estimate(1),
                    effective_reproduction_no: estimate(2),
                    rate_of_growth: estimate(3),
                    doubling_halving_time: estimate(4),
                }
            })
            .collect();

        info!(
            "Aggregated {} of {} regions ({} failed)",
            regions.len(),
            results.len(),
            failures.len()
        );

        Self {
            table,
            regions,
            ranking,
            ledger,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_change_labels() {
        assert_eq!(ExpectedChange::from_prob_control(0.01), ExpectedChange::Increasing);
        assert_eq!(ExpectedChange::from_prob_control(0.05), ExpectedChange::LikelyIncreasing);
        assert_eq!(ExpectedChange::from_prob_control(0.5), ExpectedChange::Stable);
        assert_eq!(ExpectedChange::from_prob_control(0.6), ExpectedChange::LikelyDecreasing);
        assert_eq!(ExpectedChange::from_prob_control(0.95), ExpectedChange::Decreasing);
        assert_eq!(ExpectedChange::LikelyIncreasing.to_string(), "Likely increasing");
    }

    #[test]
    fn test_missing_prob_control_is_unknown() {
        assert_eq!(ExpectedChange::from_prob_control(f64::NAN), ExpectedChange::Unknown);
        assert_eq!(ExpectedChange::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_doubling_interval_one_sided() {
        let growth = HeadlineEstimate {
            median: 0.1,
            lower: 0.05,
            upper: 0.2,
        };
        let (doubling, halving) = doubling_interval(&growth);
        assert!(!halving);
        assert!((doubling.lower - 3.4657359027997265).abs() < 1e-12);
        assert!((doubling.upper - 13.862943611198906).abs() < 1e-12);

        let shrinking = HeadlineEstimate {
            median: -0.1,
            lower: -0.2,
            upper: -0.05,
        };
        let (halving_time, halving) = doubling_interval(&shrinking);
        assert!(halving);
        assert!((halving_time.lower - 3.4657359027997265).abs() < 1e-12);
        assert!((halving_time.upper - 13.862943611198906).abs() < 1e-12);
    }

    #[test]
    fn test_doubling_interval_contains_median_when_growth_crosses_zero() {
        let draws: Vec<f64> = (0..=70).map(|i| -0.02 + 0.001 * i as f64).collect();
        let summary = DrawSummary::from_draws(&draws, &[0.9]);
        let growth = HeadlineEstimate::from_summary(&summary, 0.9);
        assert!(growth.lower < 0.0 && growth.upper > 0.0);

        let (doubling, halving) = doubling_interval(&growth);
        assert!(!halving);
        assert!(doubling.lower <= doubling.median);
        assert!(doubling.median <= doubling.upper);
        assert_eq!(doubling.upper, f64::INFINITY);
        assert!((doubling.lower - std::f64::consts::LN_2 / growth.upper).abs() < 1e-9);
        assert!(doubling.format(1).ends_with("\u{2013}Inf)"));

        let flipped = HeadlineEstimate {
            median: -growth.median,
            lower: -growth.upper,
            upper: -growth.lower,
        };
        let (halving_time, halving) = doubling_interval(&flipped);
        assert!(halving);
        assert!(halving_time.lower <= halving_time.median);
        assert_eq!(halving_time.upper, f64::INFINITY);
    }

    #[test]
    fn test_doubling_and_halving() {
        let d = doubling_time(0.1);
        assert!((d.days - 6.931471805599453).abs() < 1e-12);
        assert!(!d.halving);

        let h = doubling_time(-0.1);
        assert!((h.days - 6.931471805599453).abs() < 1e-12);
        assert!(h.halving);
    }

    #[test]
    fn test_headline_format() {
        let estimate = HeadlineEstimate {
            median: 1.234,
            lower: 0.91,
            upper: 1.56,
        };
        assert_eq!(estimate.format(1), "1.2 (0.9\u{2013}1.6)");

        let infinite = HeadlineEstimate {
            median: 7.0,
            lower: 3.0,
            upper: f64::INFINITY,
        };
        assert_eq!(infinite.format(0), "7 (3\u{2013}Inf)");
    }
}
