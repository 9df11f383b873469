//! Case-series cleaning.
//!
//! Turns the raw rows for one region into a gap-free daily series:
//! missing dates are filled with zero counts, suspicious zeros can be
//! imputed from the preceding week, leading zeros are dropped, and the
//! seeding window and forecast horizon are added around the observed days.

use chrono::{Duration, NaiveDate};
use log::{debug, warn};
use std::collections::BTreeMap;

use crate::config::settings::CleaningSettings;
use crate::core::domain::{CaseObservation, CaseSeries, DailyCases, DayKind, RegionId};
use crate::core::errors::{EstimationError, EstimationResult};

/// Days in the trailing window used for zero imputation.
pub const IMPUTATION_WINDOW: usize = 7;

/// Cleans one region's case rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseCleaner {
    pub zero_threshold: Option<f64>,
    pub filter_leading_zeros: bool,
}

impl Default for CaseCleaner {
    fn default() -> Self {
        Self::new(&CleaningSettings::default())
    }
}

impl CaseCleaner {
    pub fn new(settings: &CleaningSettings) -> Self {
        Self {
            zero_threshold: settings.zero_threshold,
            filter_leading_zeros: settings.filter_leading_zeros,
        }
    }

    /// Clean rows into observed days only (no seeding or horizon).
    ///
    /// # Errors
    /// A data error when there are no rows, a count is negative, or no day
    /// has a positive count.
    pub fn clean(&self, rows: &[CaseObservation]) -> EstimationResult<Vec<DailyCases>> {
        let mut days = complete_dates(rows)?;

        if let Some(threshold) = self.zero_threshold {
            let imputed = impute_zeros(&mut days, threshold);
            if imputed > 0 {
                debug!("Imputed {} zero counts above threshold {}", imputed, threshold);
            }
        }

        let first_positive = days
            .iter()
            .position(|d| d.confirm > 0)
            .ok_or_else(|| EstimationError::data("case series has no positive counts"))?;

        if self.filter_leading_zeros && first_positive > 0 {
            debug!("Dropping {} leading zero days", first_positive);
            days.drain(..first_positive);
        }
        Ok(days)
    }

    /// Clean rows and lay them out as `[seeding | observed | horizon]`.
    pub fn clean_and_pad(
        &self,
        region: RegionId,
        rows: &[CaseObservation],
        seeding_time: usize,
        horizon: usize,
    ) -> EstimationResult<CaseSeries> {
        let observed = self.clean(rows)?;
        Ok(pad_series(region, observed, seeding_time, horizon))
    }
}

/// Sort rows by date and fill every missing calendar day with a zero count.
///
/// Duplicate dates keep the last row. Missing counts become 0, fractional
/// counts are rounded, and breakpoint indicators are normalized to 0/1.
pub fn complete_dates(rows: &[CaseObservation]) -> EstimationResult<Vec<DailyCases>> {
    let mut by_date: BTreeMap<NaiveDate, (f64, u8)> = BTreeMap::new();
    for row in rows {
        let confirm = row.confirm.unwrap_or(0.0);
        if !confirm.is_finite() || confirm < 0.0 {
            return Err(EstimationError::data(format!(
                "invalid case count {} on {}",
                confirm, row.date
            )));
        }
        let breakpoint = u8::from(row.breakpoint.unwrap_or(0) > 0);
        if by_date.insert(row.date, (confirm, breakpoint)).is_some() {
            warn!("Duplicate case row for {}; keeping the last", row.date);
        }
    }

    let (first, last) = match (by_date.keys().next(), by_date.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(EstimationError::data("case series is empty")),
    };

    let mut days = Vec::new();
    let mut date = first;
    while date <= last {
        let (confirm, breakpoint) = by_date.get(&date).copied().unwrap_or((0.0, 0));
        days.push(DailyCases {
            date,
            confirm: confirm.round() as u64,
            breakpoint,
            kind: DayKind::Observed,
        });
        date += Duration::days(1);
    }

    let filled = days.len() - by_date.len();
    if filled > 0 {
        debug!("Filled {} missing dates with zero counts", filled);
    }
    Ok(days)
}

/// Replace zero counts whose preceding 7-day mean exceeds `threshold` with
/// that mean, rounded. Means are taken over the unimputed counts.
///
/// Returns the number of imputed days.
pub fn impute_zeros(days: &mut [DailyCases], threshold: f64) -> usize {
    let original: Vec<u64> = days.iter().map(|d| d.confirm).collect();
    let mut imputed = 0;

    for i in IMPUTATION_WINDOW..days.len() {
        if original[i] != 0 {
            continue;
        }
        let window = &original[i - IMPUTATION_WINDOW..i];
        let mean = window.iter().sum::<u64>() as f64 / IMPUTATION_WINDOW as f64;
        if mean > threshold {
            days[i].confirm = mean.round() as u64;
            imputed += 1;
        }
    }
    imputed
}

/// Prepend `seeding_time` zero days and append `horizon` forecast days.
pub fn pad_series(
    region: RegionId,
    observed: Vec<DailyCases>,
    seeding_time: usize,
    horizon: usize,
) -> CaseSeries {
    let (first, last) = match (observed.first(), observed.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => {
            return CaseSeries {
                region,
                days: Vec::new(),
            }
        }
    };

    let mut days = Vec::with_capacity(seeding_time + observed.len() + horizon);
    days.extend((1..=seeding_time).rev().map(|k| DailyCases {
        date: first - Duration::days(k as i64),
        confirm: 0,
        breakpoint: 0,
        kind: DayKind::Seeding,
    }));
    days.extend(observed);
    days.extend((1..=horizon).map(|k| DailyCases {
        date: last + Duration::days(k as i64),
        confirm: 0,
        breakpoint: 0,
        kind: DayKind::Forecast,
    }));

    CaseSeries { region, days }
}
