//! Domain models for reported case series.
//!
//! This module provides the row type consumed from case tables and the
//! per-region daily series the builders operate on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a geographic region.
///
/// Single-region inputs (rows without a region label) are grouped under
/// [`RegionId::default_region`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Region used for rows that carry no region label.
    pub fn default_region() -> Self {
        Self("national".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single row of a reported case table.
///
/// # Fields
///
/// * `date` - Report date
/// * `confirm` - Confirmed case count; `None` when missing (treated as 0)
/// * `region` - Optional region label
/// * `breakpoint` - Optional 0/1 indicator of a structural change in Rt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseObservation {
    pub date: NaiveDate,
    #[serde(default)]
    pub confirm: Option<f64>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub breakpoint: Option<u8>,
}

impl CaseObservation {
    pub fn new(date: NaiveDate, confirm: f64) -> Self {
        Self {
            date,
            confirm: Some(confirm),
            region: None,
            breakpoint: None,
        }
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn with_breakpoint(mut self, breakpoint: u8) -> Self {
        self.breakpoint = Some(breakpoint);
        self
    }

    /// Region this row belongs to.
    pub fn region_id(&self) -> RegionId {
        self.region
            .as_deref()
            .map(RegionId::from)
            .unwrap_or_else(RegionId::default_region)
    }
}

/// Kind of day in an assembled daily series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    /// Zero-case day prepended so infections can precede the first report
    Seeding,
    /// Day with (possibly imputed) reported data
    Observed,
    /// Future day with no data
    Forecast,
}

/// One day of a cleaned, gap-free series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCases {
    pub date: NaiveDate,
    pub confirm: u64,
    pub breakpoint: u8,
    pub kind: DayKind,
}

/// Cleaned daily series for one region.
///
/// Layout is `[seeding days | observed days | forecast days]` with one row per
/// calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSeries {
    pub region: RegionId,
    pub days: Vec<DailyCases>,
}

impl CaseSeries {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.days.iter().map(|d| d.date).collect()
    }

    pub fn count_kind(&self, kind: DayKind) -> usize {
        self.days.iter().filter(|d| d.kind == kind).count()
    }

    /// Confirmed counts of the observed days only.
    pub fn observed_confirm(&self) -> Vec<u64> {
        self.days
            .iter()
            .filter(|d| d.kind == DayKind::Observed)
            .map(|d| d.confirm)
            .collect()
    }
}

/// Split a multi-region case table into per-region row sets.
///
/// Regions are returned in order of first appearance so that downstream
/// output follows the caller's table.
pub fn split_by_region(rows: &[CaseObservation]) -> Vec<(RegionId, Vec<CaseObservation>)> {
    let mut order: Vec<RegionId> = Vec::new();
    let mut grouped: BTreeMap<RegionId, Vec<CaseObservation>> = BTreeMap::new();

    for row in rows {
        let region = row.region_id();
        if !grouped.contains_key(&region) {
            order.push(region.clone());
        }
        grouped.entry(region).or_default().push(row.clone());
    }

    order
        .into_iter()
        .map(|region| {
            let rows = grouped.remove(&region).unwrap_or_default();
            (region, rows)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    #[test]
    fn test_region_id_defaults() {
        let row = CaseObservation::new(day(1), 5.0);
        assert_eq!(row.region_id(), RegionId::default_region());

        let row = row.with_region("north");
        assert_eq!(row.region_id().as_str(), "north");
    }

    #[test]
    fn test_split_by_region_keeps_first_appearance_order() {
        let rows = vec![
            CaseObservation::new(day(1), 1.0).with_region("b"),
            CaseObservation::new(day(1), 2.0).with_region("a"),
            CaseObservation::new(day(2), 3.0).with_region("b"),
        ];

        let split = split_by_region(&rows);
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].0.as_str(), "b");
        assert_eq!(split[0].1.len(), 2);
        assert_eq!(split[1].0.as_str(), "a");
    }
}
