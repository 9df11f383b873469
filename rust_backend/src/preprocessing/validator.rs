//! Case-table validation with error and warning reporting.
//!
//! This module checks one region's raw case rows before cleaning. Errors
//! describe series that cannot support estimation at all; warnings describe
//! issues the cleaner repairs (gaps, missing counts, duplicates).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::domain::CaseObservation;
use crate::core::errors::{EstimationError, EstimationResult};

/// Validation result with categorized issues and statistics.
///
/// Errors make `is_valid` false, while warnings are informational.
///
/// # Examples
///
/// ```
/// use epi_rt::preprocessing::validator::ValidationResult;
///
/// let mut result = ValidationResult::new();
/// assert!(result.is_valid);
///
/// result.add_error("case series is empty".to_string());
/// assert!(!result.is_valid);
/// assert_eq!(result.errors.len(), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: ValidationStats,
}

/// Summary statistics computed during validation.
///
/// # Fields
///
/// * `total_rows` - Rows validated
/// * `missing_counts` - Rows without a confirmed count
/// * `negative_counts` - Rows with a negative or non-finite count
/// * `fractional_counts` - Rows with a non-integer count
/// * `duplicate_dates` - Rows repeating an earlier date
/// * `missing_dates` - Calendar days absent between the first and last date
/// * `positive_days` - Rows with a count above zero
/// * `invalid_breakpoints` - Breakpoint indicators other than 0 or 1
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub total_rows: usize,
    pub missing_counts: usize,
    pub negative_counts: usize,
    pub fractional_counts: usize,
    pub duplicate_dates: usize,
    pub missing_dates: usize,
    pub positive_days: usize,
    pub invalid_breakpoints: usize,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    /// Adds a critical error and marks the result as invalid.
    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Collapse into a `Result`, joining every error into one data error.
    pub fn into_result(self) -> EstimationResult<ValidationStats> {
        if self.is_valid {
            Ok(self.stats)
        } else {
            Err(EstimationError::data(self.errors.join("; ")))
        }
    }
}

/// Validator for raw case rows of a single region.
pub struct CaseValidator;

impl CaseValidator {
    /// Validates one region's rows.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use epi_rt::core::domain::CaseObservation;
    /// use epi_rt::preprocessing::validator::CaseValidator;
    ///
    /// let day = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
    /// let rows = vec![CaseObservation::new(day, 0.0)];
    /// let result = CaseValidator::validate_rows(&rows);
    /// assert!(!result.is_valid);
    /// ```
    pub fn validate_rows(rows: &[CaseObservation]) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.stats.total_rows = rows.len();

        if rows.is_empty() {
            result.add_error("case series is empty".to_string());
            return result;
        }

        let mut seen: HashSet<NaiveDate> = HashSet::new();
        for row in rows {
            if !seen.insert(row.date) {
                result.stats.duplicate_dates += 1;
            }
            match row.confirm {
                None => result.stats.missing_counts += 1,
                Some(c) if !c.is_finite() || c < 0.0 => result.stats.negative_counts += 1,
                Some(c) => {
                    if c.fract() != 0.0 {
                        result.stats.fractional_counts += 1;
                    }
                    if c > 0.0 {
                        result.stats.positive_days += 1;
                    }
                }
            }
            if row.breakpoint.is_some_and(|b| b > 1) {
                result.stats.invalid_breakpoints += 1;
            }
        }

        if let (Some(first), Some(last)) = (seen.iter().min(), seen.iter().max()) {
            let span = (*last - *first).num_days() as usize + 1;
            result.stats.missing_dates = span - seen.len();
        }

        let stats = result.stats.clone();
        if stats.negative_counts > 0 {
            result.add_error(format!(
                "{} rows have negative or non-finite case counts",
                stats.negative_counts
            ));
        }
        if stats.positive_days == 0 {
            result.add_error("case series has no positive counts".to_string());
        }
        if stats.missing_counts > 0 {
            result.add_warning(format!(
                "{} rows have no count and are treated as zero",
                stats.missing_counts
            ));
        }
        if stats.fractional_counts > 0 {
            result.add_warning(format!(
                "{} rows have fractional counts and will be rounded",
                stats.fractional_counts
            ));
        }
        if stats.duplicate_dates > 0 {
            result.add_warning(format!(
                "{} rows repeat an earlier date; the last row is kept",
                stats.duplicate_dates
            ));
        }
        if stats.missing_dates > 0 {
            result.add_warning(format!(
                "{} dates are missing and will be filled with zero counts",
                stats.missing_dates
            ));
        }
        if stats.invalid_breakpoints > 0 {
            result.add_warning(format!(
                "{} breakpoint indicators are above 1 and will be treated as 1",
                stats.invalid_breakpoints
            ));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, d).unwrap()
    }

    #[test]
    fn test_clean_rows_are_valid() {
        let rows: Vec<CaseObservation> =
            (1..=5).map(|d| CaseObservation::new(day(d), d as f64)).collect();
        let result = CaseValidator::validate_rows(&rows);
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
        assert_eq!(result.stats.positive_days, 5);
    }

    #[test]
    fn test_gaps_and_duplicates_are_warnings() {
        let rows = vec![
            CaseObservation::new(day(1), 1.0),
            CaseObservation::new(day(1), 2.0),
            CaseObservation::new(day(4), 3.0),
        ];
        let result = CaseValidator::validate_rows(&rows);
        assert!(result.is_valid);
        assert_eq!(result.stats.duplicate_dates, 1);
        assert_eq!(result.stats.missing_dates, 2);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_negative_count_is_an_error() {
        let rows = vec![
            CaseObservation::new(day(1), 4.0),
            CaseObservation::new(day(2), -1.0),
        ];
        let err = CaseValidator::validate_rows(&rows).into_result().unwrap_err();
        assert!(matches!(err, EstimationError::Data(_)));
    }

    #[test]
    fn test_infinite_count_is_an_error() {
        let rows = vec![
            CaseObservation::new(day(1), 4.0),
            CaseObservation::new(day(2), f64::INFINITY),
        ];
        let result = CaseValidator::validate_rows(&rows);
        assert!(!result.is_valid);
        assert_eq!(result.stats.negative_counts, 1);
        let err = result.into_result().unwrap_err();
        assert!(matches!(err, EstimationError::Data(_)));
    }

    #[test]
    fn test_empty_rows() {
        let result = CaseValidator::validate_rows(&[]);
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["case series is empty".to_string()]);
    }
}
