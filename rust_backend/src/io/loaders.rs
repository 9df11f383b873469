use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;

use crate::core::domain::CaseObservation;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Represents the source type of case data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSourceType {
    Json,
    Csv,
}

/// Result of loading a case table
#[derive(Debug)]
pub struct CaseLoadResult {
    pub rows: Vec<CaseObservation>,
    pub source_type: CaseSourceType,
    pub num_rows: usize,
    pub num_regions: usize,
}

impl CaseLoadResult {
    pub fn new(rows: Vec<CaseObservation>, source_type: CaseSourceType) -> Self {
        let num_rows = rows.len();
        let num_regions = rows
            .iter()
            .map(|r| r.region_id())
            .collect::<HashSet<_>>()
            .len();
        Self {
            rows,
            source_type,
            num_rows,
            num_regions,
        }
    }
}

/// Unified interface for loading case tables from JSON or CSV
pub struct CaseLoader;

impl CaseLoader {
    /// Load a case table from a file (auto-detects JSON or CSV)
    pub fn load_from_file(path: &Path) -> Result<CaseLoadResult> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .context("File has no extension")?;

        match extension.to_lowercase().as_str() {
            "json" => Self::load_from_json(path),
            "csv" => Self::load_from_csv(path),
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    /// Load a case table from a JSON file holding an array of rows
    pub fn load_from_json(json_path: &Path) -> Result<CaseLoadResult> {
        let content = std::fs::read_to_string(json_path)
            .with_context(|| format!("Failed to read JSON file: {}", json_path.display()))?;
        Self::load_from_json_str(&content)
    }

    /// Load a case table from a JSON string
    pub fn load_from_json_str(json_str: &str) -> Result<CaseLoadResult> {
        let rows: Vec<CaseObservation> =
            serde_json::from_str(json_str).context("Failed to parse case JSON")?;
        Ok(CaseLoadResult::new(rows, CaseSourceType::Json))
    }

    /// Load a case table from a CSV file with columns
    /// `date,confirm[,region][,breakpoint]`
    pub fn load_from_csv(csv_path: &Path) -> Result<CaseLoadResult> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(csv_path.into()))?
            .finish()
            .context("Failed to parse CSV into DataFrame")?;

        let rows = dataframe_to_rows(&df).context("Failed to convert CSV rows")?;
        Ok(CaseLoadResult::new(rows, CaseSourceType::Csv))
    }
}

/// Convert a case DataFrame to rows.
///
/// Missing `confirm` cells stay `None`; `region` and `breakpoint` columns are
/// optional.
pub fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<CaseObservation>> {
    let dates = df.column("date")?.cast(&DataType::String)?;
    let dates = dates.str()?;
    let confirm = df.column("confirm")?.cast(&DataType::Float64)?;
    let confirm = confirm.f64()?;

    let regions = match df.column("region") {
        Ok(column) => Some(column.cast(&DataType::String)?),
        Err(_) => None,
    };
    let regions = regions.as_ref().map(|c| c.str()).transpose()?;

    let breakpoints = match df.column("breakpoint") {
        Ok(column) => Some(column.cast(&DataType::Float64)?),
        Err(_) => None,
    };
    let breakpoints = breakpoints.as_ref().map(|c| c.f64()).transpose()?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let raw_date = dates
            .get(i)
            .with_context(|| format!("Row {} has no date", i + 1))?;
        let date = NaiveDate::parse_from_str(raw_date.trim(), DATE_FORMAT)
            .with_context(|| format!("Row {} has an invalid date: {}", i + 1, raw_date))?;

        rows.push(CaseObservation {
            date,
            confirm: confirm.get(i),
            region: regions.and_then(|r| r.get(i)).map(str::to_string),
            breakpoint: breakpoints
                .and_then(|b| b.get(i))
                .map(|b| u8::from(b > 0.0)),
        });
    }
    Ok(rows)
}
