//! End-to-end regional estimation pipeline.
//!
//! Splits a multi-region case table, validates, cleans and assembles every
//! region, then runs the orchestrator and aggregates the results.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc;

use crate::config::settings::EstimationSettings;
use crate::core::domain::{split_by_region, CaseObservation, RegionId};
use crate::core::errors::EstimationResult;
use crate::models::sampler::SamplerArgs;
use crate::preprocessing::assembler::{AssembledModel, ModelDataAssembler};
use crate::preprocessing::validator::CaseValidator;
use crate::services::inference::InferenceEngine;
use crate::services::orchestrator::{
    OrchestratorConfig, RegionEvent, RegionJob, RegionResult, RegionalOrchestrator,
};
use crate::services::report::AggregateSummary;
use crate::services::summary::SummaryOptions;
use crate::transformations::cleaning::CaseCleaner;

/// Result of one estimation call
pub struct EstimationOutput {
    /// One entry per region, in input order
    pub results: Vec<RegionResult>,
    pub summary: AggregateSummary,
}

/// Main regional pipeline
pub struct RegionalPipeline {
    settings: EstimationSettings,
    engine: Arc<dyn InferenceEngine>,
    events: Option<mpsc::UnboundedSender<RegionEvent>>,
}

impl RegionalPipeline {
    pub fn new(settings: EstimationSettings, engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            settings,
            engine,
            events: None,
        }
    }

    /// Forward orchestrator progress events to `sender`.
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<RegionEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn settings(&self) -> &EstimationSettings {
        &self.settings
    }

    /// Validate, clean and assemble every region.
    ///
    /// # Returns
    /// One job per region in order of first appearance. Regions whose data
    /// cannot be used carry their error and will be recorded as failed.
    ///
    /// # Errors
    /// Any configuration error, before inference starts for any region.
    pub fn prepare(&self, rows: &[CaseObservation]) -> EstimationResult<Vec<RegionJob>> {
        let assembler = ModelDataAssembler::from_settings(&self.settings)?;
        let cleaner = CaseCleaner::new(&self.settings.cleaning);

        let mut jobs = Vec::new();
        for (region, region_rows) in split_by_region(rows) {
            let model = self.prepare_region(&assembler, &cleaner, &region, &region_rows);
            match model {
                Err(e) if e.is_configuration() => return Err(e),
                model => jobs.push(RegionJob { region, model }),
            }
        }
        info!("Prepared {} regions", jobs.len());
        Ok(jobs)
    }

    fn prepare_region(
        &self,
        assembler: &ModelDataAssembler,
        cleaner: &CaseCleaner,
        region: &RegionId,
        rows: &[CaseObservation],
    ) -> EstimationResult<AssembledModel> {
        let validation = CaseValidator::validate_rows(rows);
        for warning in &validation.warnings {
            warn!("Region {}: {}", region, warning);
        }
        validation.into_result()?;

        let series = cleaner.clean_and_pad(
            region.clone(),
            rows,
            assembler.seeding_time(),
            assembler.horizon(),
        )?;
        assembler.assemble(&series)
    }

    /// Run the whole estimation.
    ///
    /// # Errors
    /// Configuration errors only; region-level problems are recorded in the
    /// returned ledger.
    pub async fn run(&self, rows: &[CaseObservation]) -> EstimationResult<EstimationOutput> {
        let args = SamplerArgs::resolve(&self.settings.sampler)?;
        let jobs = self.prepare(rows)?;

        let config = OrchestratorConfig {
            concurrency: self.settings.orchestration.concurrency,
            timeout: args.timeout(),
            summary: SummaryOptions {
                credible_intervals: self.settings.summary.credible_intervals.clone(),
                ranking_window: self.settings.summary.ranking_window,
            },
        };

        let mut orchestrator = RegionalOrchestrator::new(Arc::clone(&self.engine), args, config);
        if let Some(sender) = &self.events {
            orchestrator = orchestrator.with_progress(sender.clone());
        }

        let results = orchestrator.run(jobs).await;
        let summary = AggregateSummary::from_results(&results);
        Ok(EstimationOutput { results, summary })
    }
}
