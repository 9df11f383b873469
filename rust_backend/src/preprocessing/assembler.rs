//! Model-input assembly.
//!
//! Settings are resolved once into a [`ModelDataAssembler`]; each region's
//! cleaned series is then turned into an immutable [`ModelInputData`] and a
//! matching [`InitialConditionGenerator`].

use std::sync::Arc;

use chrono::Datelike;
use log::{debug, info};
use toml::Table;

use super::priors::first_window_priors;
use crate::algorithms::initial_conditions::InitialConditionGenerator;
use crate::config::settings::EstimationSettings;
use crate::core::domain::{CaseSeries, DayKind};
use crate::core::errors::{EstimationError, EstimationResult};
use crate::models::delays::{DelayArrays, GenerationTimeData};
use crate::models::gp::{build_gp_data, GpConfig};
use crate::models::model_data::ModelInputData;
use crate::models::observation::{build_observation_data, ObservationData};
use crate::models::rt::{build_rt_data, RtConfig};
use crate::transformations::shifting::shifted_cases;

/// Window used to check GP overrides before any series is seen.
const GP_CHECK_WINDOW: usize = 1_000;

/// An assembled region: payload plus the initializer bound to it.
#[derive(Debug, Clone)]
pub struct AssembledModel {
    pub data: Arc<ModelInputData>,
    pub init: InitialConditionGenerator,
}

/// Resolved, region-independent settings used to assemble each region.
#[derive(Debug, Clone)]
pub struct ModelDataAssembler {
    delays: DelayArrays,
    generation_time: GenerationTimeData,
    rt: Option<RtConfig>,
    gp: Option<Table>,
    obs: ObservationData,
    horizon: usize,
}

impl ModelDataAssembler {
    /// Resolve every builder's settings.
    ///
    /// # Errors
    /// Any configuration error, before a single region is touched.
    pub fn from_settings(settings: &EstimationSettings) -> EstimationResult<Self> {
        let delays = DelayArrays::from_records(&settings.delays)?;
        let generation_time = GenerationTimeData::from_record(&settings.generation_time)?;

        let rt = match settings.rt.overrides() {
            Some(overrides) => Some(RtConfig::resolve(&overrides)?),
            None => None,
        };

        let gp = settings.gp.overrides();
        if let Some(overrides) = &gp {
            GpConfig::resolve(overrides, GP_CHECK_WINDOW)?;
        }

        let obs = build_observation_data(&settings.obs)?;

        Ok(Self {
            delays,
            generation_time,
            rt,
            gp,
            obs,
            horizon: settings.cleaning.horizon,
        })
    }

    /// Seeding days implied by the delays.
    pub fn seeding_time(&self) -> usize {
        self.delays.seeding_time()
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn delays(&self) -> &DelayArrays {
        &self.delays
    }

    /// Assemble one region.
    ///
    /// # Errors
    /// A data error when the series does not have the seeding/horizon layout
    /// this assembler expects or leaves no observed days; configuration
    /// errors from GP settings that only fail for this series' length.
    pub fn assemble(&self, series: &CaseSeries) -> EstimationResult<AssembledModel> {
        let seeding_time = self.seeding_time();
        let horizon = self.horizon;
        let t = series.len();

        if series.count_kind(DayKind::Seeding) != seeding_time
            || series.count_kind(DayKind::Forecast) != horizon
        {
            return Err(EstimationError::data(format!(
                "region {}: series must carry {} seeding and {} forecast days",
                series.region, seeding_time, horizon
            )));
        }

        let observed = series.observed_confirm();
        if observed.is_empty() {
            return Err(EstimationError::data(format!(
                "region {}: no observed days to estimate from",
                series.region
            )));
        }

        let priors = first_window_priors(&observed, seeding_time);
        let mut prior_infections = priors.prior_infections;
        let mut shifted = shifted_cases(&observed, seeding_time, horizon);

        let post_seeding = &series.days[seeding_time..];
        let breakpoints: Vec<u8> = post_seeding.iter().map(|d| d.breakpoint).collect();

        let mean_delay = self.delays.mean_delay().round() as usize;
        let rt = build_rt_data(self.rt.as_ref(), &breakpoints, mean_delay, horizon);
        let gp = build_gp_data(self.gp.as_ref(), t, seeding_time, horizon, rt.stationary_request)?;

        if self.obs.obs_scale {
            let scale = self.obs.obs_scale_mean;
            shifted.iter_mut().for_each(|v| *v /= scale);
            prior_infections -= scale.ln();
        }

        let week_length = self.obs.week_length as u32;
        let day_of_week: Vec<u32> = if week_length == 7 {
            post_seeding
                .iter()
                .map(|d| d.date.weekday().number_from_monday())
                .collect()
        } else {
            (0..post_seeding.len() as u32)
                .map(|i| i % week_length + 1)
                .collect()
        };

        let data = ModelInputData {
            region: series.region.clone(),
            t,
            seeding_time,
            horizon,
            cases: observed,
            shifted_cases: shifted,
            dates: series.dates(),
            day_of_week,
            delays: self.delays.clone(),
            generation_time: self.generation_time.clone(),
            rt,
            gp,
            obs: self.obs.clone(),
            prior_infections,
            prior_growth: priors.prior_growth,
        };
        data.validate()?;

        debug!(
            "Region {}: t={}, seeding={}, horizon={}, bp_n={}, M={}",
            series.region,
            data.t,
            data.seeding_time,
            data.horizon,
            data.rt.bp_n,
            data.gp.basis_functions
        );
        info!("Assembled model input for region {}", series.region);

        let data = Arc::new(data);
        Ok(AssembledModel {
            init: InitialConditionGenerator::new(Arc::clone(&data)),
            data,
        })
    }
}
