//! Sampler starting values consistent with an assembled payload.
//!
//! Each draw perturbs the priors slightly (one tenth of the prior spread) so
//! that chains start in a plausible region without starting at the same point.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::moments::{lognormal_meanlog, lognormal_sdlog};
use super::sampling::{lognormal, normal, normal_vec, truncated_normal};
use crate::models::model_data::ModelInputData;

const INIT_SPREAD: f64 = 0.1;
const LS_MARGIN: f64 = 0.001;

/// One set of starting values. Absent features leave their fields empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InitialValues {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub delay_mean: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub delay_sd: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub eta: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rho: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub alpha: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rep_phi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub initial_infections: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub initial_growth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub initial_r: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gt_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gt_sd: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub bp_effects: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bp_sd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub frac_obs: Option<f64>,
}

/// Stochastic factory bound to one region's payload.
///
/// Draws share no state; calling [`InitialConditionGenerator::draw`] from
/// several chains at once is fine.
#[derive(Debug, Clone)]
pub struct InitialConditionGenerator {
    data: Arc<ModelInputData>,
}

impl InitialConditionGenerator {
    pub fn new(data: Arc<ModelInputData>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &ModelInputData {
        &self.data
    }

    /// Draw one set of starting values from the thread-local generator.
    pub fn draw(&self) -> InitialValues {
        self.draw_with(&mut rand::rng())
    }

    /// Draw one set of starting values from `rng`.
    pub fn draw_with<R: Rng + ?Sized>(&self, rng: &mut R) -> InitialValues {
        let data = &self.data;
        let mut init = InitialValues::default();

        let delays = &data.delays;
        init.delay_mean = (0..delays.count)
            .map(|i| truncated_normal(rng, 0.0, delays.mean_mean[i], INIT_SPREAD * delays.mean_sd[i]))
            .collect();
        init.delay_sd = (0..delays.count)
            .map(|i| truncated_normal(rng, 0.0, delays.sd_mean[i], INIT_SPREAD * delays.sd_sd[i]))
            .collect();

        let gp = &data.gp;
        if gp.is_active() {
            init.eta = normal_vec(rng, gp.basis_functions, 0.0, INIT_SPREAD);

            let mut rho = lognormal(rng, gp.ls_meanlog, INIT_SPREAD * gp.ls_sdlog);
            if rho <= gp.ls_min {
                rho = gp.ls_min + LS_MARGIN;
            } else if rho >= gp.ls_max {
                rho = gp.ls_max - LS_MARGIN;
            }
            init.rho = Some(rho);
            init.alpha = Some(truncated_normal(rng, 0.0, 0.0, gp.alpha_sd));
        }

        if data.obs.is_negbin() {
            init.rep_phi = Some(truncated_normal(rng, 0.0, 0.0, 1.0));
        }

        let rt = &data.rt;
        if rt.estimate_r {
            init.initial_infections = Some(normal(rng, data.prior_infections, 0.2));
            if data.seeding_time > 1 {
                init.initial_growth = Some(normal(rng, data.prior_growth, 0.1));
            }
            init.initial_r = Some(lognormal(
                rng,
                lognormal_meanlog(rt.r_mean, rt.r_sd),
                INIT_SPREAD * lognormal_sdlog(rt.r_mean, rt.r_sd),
            ));

            let gt = &data.generation_time;
            init.gt_mean = Some(truncated_normal(rng, 0.0, gt.gt_mean_mean, INIT_SPREAD * gt.gt_mean_sd));
            init.gt_sd = Some(truncated_normal(rng, 0.0, gt.gt_sd_mean, INIT_SPREAD * gt.gt_sd_sd));

            if rt.bp_n > 0 {
                init.bp_effects = normal_vec(rng, rt.bp_n, 0.0, 0.1);
                init.bp_sd = Some(truncated_normal(rng, 0.0, 0.0, 0.1));
            }
        }

        if data.obs.obs_scale {
            init.frac_obs = Some(truncated_normal(
                rng,
                0.0,
                data.obs.obs_scale_mean,
                INIT_SPREAD * data.obs.obs_scale_sd,
            ));
        }

        init
    }
}
