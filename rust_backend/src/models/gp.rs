//! Approximate Gaussian-process structure for Rt (or infection) deviations.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::algorithms::moments::{lognormal_meanlog, lognormal_sdlog};
use crate::config::resolver::resolve_into;
use crate::core::errors::{EstimationError, EstimationResult};

/// Covariance kernel of the approximate GP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    /// Squared exponential
    Se,
    /// Matern with order fixed at 3/2
    #[serde(alias = "matern_3/2")]
    Matern,
}

impl Kernel {
    /// Integer code handed to the model.
    pub fn code(self) -> u8 {
        match self {
            Kernel::Se => 0,
            Kernel::Matern => 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct GpSettings {
    basis_prop: f64,
    boundary_scale: f64,
    ls_mean: f64,
    #[serde(default)]
    ls_sd: Option<f64>,
    ls_min: f64,
    ls_max: f64,
    alpha_sd: f64,
    kernel: Kernel,
    stationary: bool,
}

/// Resolved GP settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpConfig {
    pub basis_prop: f64,
    pub boundary_scale: f64,
    pub ls_mean: f64,
    pub ls_sd: f64,
    pub ls_min: f64,
    pub ls_max: f64,
    pub alpha_sd: f64,
    pub kernel: Kernel,
    pub stationary: bool,
}

impl GpConfig {
    /// Defaults for an estimation window of `time` days.
    ///
    /// `ls_sd` is left out: it follows whichever `ls_mean` is resolved.
    pub fn defaults(time: usize) -> Table {
        let time = time as f64;
        let mut table = Table::new();
        table.insert("basis_prop".into(), Value::Float(0.3));
        table.insert("boundary_scale".into(), Value::Float(2.0));
        table.insert("ls_mean".into(), Value::Float(time.min(21.0)));
        table.insert("ls_min".into(), Value::Float(3.0));
        table.insert("ls_max".into(), Value::Float(time.min(63.0)));
        table.insert("alpha_sd".into(), Value::Float(0.1));
        table.insert("kernel".into(), Value::String("matern".into()));
        table.insert("stationary".into(), Value::Boolean(false));
        table
    }

    /// Resolve overrides for an estimation window of `time` days.
    ///
    /// # Errors
    /// Configuration errors for inconsistent length-scale bounds or
    /// out-of-range parameters; a data error when the window is shorter than
    /// the minimum length scale.
    pub fn resolve(overrides: &Table, time: usize) -> EstimationResult<Self> {
        let settings: GpSettings = resolve_into(&Self::defaults(time), overrides)?;

        let config = GpConfig {
            basis_prop: settings.basis_prop,
            boundary_scale: settings.boundary_scale,
            ls_mean: settings.ls_mean,
            ls_sd: settings.ls_sd.unwrap_or(settings.ls_mean / 3.0),
            ls_min: settings.ls_min,
            ls_max: settings.ls_max.min(time as f64),
            alpha_sd: settings.alpha_sd,
            kernel: settings.kernel,
            stationary: settings.stationary,
        };

        if (time as f64) < config.ls_min {
            return Err(EstimationError::data(format!(
                "estimation window of {} days is shorter than the minimum GP length scale ({})",
                time, config.ls_min
            )));
        }
        // Settings valid for longer windows fail only the short region
        if config.ls_mean > time as f64 {
            return Err(EstimationError::data(format!(
                "estimation window of {} days is shorter than the mean GP length scale ({})",
                time, config.ls_mean
            )));
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> EstimationResult<()> {
        if !(self.ls_min <= self.ls_mean && self.ls_mean <= self.ls_max) {
            return Err(EstimationError::config(format!(
                "GP length scale must satisfy ls_min <= ls_mean <= ls_max; got {} <= {} <= {}",
                self.ls_min, self.ls_mean, self.ls_max
            )));
        }
        if !is_positive(self.ls_sd) {
            return Err(EstimationError::config(format!(
                "GP ls_sd must be positive; got {}",
                self.ls_sd
            )));
        }
        if !is_positive(self.alpha_sd) {
            return Err(EstimationError::config(format!(
                "GP alpha_sd must be positive; got {}",
                self.alpha_sd
            )));
        }
        if !is_positive(self.basis_prop) || self.basis_prop > 1.0 {
            return Err(EstimationError::config(format!(
                "GP basis_prop must lie in (0, 1]; got {}",
                self.basis_prop
            )));
        }
        if !is_positive(self.boundary_scale) {
            return Err(EstimationError::config(format!(
                "GP boundary_scale must be positive; got {}",
                self.boundary_scale
            )));
        }
        Ok(())
    }

    /// Number of basis functions for a window of `time` days.
    pub fn basis_functions(&self, time: usize) -> usize {
        ((time as f64 * self.basis_prop).ceil() as usize).max(1)
    }
}

fn is_positive(value: f64) -> bool {
    value > 0.0 && value.is_finite()
}

/// Numeric GP fields of the model payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpData {
    pub ls_meanlog: f64,
    pub ls_sdlog: f64,
    pub ls_min: f64,
    pub ls_max: f64,
    pub alpha_sd: f64,
    #[serde(rename = "M")]
    pub basis_functions: usize,
    #[serde(rename = "L")]
    pub boundary_scale: f64,
    #[serde(rename = "gp_type")]
    pub kernel_code: u8,
    #[serde(with = "super::flag")]
    pub fixed: bool,
    #[serde(with = "super::flag")]
    pub stationary: bool,
}

impl GpData {
    /// Payload for a model without a GP.
    pub fn disabled() -> Self {
        Self {
            ls_meanlog: 0.0,
            ls_sdlog: 0.0,
            ls_min: 0.0,
            ls_max: 0.0,
            alpha_sd: 0.0,
            basis_functions: 0,
            boundary_scale: 0.0,
            kernel_code: 0,
            fixed: true,
            stationary: true,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.fixed
    }
}

/// Build the GP payload fields.
///
/// # Arguments
/// * `overrides` - User settings, or `None` when the GP is disabled
/// * `total_time` - Length of the full series including seeding and horizon
/// * `seeding_time` - Seeding days at the start of the series
/// * `horizon` - Forecast days at the end of the series
/// * `stationary_request` - Set when Rt deviations are taken around R0
pub fn build_gp_data(
    overrides: Option<&Table>,
    total_time: usize,
    seeding_time: usize,
    horizon: usize,
    stationary_request: bool,
) -> EstimationResult<GpData> {
    let overrides = match overrides {
        Some(overrides) => overrides,
        None => return Ok(GpData::disabled()),
    };

    let time = total_time.saturating_sub(seeding_time + horizon);
    let config = GpConfig::resolve(overrides, time)?;

    if config.kernel == Kernel::Se {
        warn!("Squared exponential GP kernel requested; the Matern 3/2 kernel is better tested");
    }

    let data = GpData {
        ls_meanlog: lognormal_meanlog(config.ls_mean, config.ls_sd),
        ls_sdlog: lognormal_sdlog(config.ls_mean, config.ls_sd),
        ls_min: config.ls_min,
        ls_max: config.ls_max,
        alpha_sd: config.alpha_sd,
        basis_functions: config.basis_functions(time),
        boundary_scale: config.boundary_scale,
        kernel_code: config.kernel.code(),
        fixed: false,
        stationary: config.stationary || stationary_request,
    };
    debug!(
        "GP resolved over {} days: M={}, ls in [{}, {}]",
        time, data.basis_functions, data.ls_min, data.ls_max
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(src: &str) -> Table {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn test_defaults_scale_with_window() {
        let config = GpConfig::resolve(&Table::new(), 100).unwrap();
        assert_eq!(config.ls_mean, 21.0);
        assert_eq!(config.ls_sd, 7.0);
        assert_eq!(config.ls_max, 63.0);
        assert_eq!(config.kernel, Kernel::Matern);

        let config = GpConfig::resolve(&Table::new(), 10).unwrap();
        assert_eq!(config.ls_mean, 10.0);
        assert_eq!(config.ls_max, 10.0);
    }

    #[test]
    fn test_ls_sd_follows_overridden_mean() {
        let config = GpConfig::resolve(&table("ls_mean = 30.0"), 100).unwrap();
        assert_eq!(config.ls_sd, 10.0);

        let config = GpConfig::resolve(&table("ls_mean = 30.0\nls_sd = 2.0"), 100).unwrap();
        assert_eq!(config.ls_sd, 2.0);
    }

    #[test]
    fn test_ls_max_clamped_to_window() {
        let config = GpConfig::resolve(&table("ls_max = 500.0"), 40).unwrap();
        assert_eq!(config.ls_max, 40.0);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let err = GpConfig::resolve(&table("ls_mean = 2.0"), 100).unwrap_err();
        assert!(err.is_configuration());

        let err = GpConfig::resolve(&table("basis_prop = 1.5"), 100).unwrap_err();
        assert!(err.is_configuration());

        let err = GpConfig::resolve(&table("alpha_sd = 0.0"), 100).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_short_window_is_a_data_error() {
        let err = GpConfig::resolve(&Table::new(), 2).unwrap_err();
        assert!(matches!(err, EstimationError::Data(_)));
    }

    #[test]
    fn test_window_shorter_than_ls_mean_is_a_data_error() {
        let overrides = table("ls_mean = 14.0");
        assert!(GpConfig::resolve(&overrides, 1000).is_ok());
        assert_eq!(GpConfig::resolve(&overrides, 14).unwrap().ls_max, 14.0);

        let err = GpConfig::resolve(&overrides, 9).unwrap_err();
        assert!(matches!(err, EstimationError::Data(_)));

        // Bounds that contradict each other stay a settings problem
        let err = GpConfig::resolve(&table("ls_mean = 14.0\nls_max = 10.0"), 1000).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_kernel_rejected() {
        let err = GpConfig::resolve(&table("kernel = 'periodic'"), 100).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_kernel_codes() {
        let data = build_gp_data(Some(&table("kernel = 'se'")), 60, 5, 5, false).unwrap();
        assert_eq!(data.kernel_code, 0);
        let data = build_gp_data(Some(&table("kernel = 'matern_3/2'")), 60, 5, 5, false).unwrap();
        assert_eq!(data.kernel_code, 1);
    }

    #[test]
    fn test_basis_functions_and_moments() {
        let data = build_gp_data(Some(&Table::new()), 110, 5, 5, false).unwrap();
        assert_eq!(data.basis_functions, 30);
        assert!((data.ls_meanlog - (21.0f64.powi(2) / (49.0f64 + 441.0).sqrt()).ln()).abs() < 1e-12);
        assert!(!data.fixed);
        assert!(!data.stationary);
    }

    #[test]
    fn test_disabled_gp() {
        let data = build_gp_data(None, 60, 5, 5, false).unwrap();
        assert!(data.fixed);
        assert!(data.stationary);
        assert!(!data.is_active());
    }

    #[test]
    fn test_stationary_request_forces_flag() {
        let data = build_gp_data(Some(&Table::new()), 60, 5, 5, true).unwrap();
        assert!(data.stationary);
    }
}
