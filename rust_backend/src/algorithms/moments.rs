//! Lognormal moment matching.
//!
//! Priors are specified on the natural scale (mean and sd of a positive
//! quantity) but sampled on the log scale. These conversions must match the
//! downstream model's priors exactly.

/// Log-scale location of a lognormal with natural-scale `mean` and `sd`.
///
/// `ln(m² / sqrt(s² + m²))`
pub fn lognormal_meanlog(mean: f64, sd: f64) -> f64 {
    (mean * mean / (sd * sd + mean * mean).sqrt()).ln()
}

/// Log-scale spread of a lognormal with natural-scale `mean` and `sd`.
///
/// `sqrt(ln(1 + s²/m²))`
pub fn lognormal_sdlog(mean: f64, sd: f64) -> f64 {
    (1.0 + (sd * sd) / (mean * mean)).ln().sqrt()
}

/// Natural-scale mean and sd of a lognormal with the given log parameters.
pub fn lognormal_moments(meanlog: f64, sdlog: f64) -> (f64, f64) {
    let var_log = sdlog * sdlog;
    let mean = (meanlog + var_log / 2.0).exp();
    let sd = ((var_log.exp() - 1.0) * (2.0 * meanlog + var_log).exp()).sqrt();
    (mean, sd)
}

/// Round to `digits` significant figures.
pub fn signif(value: f64, digits: i32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let shift = digits - 1 - magnitude;
    if shift >= 0 {
        let factor = 10f64.powi(shift);
        (value * factor).round() / factor
    } else {
        let factor = 10f64.powi(-shift);
        (value / factor).round() * factor
    }
}
