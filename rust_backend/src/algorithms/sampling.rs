//! Scalar random draws used to build sampler starting values.

use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal};
use statrs::distribution::{ContinuousCDF, Normal as StdNormal};

/// Draw from `N(mean, sd)`; a zero or invalid `sd` returns `mean`.
pub fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    match Normal::new(mean, sd) {
        Ok(dist) if sd > 0.0 => dist.sample(rng),
        _ => mean,
    }
}

/// Draw `n` independent values from `N(mean, sd)`.
pub fn normal_vec<R: Rng + ?Sized>(rng: &mut R, n: usize, mean: f64, sd: f64) -> Vec<f64> {
    (0..n).map(|_| normal(rng, mean, sd)).collect()
}

/// Draw from a lognormal with log-scale parameters; a zero or invalid
/// `sdlog` returns `exp(meanlog)`.
pub fn lognormal<R: Rng + ?Sized>(rng: &mut R, meanlog: f64, sdlog: f64) -> f64 {
    match LogNormal::new(meanlog, sdlog) {
        Ok(dist) if sdlog > 0.0 => dist.sample(rng),
        _ => meanlog.exp(),
    }
}

/// Draw from `N(mean, sd)` truncated below at `lower`, by inverting the CDF
/// over the admissible mass.
///
/// A zero or invalid `sd` returns `max(mean, lower)`; when the admissible
/// mass underflows the draw collapses onto `lower`.
pub fn truncated_normal<R: Rng + ?Sized>(rng: &mut R, lower: f64, mean: f64, sd: f64) -> f64 {
    if sd.is_nan() || sd <= 0.0 || !sd.is_finite() || !mean.is_finite() {
        return mean.max(lower);
    }

    let std_normal = StdNormal::standard();
    let p_lower = std_normal.cdf((lower - mean) / sd);
    if p_lower >= 1.0 {
        return lower;
    }

    let u = p_lower + (1.0 - p_lower) * rng.random::<f64>();
    if u <= 0.0 || u >= 1.0 {
        return mean.max(lower);
    }
    let z = std_normal.inverse_cdf(u);
    (mean + sd * z).max(lower)
}
