//! Case-derived priors for the initial infection level and growth.

use log::debug;

use crate::algorithms::regression::log_linear_fit;

/// Observed days used for the first-window priors.
pub const PRIOR_WINDOW: usize = 7;

/// Log-scale starting level and growth rate implied by the earliest data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CasePriors {
    pub prior_infections: f64,
    pub prior_growth: f64,
}

/// Compute priors from the first `min(7, n)` observed counts.
///
/// `prior_infections` is the log of the window mean. `prior_growth` is the
/// slope of `ln(count)` on the 1-based day over the positive days, fitted
/// only with at least two such days and a seeding window longer than one
/// day. Anything non-finite falls back to 0.
pub fn first_window_priors(observed: &[u64], seeding_time: usize) -> CasePriors {
    let window: Vec<f64> = observed
        .iter()
        .take(PRIOR_WINDOW)
        .map(|c| *c as f64)
        .collect();

    let prior_infections = if window.is_empty() {
        0.0
    } else {
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let level = mean.ln();
        if level.is_finite() {
            level
        } else {
            debug!("Initial case mean {} gives no finite log level; using 0", mean);
            0.0
        }
    };

    let positive_days = window.iter().filter(|c| **c > 0.0).count();
    let prior_growth = if seeding_time > 1 && positive_days >= 2 {
        match log_linear_fit(&window) {
            Some((_, slope)) if slope.is_finite() => slope,
            _ => {
                debug!("Initial growth fit failed; using 0");
                0.0
            }
        }
    } else {
        0.0
    };

    CasePriors {
        prior_infections,
        prior_growth,
    }
}
