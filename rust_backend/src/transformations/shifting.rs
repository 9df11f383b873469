//! Delay-shifted infection proxy.
//!
//! Reports lag infections by roughly the mean delay. Leading the smoothed
//! report series by `seeding_time` days gives a crude infection curve that
//! seeds the back-calculation prior. The final days, which have no reports
//! that far ahead, are extrapolated with a log-linear trend.

use log::debug;

use crate::algorithms::regression::log_linear_fit;

/// Trailing window of the rolling mean.
pub const SMOOTHING_WINDOW: usize = 7;

/// Trailing rolling mean with a partial window at the start.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        let n = (i + 1).min(window);
        out.push(sum / n as f64);
    }
    out
}

/// Build the shifted case series over the post-seeding time index.
///
/// Entry `j` is the smoothed report count `seeding_time` days after day `j`
/// of the observed window, with zeros mapped to 1. The output has
/// `observed.len() + horizon` entries.
pub fn shifted_cases(observed: &[u64], seeding_time: usize, horizon: usize) -> Vec<f64> {
    let len = observed.len() + horizon;
    if observed.is_empty() {
        return vec![1.0; len];
    }

    let counts: Vec<f64> = observed.iter().map(|c| *c as f64).collect();
    let smoothed: Vec<f64> = rolling_mean(&counts, SMOOTHING_WINDOW)
        .into_iter()
        .map(|v| if v == 0.0 { 1.0 } else { v })
        .collect();

    let mut shifted: Vec<f64> = smoothed.iter().skip(seeding_time).copied().take(len).collect();
    let known = shifted.len();
    if known == len {
        return shifted;
    }

    let tail_start = smoothed.len().saturating_sub(SMOOTHING_WINDOW);
    let tail = &smoothed[tail_start..];
    let fallback = smoothed[smoothed.len() - 1];

    match log_linear_fit(tail) {
        Some((intercept, slope)) if intercept.is_finite() && slope.is_finite() => {
            debug!(
                "Extrapolating {} shifted-case days with log-linear slope {:.4}",
                len - known,
                slope
            );
            // Positions continue after the fitted tail
            let base = tail.len() + seeding_time.saturating_sub(smoothed.len());
            for k in 0..len - known {
                let x = (base + k + 1) as f64;
                let value = (intercept + slope * x).exp();
                shifted.push(if value.is_finite() { value.max(1.0) } else { fallback });
            }
        }
        _ => {
            debug!("Log-linear extrapolation failed; carrying the last value forward");
            shifted.resize(len, fallback);
        }
    }
    shifted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_mean_partial_window() {
        let out = rolling_mean(&[2.0, 4.0, 6.0, 8.0], 2);
        assert_eq!(out, vec![2.0, 3.0, 5.0, 7.0]);

        let out = rolling_mean(&[7.0; 10], 7);
        assert!(out.iter().all(|v| (*v - 7.0).abs() < 1e-12));
    }

    #[test]
    fn test_length_covers_observed_and_horizon() {
        let observed: Vec<u64> = (1..=20).collect();
        assert_eq!(shifted_cases(&observed, 3, 5).len(), 25);
        assert_eq!(shifted_cases(&observed, 1, 0).len(), 20);
    }

    #[test]
    fn test_leads_by_seeding_time() {
        let observed = vec![10u64; 20];
        let shifted = shifted_cases(&observed, 4, 0);
        assert!(shifted.iter().all(|v| (*v - 10.0).abs() < 1e-9));
    }

    #[test]
    fn test_zeros_map_to_one() {
        let observed = vec![0u64, 0, 0, 0, 0, 0, 0, 0, 5];
        let shifted = shifted_cases(&observed, 1, 0);
        assert_eq!(shifted[0], 1.0);
    }

    #[test]
    fn test_growth_extrapolated() {
        let observed: Vec<u64> = (0..30).map(|t| (10.0 * (0.1 * t as f64).exp()) as u64).collect();
        let shifted = shifted_cases(&observed, 5, 7);
        let n = shifted.len();
        assert!(shifted[n - 1] > shifted[n - 8]);
        assert!(shifted.iter().all(|v| v.is_finite() && *v >= 1.0));
    }

    #[test]
    fn test_flat_tail_carried_forward() {
        let observed = vec![5u64; 10];
        let shifted = shifted_cases(&observed, 2, 3);
        assert!(shifted.iter().all(|v| (*v - 5.0).abs() < 1e-9));
    }
}
