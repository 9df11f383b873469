//! Log-linear trend fitting for short case windows.

/// Ordinary least squares of `y` on `x`, returning `(intercept, slope)`.
///
/// Returns `None` with fewer than two points, mismatched lengths, a constant
/// `x`, or non-finite input.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum();

    let slope = sxy / sxx;
    Some((mean_y - slope * mean_x, slope))
}

/// Fit `ln(y) ~ t` over the positive entries of `values`, with `t` the
/// 1-based position in `values`.
pub fn log_linear_fit(values: &[f64]) -> Option<(f64, f64)> {
    let (t, log_y): (Vec<f64>, Vec<f64>) = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > 0.0 && v.is_finite())
        .map(|(i, v)| ((i + 1) as f64, v.ln()))
        .unzip();
    linear_fit(&t, &log_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_fit_exact_line() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        let (intercept, slope) = linear_fit(&x, &y).unwrap();
        assert!((intercept - 1.0).abs() < 1e-12);
        assert!((slope - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_log_linear_recovers_growth() {
        let values: Vec<f64> = (1..=7).map(|t| 10.0 * (0.1 * t as f64).exp()).collect();
        let (_, slope) = log_linear_fit(&values).unwrap();
        assert!((slope - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_log_linear_skips_zeros_but_keeps_positions() {
        let values = [0.0, 2.0, 0.0, 8.0];
        let (_, slope) = log_linear_fit(&values).unwrap();
        // points (2, ln 2) and (4, ln 8)
        assert!((slope - (8f64.ln() - 2f64.ln()) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_windows() {
        assert!(log_linear_fit(&[0.0, 0.0, 0.0]).is_none());
        assert!(log_linear_fit(&[5.0]).is_none());
        assert!(linear_fit(&[1.0, 1.0], &[2.0, 3.0]).is_none());
    }
}
