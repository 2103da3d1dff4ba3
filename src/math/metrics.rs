//! Regression metrics for the hold-out evaluation.
//!
//! All functions take `(y_true, y_pred)` slices of equal length.

/// Magnitudes below this are clamped before dividing in [`safe_mape`].
pub const MAPE_FLOOR: f64 = 1e-3;

/// Mean absolute error.
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    if y_true.is_empty() {
        return 0.0;
    }
    let total: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();
    total / y_true.len() as f64
}

/// Mean absolute percentage error as a fraction.
///
/// True values with `|y| < 1e-3` are replaced by `+1e-3` before dividing, so
/// near-zero targets cannot blow the metric up.
pub fn safe_mape(y_true: &[f64], y_pred: &[f64]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    if y_true.is_empty() {
        return 0.0;
    }
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| {
            let denom = if t.abs() < MAPE_FLOOR { MAPE_FLOOR } else { t };
            ((denom - p) / denom).abs()
        })
        .sum();
    total / y_true.len() as f64
}

/// Coefficient of determination.
///
/// When the true values have zero variance (including a single sample) the
/// score is forced finite: `1.0` for a perfect fit, `0.0` otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mape_survives_near_zero_truth() {
        let mape = safe_mape(&[0.0005, 10.0], &[0.001, 11.0]);
        assert!(mape.is_finite());
        assert!(mape >= 0.0);
        // First term: |(0.001 - 0.001) / 0.001| = 0, second: 0.1.
        assert!((mape - 0.05).abs() < 1e-12);
    }

    #[test]
    fn mape_exact_zero_truth() {
        let mape = safe_mape(&[0.0], &[0.5]);
        assert!((mape - 499.0).abs() < 1e-9);
    }

    #[test]
    fn mae_basic() {
        assert!((mean_absolute_error(&[1.0, 2.0, 3.0], &[2.0, 2.0, 1.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn r2_matches_definition() {
        let y = [3.0, -0.5, 2.0, 7.0];
        let p = [2.5, 0.0, 2.0, 8.0];
        assert!((r2_score(&y, &p) - 0.948_608_137_044_967_9).abs() < 1e-12);
    }

    #[test]
    fn r2_constant_truth_is_finite() {
        assert_eq!(r2_score(&[5.0, 5.0], &[5.0, 5.0]), 1.0);
        assert_eq!(r2_score(&[5.0], &[4.0]), 0.0);
    }
}
