//! Cross-entropy loss.

use ndarray::ArrayView1;

/// Probabilities are clamped to this floor so a zero never yields infinite loss.
pub const MIN_PROBABILITY: f64 = 1e-10;

pub fn cross_entropy_loss(probabilities: ArrayView1<'_, f64>, target: usize) -> f64 {
    assert!(
        target < probabilities.len(),
        "target index {} out of range for {} probabilities",
        target,
        probabilities.len()
    );
    -probabilities[target].max(MIN_PROBABILITY).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn loss_is_negative_log_probability() {
        let p = arr1(&[0.7, 0.2, 0.1]);
        assert_abs_diff_eq!(cross_entropy_loss(p.view(), 1), -(0.2f64).ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(cross_entropy_loss(p.view(), 0), -(0.7f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn certain_prediction_has_zero_loss() {
        let p = arr1(&[0.0, 1.0]);
        assert_eq!(cross_entropy_loss(p.view(), 1), 0.0);
    }

    #[test]
    fn zero_probability_is_floored() {
        let p = arr1(&[1.0, 0.0]);
        let loss = cross_entropy_loss(p.view(), 1);
        assert!(loss.is_finite());
        assert_abs_diff_eq!(loss, -(MIN_PROBABILITY).ln(), epsilon = 1e-12);
    }

    #[test]
    fn loss_is_never_negative() {
        let p = arr1(&[0.25, 0.25, 0.5]);
        for target in 0..3 {
            assert!(cross_entropy_loss(p.view(), target) >= 0.0);
        }
    }
}
