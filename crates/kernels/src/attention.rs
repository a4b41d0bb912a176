//! Scaled dot-product attention with an optional causal mask.

use crate::utils::softmax_rows_inplace;
use ndarray::{Array2, ArrayView2, ArrayViewMut2};

/// Pre-softmax score assigned to positions a query may not attend to.
pub const MASKED_SCORE: f64 = -1e9;

#[derive(Debug, Clone)]
pub struct AttentionOutput {
    /// Post-softmax weights, `[seq_len x seq_len]`.
    pub scores: Array2<f64>,
    /// Weighted value sum, `[seq_len x value_dim]`.
    pub output: Array2<f64>,
}

/// Overwrites every score above the diagonal (key after query) with [`MASKED_SCORE`].
pub fn causal_mask_inplace(mut scores: ArrayViewMut2<'_, f64>) {
    for ((row, col), score) in scores.indexed_iter_mut() {
        if col > row {
            *score = MASKED_SCORE;
        }
    }
}

pub fn scaled_dot_product_attention(
    query: ArrayView2<'_, f64>,
    key: ArrayView2<'_, f64>,
    value: ArrayView2<'_, f64>,
    scale: f64,
    causal: bool,
) -> AttentionOutput {
    assert!(
        query.ncols() == key.ncols(),
        "query dim {} must match key dim {}",
        query.ncols(),
        key.ncols()
    );
    let mut scores = query.dot(&key.t());
    scores *= scale;

    if causal {
        causal_mask_inplace(scores.view_mut());
    }

    softmax_rows_inplace(scores.view_mut());
    assert!(
        scores.ncols() == value.nrows(),
        "scores column count {} differs from value rows {}",
        scores.ncols(),
        value.nrows()
    );
    let output = scores.dot(&value);
    AttentionOutput { scores, output }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn sample(seq_len: usize, dim: usize, salt: f64) -> Array2<f64> {
        Array2::from_shape_fn((seq_len, dim), |(i, j)| ((i * dim + j) as f64 * salt).sin())
    }

    #[test]
    fn causal_scores_are_lower_triangular() {
        let q = sample(5, 3, 0.7);
        let k = sample(5, 3, 1.3);
        let v = sample(5, 3, 0.4);
        let attn = scaled_dot_product_attention(q.view(), k.view(), v.view(), 1.0 / 3f64.sqrt(), true);

        for i in 0..5 {
            for j in 0..5 {
                if j > i {
                    assert_eq!(attn.scores[(i, j)], 0.0);
                }
            }
            assert_abs_diff_eq!(attn.scores.row(i).sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn first_position_copies_first_value() {
        let q = sample(3, 2, 0.9);
        let k = sample(3, 2, 0.2);
        let v = sample(3, 2, 0.5);
        let attn = scaled_dot_product_attention(q.view(), k.view(), v.view(), 1.0, true);

        assert_eq!(attn.scores[(0, 0)], 1.0);
        for d in 0..2 {
            assert_abs_diff_eq!(attn.output[(0, d)], v[(0, d)], epsilon = 1e-12);
        }
    }

    #[test]
    fn unmasked_attention_sees_future_positions() {
        let q = sample(3, 2, 0.9);
        let k = sample(3, 2, 0.2);
        let v = sample(3, 2, 0.5);
        let attn = scaled_dot_product_attention(q.view(), k.view(), v.view(), 1.0, false);
        assert!(attn.scores[(0, 2)] > 0.0);
    }

    #[test]
    fn output_is_weighted_value_sum() {
        let q = sample(4, 2, 0.3);
        let k = sample(4, 2, 0.6);
        let v = sample(4, 3, 0.8);
        let attn = scaled_dot_product_attention(q.view(), k.view(), v.view(), 0.5, true);

        for i in 0..4 {
            for d in 0..3 {
                let expected: f64 = (0..4).map(|j| attn.scores[(i, j)] * v[(j, d)]).sum();
                assert_abs_diff_eq!(attn.output[(i, d)], expected, epsilon = 1e-12);
            }
        }
    }
}
