//! Transformer layer: multi-head attention and feed-forward, each followed by
//! a residual connection and layer norm.

use crate::attention::attention_head;
use crate::weights::LayerWeights;
use ndarray::{Array2, ArrayView2};
use tinyformer_kernels::layernorm::layer_norm_rows_inplace;
use tinyformer_kernels::matmul::mat_vec_mul;
use tinyformer_kernels::utils::{relu, vec_add};

#[derive(Debug, Clone)]
pub struct LayerOutput {
    /// `[seq_len x embed_dim]`
    pub hidden: Array2<f64>,
    /// One `[seq_len x seq_len]` score matrix per head.
    pub head_scores: Vec<Array2<f64>>,
}

pub struct TransformerLayer<'w> {
    weights: &'w LayerWeights,
}

impl<'w> TransformerLayer<'w> {
    pub fn new(weights: &'w LayerWeights) -> Self {
        Self { weights }
    }

    /// Forward pass for a single layer over `x` (`[seq_len x embed_dim]`).
    pub fn forward(&self, x: ArrayView2<'_, f64>) -> LayerOutput {
        // 1. Attention, averaged across heads
        let (attn_out, head_scores) = self.self_attention(x);

        // Residual + norm
        let mut x = &x + &attn_out;
        layer_norm_rows_inplace(x.view_mut());

        // 2. Feed-forward
        let ffn_out = self.feed_forward(x.view());

        // Residual + norm
        let mut hidden = &x + &ffn_out;
        layer_norm_rows_inplace(hidden.view_mut());

        LayerOutput {
            hidden,
            head_scores,
        }
    }

    /// Heads are not concatenated. Output dimension `d` of the combined
    /// sequence is the mean over heads of each head's dimension
    /// `d % head_dim`.
    fn self_attention(&self, x: ArrayView2<'_, f64>) -> (Array2<f64>, Vec<Array2<f64>>) {
        let heads = &self.weights.heads;
        assert!(!heads.is_empty(), "transformer layer has no attention heads");

        let (seq_len, embed_dim) = x.dim();
        let mut combined = Array2::<f64>::zeros((seq_len, embed_dim));
        let mut head_scores = Vec::with_capacity(heads.len());

        for head in heads {
            let attn = attention_head(x, head);
            let head_dim = attn.output.ncols();
            for ((p, d), value) in combined.indexed_iter_mut() {
                *value += attn.output[(p, d % head_dim)];
            }
            head_scores.push(attn.scores);
        }

        combined /= heads.len() as f64;
        (combined, head_scores)
    }

    fn feed_forward(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let ffn = &self.weights.ffn;
        let mut out = Array2::<f64>::zeros(x.raw_dim());
        for (row, mut out_row) in x.outer_iter().zip(out.outer_iter_mut()) {
            let hidden = relu(vec_add(mat_vec_mul(row, ffn.w1.view()).view(), ffn.b1.view()).view());
            let projected = vec_add(mat_vec_mul(hidden.view(), ffn.w2.view()).view(), ffn.b2.view());
            out_row.assign(&projected);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::weights::initialize_weights_with_rng;
    use approx::assert_abs_diff_eq;
    use tinyformer_kernels::layernorm::layer_norm;

    fn layer_weights(embed_dim: usize, num_heads: usize, seed: u64) -> LayerWeights {
        let config = ModelConfig {
            embed_dim,
            num_layers: 1,
            num_heads,
            learning_rate: 0.1,
        };
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut weights = initialize_weights_with_rng(4, &config, &mut rng).unwrap();
        weights.layers.remove(0)
    }

    fn input(seq_len: usize, embed_dim: usize) -> Array2<f64> {
        Array2::from_shape_fn((seq_len, embed_dim), |(i, j)| ((3 * i + j) as f64 * 0.41).cos())
    }

    #[test]
    fn output_rows_are_normalized() {
        let weights = layer_weights(6, 3, 1);
        let x = input(4, 6);
        let out = TransformerLayer::new(&weights).forward(x.view());

        assert_eq!(out.hidden.dim(), (4, 6));
        assert_eq!(out.head_scores.len(), 3);
        for row in out.hidden.outer_iter() {
            let mean = row.sum() / 6.0;
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn heads_are_combined_by_wrapped_average() {
        // embed_dim 5, 2 heads -> head_dim 2, dimension 4 wraps to head dim 0
        let weights = layer_weights(5, 2, 9);
        let x = input(3, 5);
        let layer = TransformerLayer::new(&weights);
        let (combined, _) = layer.self_attention(x.view());

        let h0 = attention_head(x.view(), &weights.heads[0]).output;
        let h1 = attention_head(x.view(), &weights.heads[1]).output;
        for p in 0..3 {
            for d in 0..5 {
                let expected = (h0[(p, d % 2)] + h1[(p, d % 2)]) / 2.0;
                assert_abs_diff_eq!(combined[(p, d)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn forward_matches_manual_composition() {
        let weights = layer_weights(4, 1, 5);
        let x = input(2, 4);
        let out = TransformerLayer::new(&weights).forward(x.view());

        let attn = attention_head(x.view(), &weights.heads[0]).output;
        let ffn = &weights.ffn;
        for p in 0..2 {
            let residual = &x.row(p) + &attn.row(p);
            let normed = layer_norm(residual.view());
            let hidden = relu((&normed.dot(&ffn.w1) + &ffn.b1).view());
            let ffn_out = &hidden.dot(&ffn.w2) + &ffn.b2;
            let expected = layer_norm((&normed + &ffn_out).view());
            for d in 0..4 {
                assert_abs_diff_eq!(out.hidden[(p, d)], expected[d], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn head_scores_are_causal() {
        let weights = layer_weights(4, 2, 3);
        let out = TransformerLayer::new(&weights).forward(input(5, 4).view());
        for scores in &out.head_scores {
            for i in 0..5 {
                for j in (i + 1)..5 {
                    assert_eq!(scores[(i, j)], 0.0);
                }
            }
        }
    }
}
