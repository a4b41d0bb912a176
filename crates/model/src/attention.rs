//! Single-head causal self-attention.

use crate::weights::HeadWeights;
use ndarray::ArrayView2;
use tinyformer_kernels::attention::{scaled_dot_product_attention, AttentionOutput};
use tinyformer_kernels::matmul::mat_mul;

/// Runs one head over `hidden` (`[seq_len x embed_dim]`).
///
/// Returns the post-softmax score matrix `[seq_len x seq_len]` and the head
/// output `[seq_len x head_dim]`. Position `i` only ever mixes values from
/// positions `<= i`.
pub fn attention_head(hidden: ArrayView2<'_, f64>, head: &HeadWeights) -> AttentionOutput {
    let q = mat_mul(hidden, head.wq.view());
    let k = mat_mul(hidden, head.wk.view());
    let v = mat_mul(hidden, head.wv.view());

    let head_dim = head.wq.ncols();
    let scale = 1.0 / (head_dim as f64).sqrt();
    scaled_dot_product_attention(q.view(), k.view(), v.view(), scale, true)
}
