//! Full forward pass: embeddings, layer stack, output projection.

use crate::error::{EngineError, EngineResult};
use crate::layer::TransformerLayer;
use crate::weights::Weights;
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;
use tinyformer_kernels::loss::cross_entropy_loss;
use tinyformer_kernels::matmul::mat_vec_mul;
use tinyformer_kernels::utils::{argmax, softmax, vec_add};

/// Everything one forward call computed. All arrays are owned copies, never
/// views into the [`Weights`] that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardResult {
    /// Embedding rows gathered for the input, `[seq_len x embed_dim]`.
    pub embeddings: Array2<f64>,
    /// `attention[layer][head]` is a `[seq_len x seq_len]` score matrix.
    pub attention: Vec<Vec<Array2<f64>>>,
    /// Hidden vector at the final position after the last layer.
    pub last_hidden: Array1<f64>,
    pub logits: Array1<f64>,
    pub probabilities: Array1<f64>,
    pub predicted: usize,
    pub loss: Option<f64>,
}

impl ForwardResult {
    pub fn seq_len(&self) -> usize {
        self.embeddings.nrows()
    }

    /// The `k` most probable token ids, best first. Ties keep the lower id first.
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = self.probabilities.iter().copied().enumerate().collect();
        ranked.sort_by(|(ia, a), (ib, b)| b.total_cmp(a).then(ia.cmp(ib)));
        ranked.truncate(k);
        ranked
    }
}

pub(crate) fn check_token(id: usize, vocab_size: usize) -> EngineResult<()> {
    if id >= vocab_size {
        return Err(EngineError::TokenOutOfRange { id, vocab_size });
    }
    Ok(())
}

/// Forward pass: embed -> layer stack -> output projection -> softmax.
///
/// Pure and deterministic in `(input_tokens, weights)`. When `target` is
/// given the cross-entropy loss of that token is included.
pub fn forward(
    input_tokens: &[usize],
    weights: &Weights,
    target: Option<usize>,
) -> EngineResult<ForwardResult> {
    if input_tokens.is_empty() {
        return Err(EngineError::DegenerateInput {
            len: 0,
            required: 1,
        });
    }
    let vocab_size = weights.vocab_size();
    for &id in input_tokens.iter().chain(target.iter()) {
        check_token(id, vocab_size)?;
    }

    // Embedding lookup
    let embeddings = weights.embeddings.select(Axis(0), input_tokens);

    // Layer stack
    let mut hidden = embeddings.clone();
    let mut attention = Vec::with_capacity(weights.layers.len());
    for layer_weights in &weights.layers {
        let out = TransformerLayer::new(layer_weights).forward(hidden.view());
        hidden = out.hidden;
        attention.push(out.head_scores);
    }

    // Output head on the final position
    let last_hidden = hidden.row(input_tokens.len() - 1).to_owned();
    let logits = vec_add(
        mat_vec_mul(last_hidden.view(), weights.output.w.view()).view(),
        weights.output.b.view(),
    );
    let probabilities = softmax(logits.view());
    let predicted = argmax(probabilities.view());
    let loss = target.map(|t| cross_entropy_loss(probabilities.view(), t));

    Ok(ForwardResult {
        embeddings,
        attention,
        last_hidden,
        logits,
        probabilities,
        predicted,
        loss,
    })
}
