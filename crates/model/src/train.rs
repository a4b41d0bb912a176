//! Simplified single-example training step.
//!
//! Only the output projection receives a real gradient (softmax regression on
//! the final hidden vector). Embedding rows of the input tokens get a small
//! random nudge scaled by the learning rate, independent of the loss.
//! Attention and feed-forward parameters are never touched.

use crate::config::validate_learning_rate;
use crate::error::EngineResult;
use crate::model::{forward, ForwardResult};
use crate::weights::{uniform, Weights};
use std::collections::HashSet;
use tinyformer_kernels::loss::cross_entropy_loss;
use tracing::debug;

/// Half-width of the uniform draw used for the embedding nudge.
pub const EMBEDDING_NOISE_RANGE: f64 = 0.5;
/// Extra factor applied to the embedding nudge on top of the learning rate.
pub const EMBEDDING_NOISE_SCALE: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct TrainStepOutput {
    pub new_weights: Weights,
    pub loss: f64,
    /// Forward pass over the pre-update weights.
    pub result: ForwardResult,
}

/// One training step using the thread-local generator for the embedding nudge.
pub fn train_step(
    input_tokens: &[usize],
    target: usize,
    weights: &Weights,
    learning_rate: f64,
) -> EngineResult<TrainStepOutput> {
    train_step_with_rng(
        input_tokens,
        target,
        weights,
        learning_rate,
        &mut fastrand::Rng::new(),
    )
}

/// One training step: forward, then an updated deep copy of `weights`.
///
/// `input_tokens` is the prefix that precedes `target`, so a single input
/// token is a complete example; only an empty prefix is
/// [`EngineError::DegenerateInput`](crate::error::EngineError::DegenerateInput).
/// Splitting a whole sentence into prefix and target is [`split_example`]'s
/// job, which needs at least two tokens.
///
/// `weights` itself is never modified.
///
/// [`split_example`]: crate::session::split_example
pub fn train_step_with_rng(
    input_tokens: &[usize],
    target: usize,
    weights: &Weights,
    learning_rate: f64,
    rng: &mut fastrand::Rng,
) -> EngineResult<TrainStepOutput> {
    validate_learning_rate(learning_rate)?;
    let result = forward(input_tokens, weights, Some(target))?;
    let loss = cross_entropy_loss(result.probabilities.view(), target);

    let mut new_weights = weights.clone();

    // Output layer: exact gradient of the cross-entropy w.r.t. w and b.
    let probabilities = &result.probabilities;
    let hidden = &result.last_hidden;
    let output = &mut new_weights.output;
    for (v, &p) in probabilities.iter().enumerate() {
        let indicator = if v == target { 1.0 } else { 0.0 };
        let error = indicator - p;
        for (d, &h) in hidden.iter().enumerate() {
            output.w[(d, v)] += learning_rate * error * h;
        }
        output.b[v] += learning_rate * error;
    }

    // Embeddings: random nudge, once per distinct input token.
    let mut seen = HashSet::with_capacity(input_tokens.len());
    for &token in input_tokens {
        if !seen.insert(token) {
            continue;
        }
        for value in new_weights.embeddings.row_mut(token) {
            *value += learning_rate * uniform(rng, EMBEDDING_NOISE_RANGE) * EMBEDDING_NOISE_SCALE;
        }
    }

    debug!(
        loss,
        target,
        predicted = result.predicted,
        seq_len = input_tokens.len(),
        "train step"
    );

    Ok(TrainStepOutput {
        new_weights,
        loss,
        result,
    })
}
