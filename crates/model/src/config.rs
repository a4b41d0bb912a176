//! Model configuration.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub embed_dim: usize,
    pub num_layers: usize,
    pub num_heads: usize,
    pub learning_rate: f64,
}

impl ModelConfig {
    /// Small default config; the CLI flag defaults match it.
    pub fn tiny() -> Self {
        Self {
            embed_dim: 8,
            num_layers: 1,
            num_heads: 2,
            learning_rate: 0.05,
        }
    }

    pub fn head_dim(&self) -> usize {
        self.embed_dim / self.num_heads
    }

    /// Hidden width of the position-wise feed-forward block.
    pub fn ffn_dim(&self) -> usize {
        2 * self.embed_dim
    }

    /// Embedding dimensions that no head projects to when `embed_dim` is not
    /// a multiple of `num_heads`.
    pub fn dropped_dims(&self) -> usize {
        self.embed_dim - self.head_dim() * self.num_heads
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.embed_dim == 0 {
            return Err(EngineError::Configuration(
                "embed_dim must be greater than 0".to_string(),
            ));
        }
        if self.num_heads == 0 {
            return Err(EngineError::Configuration(
                "num_heads must be greater than 0".to_string(),
            ));
        }
        if self.num_heads > self.embed_dim {
            return Err(EngineError::Configuration(format!(
                "num_heads ({}) must not exceed embed_dim ({})",
                self.num_heads, self.embed_dim
            )));
        }
        validate_learning_rate(self.learning_rate)?;

        if self.dropped_dims() > 0 {
            warn!(
                embed_dim = self.embed_dim,
                num_heads = self.num_heads,
                head_dim = self.head_dim(),
                dropped = self.dropped_dims(),
                "embed_dim is not divisible by num_heads; heads are truncated"
            );
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::tiny()
    }
}

pub(crate) fn validate_learning_rate(learning_rate: f64) -> EngineResult<()> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(EngineError::Configuration(format!(
            "learning_rate must be a positive finite number, got {learning_rate}"
        )));
    }
    Ok(())
}
