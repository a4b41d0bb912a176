//! Engine error type.

use thiserror::Error;

/// Precondition violations reported by the engine entry points.
///
/// All variants are raised before any arithmetic happens; the engine never
/// returns a partial result alongside one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A model configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A token id does not index a row of the embedding table.
    #[error("token id {id} out of range for vocabulary of size {vocab_size}")]
    TokenOutOfRange { id: usize, vocab_size: usize },

    /// A token sequence is shorter than the operation requires.
    #[error("sequence of length {len} is too short, at least {required} tokens required")]
    DegenerateInput { len: usize, required: usize },
}

pub type EngineResult<T> = Result<T, EngineError>;
