//! Toy transformer sequence model.
//!
//! This crate implements a small decoder-style transformer with:
//! - Uniform random weight initialization
//! - Causal multi-head self-attention (heads averaged, not concatenated)
//! - Position-wise feed-forward with residuals and layer norm
//! - A simplified training step that only fits the output projection
//!
//! Every engine function takes the weights explicitly and returns new values;
//! nothing is cached between calls. [`TrainingSession`] is the caller-side
//! owner that threads weights from one step to the next.

pub mod attention;
pub mod config;
pub mod error;
pub mod layer;
pub mod model;
pub mod session;
pub mod store;
pub mod tokenizer;
pub mod train;
pub mod weights;

pub use config::ModelConfig;
pub use error::{EngineError, EngineResult};
pub use model::{forward, ForwardResult};
pub use session::{split_example, SessionSnapshot, StepReport, TrainingSession};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use tokenizer::{detokenize, detokenize_all, tokenize, Vocabulary};
pub use train::{train_step, train_step_with_rng, TrainStepOutput};
pub use weights::{initialize_weights, initialize_weights_with_rng, Weights};
