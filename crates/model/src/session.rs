//! Training session: the single owner of a live set of weights.
//!
//! The engine functions are pure; a session threads the weights returned by
//! each step into the next one and keeps the progress that the surrounding
//! application persists between runs.

use crate::config::ModelConfig;
use crate::error::{EngineError, EngineResult};
use crate::model::{forward, ForwardResult};
use crate::store::KeyValueStore;
use crate::tokenizer::{tokenize, Vocabulary};
use crate::train::train_step_with_rng;
use crate::weights::{initialize_weights_with_rng, Weights};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Serializable state of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub config: ModelConfig,
    pub vocabulary: Vocabulary,
    pub weights: Weights,
    pub step: usize,
    pub losses: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub step: usize,
    pub loss: f64,
    pub target: usize,
    pub predicted: usize,
}

#[derive(Debug, Clone)]
pub struct TrainingSession {
    config: ModelConfig,
    vocabulary: Vocabulary,
    weights: Weights,
    step: usize,
    losses: Vec<f64>,
    rng: fastrand::Rng,
}

/// Splits a token sequence into its input prefix and the final target token.
pub fn split_example(tokens: &[usize]) -> EngineResult<(&[usize], usize)> {
    match tokens.split_last() {
        Some((&target, prefix)) if !prefix.is_empty() => Ok((prefix, target)),
        _ => Err(EngineError::DegenerateInput {
            len: tokens.len(),
            required: 2,
        }),
    }
}

impl TrainingSession {
    pub fn new(config: ModelConfig, vocabulary: Vocabulary) -> EngineResult<Self> {
        Self::from_rng(config, vocabulary, fastrand::Rng::new())
    }

    pub fn with_seed(config: ModelConfig, vocabulary: Vocabulary, seed: u64) -> EngineResult<Self> {
        Self::from_rng(config, vocabulary, fastrand::Rng::with_seed(seed))
    }

    fn from_rng(
        config: ModelConfig,
        vocabulary: Vocabulary,
        mut rng: fastrand::Rng,
    ) -> EngineResult<Self> {
        let weights = initialize_weights_with_rng(vocabulary.len(), &config, &mut rng)?;
        info!(
            vocab_size = vocabulary.len(),
            embed_dim = config.embed_dim,
            num_layers = config.num_layers,
            num_heads = config.num_heads,
            parameters = weights.parameter_count(),
            "initialized training session"
        );
        Ok(Self {
            config,
            vocabulary,
            weights,
            step: 0,
            losses: Vec::new(),
            rng,
        })
    }

    pub fn from_snapshot(snapshot: SessionSnapshot) -> EngineResult<Self> {
        let SessionSnapshot {
            config,
            vocabulary,
            weights,
            step,
            losses,
        } = snapshot;
        config.validate()?;
        weights.check_shapes(vocabulary.len(), &config)?;
        Ok(Self {
            config,
            vocabulary,
            weights,
            step,
            losses,
            rng: fastrand::Rng::new(),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            config: self.config,
            vocabulary: self.vocabulary.clone(),
            weights: self.weights.clone(),
            step: self.step,
            losses: self.losses.clone(),
        }
    }

    pub fn save<S: KeyValueStore>(&self, store: &mut S, key: &str) -> Result<()> {
        store.set(key, &self.snapshot())?;
        info!(key, step = self.step, "saved training session");
        Ok(())
    }

    /// Restores the session stored under `key`, if there is one.
    pub fn load<S: KeyValueStore>(store: &S, key: &str) -> Result<Option<Self>> {
        let Some(snapshot) = store.get::<SessionSnapshot>(key)? else {
            return Ok(None);
        };
        let session = Self::from_snapshot(snapshot)?;
        info!(key, step = session.step, "restored training session");
        Ok(Some(session))
    }

    /// Trains on one example: every token but the last is input, the last is the target.
    pub fn train_tokens(&mut self, tokens: &[usize]) -> EngineResult<StepReport> {
        let (input, target) = split_example(tokens)?;
        let out = train_step_with_rng(
            input,
            target,
            &self.weights,
            self.config.learning_rate,
            &mut self.rng,
        )?;

        self.weights = out.new_weights;
        self.step += 1;
        self.losses.push(out.loss);

        Ok(StepReport {
            step: self.step,
            loss: out.loss,
            target,
            predicted: out.result.predicted,
        })
    }

    pub fn train_sentence(&mut self, text: &str) -> EngineResult<StepReport> {
        let tokens = tokenize(text, &self.vocabulary);
        self.train_tokens(&tokens)
    }

    /// Forward pass over the known words of `text`.
    pub fn predict(&self, text: &str) -> EngineResult<ForwardResult> {
        let tokens = tokenize(text, &self.vocabulary);
        forward(&tokens, &self.weights, None)
    }

    /// Mean of the most recent `window` losses.
    pub fn average_loss(&self, window: usize) -> Option<f64> {
        let start = self.losses.len().saturating_sub(window);
        let recent = &self.losses[start..];
        if recent.is_empty() {
            return None;
        }
        Some(recent.iter().sum::<f64>() / recent.len() as f64)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn losses(&self) -> &[f64] {
        &self.losses
    }
}
