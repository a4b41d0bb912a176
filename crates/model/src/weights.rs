//! Parameter tree and random initialization.

use crate::config::ModelConfig;
use crate::error::{EngineError, EngineResult};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Embedding entries are drawn from `[-EMBEDDING_RANGE, EMBEDDING_RANGE] * scale`.
pub const EMBEDDING_RANGE: f64 = 0.5;
/// Projection entries are drawn from `[-PROJECTION_RANGE, PROJECTION_RANGE] * scale`.
pub const PROJECTION_RANGE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadWeights {
    pub wq: Array2<f64>, // (embed_dim, head_dim)
    pub wk: Array2<f64>,
    pub wv: Array2<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardWeights {
    pub w1: Array2<f64>, // (embed_dim, 2 * embed_dim)
    pub b1: Array1<f64>,
    pub w2: Array2<f64>, // (2 * embed_dim, embed_dim)
    pub b2: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    pub heads: Vec<HeadWeights>,
    pub ffn: FeedForwardWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputWeights {
    pub w: Array2<f64>, // (embed_dim, vocab_size)
    pub b: Array1<f64>,
}

/// Every parameter of the model.
///
/// All arrays are owned, so `clone()` duplicates the whole tree and the copy
/// shares no storage with the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub embeddings: Array2<f64>, // (vocab_size, embed_dim)
    pub layers: Vec<LayerWeights>,
    pub output: OutputWeights,
}

impl Weights {
    pub fn vocab_size(&self) -> usize {
        self.embeddings.nrows()
    }

    pub fn embed_dim(&self) -> usize {
        self.embeddings.ncols()
    }

    pub fn parameter_count(&self) -> usize {
        let layers: usize = self
            .layers
            .iter()
            .map(|layer| {
                let heads: usize = layer
                    .heads
                    .iter()
                    .map(|h| h.wq.len() + h.wk.len() + h.wv.len())
                    .sum();
                let ffn = &layer.ffn;
                heads + ffn.w1.len() + ffn.b1.len() + ffn.w2.len() + ffn.b2.len()
            })
            .sum();
        self.embeddings.len() + layers + self.output.w.len() + self.output.b.len()
    }

    /// Checks every array against the shapes `config` and `vocab_size` imply.
    ///
    /// Weights built by [`initialize_weights`] always pass; this guards trees
    /// that come from outside, such as a stored snapshot.
    pub fn check_shapes(&self, vocab_size: usize, config: &ModelConfig) -> EngineResult<()> {
        let embed_dim = config.embed_dim;
        let head_dim = config.head_dim();
        let ffn_dim = config.ffn_dim();

        check_matrix("embeddings", &self.embeddings, (vocab_size, embed_dim))?;
        if self.layers.len() != config.num_layers {
            return Err(EngineError::Configuration(format!(
                "expected {} layers, found {}",
                config.num_layers,
                self.layers.len()
            )));
        }
        for (l, layer) in self.layers.iter().enumerate() {
            if layer.heads.len() != config.num_heads {
                return Err(EngineError::Configuration(format!(
                    "layers[{l}]: expected {} heads, found {}",
                    config.num_heads,
                    layer.heads.len()
                )));
            }
            for (h, head) in layer.heads.iter().enumerate() {
                for (name, matrix) in [("wq", &head.wq), ("wk", &head.wk), ("wv", &head.wv)] {
                    check_matrix(
                        &format!("layers[{l}].heads[{h}].{name}"),
                        matrix,
                        (embed_dim, head_dim),
                    )?;
                }
            }
            let ffn = &layer.ffn;
            check_matrix(&format!("layers[{l}].ffn.w1"), &ffn.w1, (embed_dim, ffn_dim))?;
            check_vector(&format!("layers[{l}].ffn.b1"), &ffn.b1, ffn_dim)?;
            check_matrix(&format!("layers[{l}].ffn.w2"), &ffn.w2, (ffn_dim, embed_dim))?;
            check_vector(&format!("layers[{l}].ffn.b2"), &ffn.b2, embed_dim)?;
        }
        check_matrix("output.w", &self.output.w, (embed_dim, vocab_size))?;
        check_vector("output.b", &self.output.b, vocab_size)
    }
}

fn check_matrix(name: &str, matrix: &Array2<f64>, expected: (usize, usize)) -> EngineResult<()> {
    if matrix.dim() != expected {
        let (rows, cols) = matrix.dim();
        return Err(EngineError::Configuration(format!(
            "{name} is {rows}x{cols}, expected {}x{}",
            expected.0, expected.1
        )));
    }
    Ok(())
}

fn check_vector(name: &str, vector: &Array1<f64>, expected: usize) -> EngineResult<()> {
    if vector.len() != expected {
        return Err(EngineError::Configuration(format!(
            "{name} has length {}, expected {expected}",
            vector.len()
        )));
    }
    Ok(())
}

/// Multiplier applied to both sampling ranges.
pub fn init_scale(embed_dim: usize) -> f64 {
    (2.0 / embed_dim as f64).sqrt()
}

/// Build a freshly initialized parameter tree using the thread-local generator.
pub fn initialize_weights(vocab_size: usize, config: &ModelConfig) -> EngineResult<Weights> {
    initialize_weights_with_rng(vocab_size, config, &mut fastrand::Rng::new())
}

/// Same as [`initialize_weights`] but draws from `rng`, so a seeded generator
/// gives reproducible weights.
pub fn initialize_weights_with_rng(
    vocab_size: usize,
    config: &ModelConfig,
    rng: &mut fastrand::Rng,
) -> EngineResult<Weights> {
    config.validate()?;
    if vocab_size == 0 {
        return Err(EngineError::Configuration(
            "vocab_size must be greater than 0".to_string(),
        ));
    }

    let embed_dim = config.embed_dim;
    let head_dim = config.head_dim();
    let ffn_dim = config.ffn_dim();
    let scale = init_scale(embed_dim);
    let projection = PROJECTION_RANGE * scale;

    let embeddings = uniform_matrix(rng, (vocab_size, embed_dim), EMBEDDING_RANGE * scale);

    let mut layers = Vec::with_capacity(config.num_layers);
    for _ in 0..config.num_layers {
        let heads = (0..config.num_heads)
            .map(|_| HeadWeights {
                wq: uniform_matrix(rng, (embed_dim, head_dim), projection),
                wk: uniform_matrix(rng, (embed_dim, head_dim), projection),
                wv: uniform_matrix(rng, (embed_dim, head_dim), projection),
            })
            .collect();
        let ffn = FeedForwardWeights {
            w1: uniform_matrix(rng, (embed_dim, ffn_dim), projection),
            b1: uniform_vector(rng, ffn_dim, projection),
            w2: uniform_matrix(rng, (ffn_dim, embed_dim), projection),
            b2: uniform_vector(rng, embed_dim, projection),
        };
        layers.push(LayerWeights { heads, ffn });
    }

    let output = OutputWeights {
        w: uniform_matrix(rng, (embed_dim, vocab_size), projection),
        b: uniform_vector(rng, vocab_size, projection),
    };

    Ok(Weights {
        embeddings,
        layers,
        output,
    })
}

/// Uniform sample from `[-range, range)`.
pub(crate) fn uniform(rng: &mut fastrand::Rng, range: f64) -> f64 {
    (rng.f64() * 2.0 - 1.0) * range
}

fn uniform_matrix(rng: &mut fastrand::Rng, shape: (usize, usize), range: f64) -> Array2<f64> {
    Array2::from_shape_fn(shape, |_| uniform(rng, range))
}

fn uniform_vector(rng: &mut fastrand::Rng, len: usize, range: f64) -> Array1<f64> {
    Array1::from_shape_fn(len, |_| uniform(rng, range))
}
