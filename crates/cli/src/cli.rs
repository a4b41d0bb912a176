//! CLI wiring for tinyformer.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tinyformer::{
    detokenize, tokenize, ForwardResult, JsonFileStore, KeyValueStore, ModelConfig,
    TrainingSession, Vocabulary,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tinyformer", about = "Train and inspect a toy transformer")]
pub struct Cli {
    /// JSON file holding the persisted session.
    #[arg(long, global = true, default_value = "tinyformer-state.json")]
    pub state: PathBuf,

    /// Key the session is stored under.
    #[arg(long, global = true, default_value = "tinyformer.session")]
    pub key: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train on sentences; each one predicts its last word from the rest.
    Train {
        #[arg(long = "sentence", required = true)]
        sentences: Vec<String>,
        /// Passes over all sentences.
        #[arg(long, default_value_t = 50)]
        steps: usize,
        #[arg(long, default_value_t = 8)]
        embed_dim: usize,
        #[arg(long, default_value_t = 1)]
        num_layers: usize,
        #[arg(long, default_value_t = 2)]
        num_heads: usize,
        #[arg(long, default_value_t = 0.05)]
        learning_rate: f64,
        #[arg(long)]
        seed: Option<u64>,
        /// Ignore any stored session and start over.
        #[arg(long, default_value_t = false)]
        fresh: bool,
        /// Log the average loss every this many passes.
        #[arg(long, default_value_t = 10)]
        log_every: usize,
    },
    /// Show the most likely next words for a prompt.
    Predict {
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },
    /// Dump the per-layer, per-head attention scores for a prompt as JSON.
    Attention {
        #[arg(long)]
        prompt: String,
    },
    /// Delete the stored session.
    Reset,
}

pub fn run_cli(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    execute(cli)
}

pub fn execute(cli: Cli) -> Result<()> {
    let Cli {
        state,
        key,
        command,
    } = cli;
    let mut store = JsonFileStore::open(&state)?;

    match command {
        Command::Train {
            sentences,
            steps,
            embed_dim,
            num_layers,
            num_heads,
            learning_rate,
            seed,
            fresh,
            log_every,
        } => {
            let stored = if fresh {
                None
            } else {
                TrainingSession::load(&store, &key)?
            };
            let mut session = match stored {
                Some(session) => {
                    info!(
                        step = session.step(),
                        "continuing stored session; model flags are ignored"
                    );
                    session
                }
                None => {
                    let config = ModelConfig {
                        embed_dim,
                        num_layers,
                        num_heads,
                        learning_rate,
                    };
                    let vocabulary = Vocabulary::from_sentences(&sentences);
                    match seed {
                        Some(seed) => TrainingSession::with_seed(config, vocabulary, seed)?,
                        None => TrainingSession::new(config, vocabulary)?,
                    }
                }
            };

            let examples = trainable_sentences(&sentences, session.vocabulary());
            if examples.is_empty() {
                bail!("none of the sentences has two or more known words");
            }

            let log_every = log_every.max(1);
            for pass in 1..=steps {
                for sentence in &examples {
                    session.train_sentence(sentence)?;
                }
                if pass % log_every == 0 || pass == steps {
                    info!(
                        pass,
                        step = session.step(),
                        loss = session.average_loss(examples.len()),
                        "training"
                    );
                }
            }

            session.save(&mut store, &key)?;
            println!(
                "trained {} steps; average loss over the last pass: {:.4}",
                session.step(),
                session.average_loss(examples.len()).unwrap_or(f64::NAN)
            );
        }
        Command::Predict { prompt, top_k } => {
            let session = load_session(&store, &key, &state)?;
            let result = session.predict(&prompt)?;
            println!("Prompt: {}", prompt);
            for (rank, (id, probability)) in result.top_k(top_k).into_iter().enumerate() {
                println!(
                    "{:>2}. {:<16} {:.4}",
                    rank + 1,
                    detokenize(id, session.vocabulary()),
                    probability
                );
            }
        }
        Command::Attention { prompt } => {
            let session = load_session(&store, &key, &state)?;
            let result = session.predict(&prompt)?;
            let tokens: Vec<String> = tokenize(&prompt, session.vocabulary())
                .into_iter()
                .map(|id| detokenize(id, session.vocabulary()))
                .collect();
            let report = serde_json::json!({
                "tokens": tokens,
                "layers": attention_rows(&result),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Reset => {
            store.remove(&key)?;
            info!(path = %state.display(), key = %key, "removed stored session");
        }
    }
    Ok(())
}

fn load_session(store: &JsonFileStore, key: &str, path: &std::path::Path) -> Result<TrainingSession> {
    TrainingSession::load(store, key)?.with_context(|| {
        format!(
            "no session stored under '{}' in {}; run `tinyformer train` first",
            key,
            path.display()
        )
    })
}

/// Sentences that still have an input word and a target once unknown words are dropped.
fn trainable_sentences(sentences: &[String], vocabulary: &Vocabulary) -> Vec<String> {
    sentences
        .iter()
        .filter(|sentence| {
            let usable = tokenize(sentence, vocabulary).len() >= 2;
            if !usable {
                warn!(sentence = %sentence, "skipping sentence with fewer than two known words");
            }
            usable
        })
        .cloned()
        .collect()
}

/// `[layer][head][row][col]` as nested vectors.
fn attention_rows(result: &ForwardResult) -> Vec<Vec<Vec<Vec<f64>>>> {
    result
        .attention
        .iter()
        .map(|heads| {
            heads
                .iter()
                .map(|scores| scores.outer_iter().map(|row| row.to_vec()).collect())
                .collect()
        })
        .collect()
}
