use anyhow::Result;
use tinyformer::{EngineError, JsonFileStore, KeyValueStore, ModelConfig, TrainingSession, Vocabulary};

const KEY: &str = "tinyformer.session";

fn sentences() -> [&'static str; 3] {
    ["The cat sat on the mat.", "The dog sat on the rug.", "A cat saw the dog!"]
}

#[test]
fn session_survives_a_file_store_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.json");

    let vocab = Vocabulary::from_sentences(sentences());
    let mut session = TrainingSession::with_seed(ModelConfig::tiny(), vocab, 1)?;
    for _ in 0..3 {
        for sentence in sentences() {
            session.train_sentence(sentence)?;
        }
    }
    assert_eq!(session.step(), 9);

    let mut store = JsonFileStore::open(&path)?;
    session.save(&mut store, KEY)?;

    let store = JsonFileStore::open(&path)?;
    let mut restored = TrainingSession::load(&store, KEY)?.expect("session was saved");
    assert_eq!(restored.snapshot(), session.snapshot());

    // Prediction from restored weights matches the original bit for bit.
    let a = session.predict("the cat sat on the")?;
    let b = restored.predict("the cat sat on the")?;
    assert_eq!(a.probabilities, b.probabilities);

    restored.train_sentence("the dog sat")?;
    assert_eq!(restored.step(), 10);
    Ok(())
}

#[test]
fn removed_session_is_gone() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.json");

    let vocab = Vocabulary::from_sentences(sentences());
    let session = TrainingSession::new(ModelConfig::tiny(), vocab)?;
    let mut store = JsonFileStore::open(&path)?;
    session.save(&mut store, KEY)?;
    store.remove(KEY)?;

    let store = JsonFileStore::open(&path)?;
    assert!(TrainingSession::load(&store, KEY)?.is_none());
    Ok(())
}

#[test]
fn unknown_words_are_dropped_before_prediction() -> Result<()> {
    let vocab = Vocabulary::from_sentences(sentences());
    let session = TrainingSession::with_seed(ModelConfig::tiny(), vocab, 3)?;

    let known = session.predict("the cat")?;
    let noisy = session.predict("the zebra cat")?;
    assert_eq!(known.probabilities, noisy.probabilities);

    let err = session.predict("zebra").unwrap_err();
    assert_eq!(err, EngineError::DegenerateInput { len: 0, required: 1 });
    Ok(())
}
