//! Word-level vocabulary and tokenization.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Characters removed before splitting text into words.
pub const STRIPPED_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '"', '\'', '(', ')'];

/// Append-only word <-> id mapping. Ids are assigned in insertion order
/// starting at 0 and never change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    words: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a vocabulary from words in order; repeated words keep their first id.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self::new();
        for word in words {
            vocab.insert(word);
        }
        vocab
    }

    /// Normalizes every sentence and inserts its words in first-seen order.
    pub fn from_sentences<I, S>(sentences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Self::new();
        for sentence in sentences {
            for word in normalize(sentence.as_ref()) {
                vocab.insert(word);
            }
        }
        vocab
    }

    /// Returns the id of `word`, assigning the next free id if it is new.
    pub fn insert(&mut self, word: impl Into<String>) -> usize {
        let word = word.into();
        if let Some(&id) = self.ids.get(&word) {
            return id;
        }
        let id = self.words.len();
        self.ids.insert(word.clone(), id);
        self.words.push(word);
        id
    }

    pub fn id(&self, word: &str) -> Option<usize> {
        self.ids.get(word).copied()
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.words.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// `(word, id)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.words.iter().enumerate().map(|(id, w)| (w.as_str(), id))
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(words: Vec<String>) -> Self {
        Self::from_words(words)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.words
    }
}

/// Lower-cases, strips basic punctuation and splits on whitespace.
pub fn normalize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Maps `text` to token ids. Words missing from `vocab` are dropped.
pub fn tokenize(text: &str, vocab: &Vocabulary) -> Vec<usize> {
    normalize(text)
        .iter()
        .filter_map(|word| vocab.id(word))
        .collect()
}

/// Reverse lookup; unknown ids render as `<id>`.
pub fn detokenize(id: usize, vocab: &Vocabulary) -> String {
    vocab
        .word(id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("<{id}>"))
}

pub fn detokenize_all(ids: &[usize], vocab: &Vocabulary) -> String {
    ids.iter()
        .map(|&id| detokenize(id, vocab))
        .collect::<Vec<_>>()
        .join(" ")
}
