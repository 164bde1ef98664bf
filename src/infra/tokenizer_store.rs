// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads a HuggingFace `tokenizer.json` from a directory, or
// builds a word-level one from a sample of the corpus when the
// directory has none yet.
//
// The built vocabulary is contiguous, so its size is exactly
// the number of ids the tokenizer can emit:
//
//   0 → [PAD]   1 → [UNK]   2 → [EOS]   3.. → words by frequency
//
// That lets the forward command compare get_vocab_size() with
// the model's num_tokens before any batch is pulled.
//
// The JSON is written by hand and loaded back with from_file,
// which sidesteps the trainer/ModelWrapper type juggling in
// tokenizers 0.15.
//
// Reference: HuggingFace tokenizers — WordLevel model

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use crate::domain::traits::TextTokenizer;
use crate::error::PipelineError;

const SPECIAL_TOKENS: [&str; 3] = ["[PAD]", "[UNK]", "[EOS]"];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Load the existing tokenizer, or build one from `texts`
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!(
                "Building word-level tokenizer (vocab_size={}) from {} sample texts",
                vocab_size,
                texts.len()
            );
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        load_file(&self.path())
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        anyhow::ensure!(
            vocab_size > SPECIAL_TOKENS.len(),
            "vocab_size must exceed the {} special tokens, got {}",
            SPECIAL_TOKENS.len(),
            vocab_size
        );
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create tokenizer dir '{}'", self.dir.display()))?;

        // ── Step 1: Vocabulary ────────────────────────────────────────────────
        let words = top_words(texts, vocab_size - SPECIAL_TOKENS.len());

        let mut vocab = serde_json::Map::new();
        for (id, token) in SPECIAL_TOKENS.iter().enumerate() {
            vocab.insert(token.to_string(), serde_json::json!(id));
        }
        for word in &words {
            let id = vocab.len();
            vocab.insert(word.clone(), serde_json::json!(id));
        }
        let total = vocab.len();

        // ── Step 2: Tokenizer JSON in HuggingFace format ──────────────────────
        let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
            .iter()
            .enumerate()
            .map(|(id, token)| {
                serde_json::json!({
                    "id": id, "content": token, "single_word": false,
                    "lstrip": false, "rstrip": false, "normalized": false, "special": true
                })
            })
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON '{}'", path.display()))?;

        tracing::info!("Tokenizer built with {} entries, saved to '{}'", total, path.display());
        load_file(&path)
    }
}

fn load_file(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
}

/// Most frequent lowercase words, ties broken alphabetically so the
/// same sample always yields the same vocabulary.
fn top_words(texts: &[String], limit: usize) -> Vec<String> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for word in text.split_whitespace() {
            let w = word.to_lowercase();
            let w = w.trim_matches(|c: char| !c.is_alphanumeric());
            if !w.is_empty() {
                *freq.entry(w.to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(limit);
    words.into_iter().map(|(w, _)| w).collect()
}

// ─── TextTokenizer adapter ────────────────────────────────────────────────────
impl TextTokenizer for Tokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, PipelineError> {
        // Deref to the inner TokenizerImpl so the inherent encode is called
        let encoding = Deref::deref(self)
            .encode(text, false)
            .map_err(|e| PipelineError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("packed-lm-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn corpus() -> Vec<String> {
        vec![
            "the cat sat on the mat".to_string(),
            "The dog sat. The end!".to_string(),
        ]
    }

    #[test]
    fn test_top_words_is_deterministic() {
        let words = top_words(&corpus(), 3);
        // "the" ×4, "sat" ×2, then alphabetical among singletons
        assert_eq!(words, vec!["the", "sat", "cat"]);
    }

    #[test]
    fn test_build_then_load_roundtrip() {
        let dir   = temp_dir("build");
        let store = TokenizerStore::new(&dir);

        let built = store.load_or_build(&corpus(), 6).unwrap();
        assert!(store.path().exists());
        assert_eq!(built.get_vocab_size(true), 6);

        let ids = TextTokenizer::encode(&built, "The cat").unwrap();
        assert_eq!(ids, vec![3, 5]);

        // Second call must reuse the file, not rebuild from a new corpus
        let loaded = store.load_or_build(&["zebra zebra".to_string()], 6).unwrap();
        assert_eq!(TextTokenizer::encode(&loaded, "the cat").unwrap(), vec![3, 5]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unknown_words_map_to_unk() {
        let dir   = temp_dir("unk");
        let store = TokenizerStore::new(&dir);
        let tok   = store.load_or_build(&corpus(), 8).unwrap();

        let ids = TextTokenizer::encode(&tok, "giraffe").unwrap();
        assert_eq!(ids, vec![1]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_tiny_vocab_is_rejected() {
        let dir   = temp_dir("tiny");
        let store = TokenizerStore::new(&dir);
        assert!(store.load_or_build(&corpus(), 3).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let store = TokenizerStore::new(temp_dir("missing"));
        assert!(store.load().is_err());
    }
}
