// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// Everything one `pack` or `forward` run needs, in one serde
// struct so it can live in a JSON file:
//
//   {
//     "pipeline":  { "sequence_length": 512, "batch_size": 8 },
//     "train":     { "path": "data/train.jsonl" },
//     "eval":      { "path": "data/eval.jsonl", "example_buffer": 1000 },
//     "model":     { "dim": 256, "depth": 4 },
//     "tokenizer_dir": "tokenizer"
//   }
//
// Missing sections fall back to their defaults; only
// `train.path` is required. CLI flags are applied on top
// (see cli/commands.rs) and the merged result is validated
// once, before any file is opened.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::data::{
    loader::JsonlSource,
    pipeline::{PipelineConfig, SplitConfig},
};
use crate::domain::traits::ExampleSource;
use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::model::LanguageModelConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub pipeline:         PipelineConfig,
    pub train:            SplitConfig,
    #[serde(default)]
    pub eval:             Option<SplitConfig>,
    #[serde(default = "LanguageModelConfig::new", deserialize_with = "model_over_defaults")]
    pub model:            LanguageModelConfig,
    /// Holds tokenizer.json; built from the train split if missing
    #[serde(default = "default_tokenizer_dir")]
    pub tokenizer_dir:    String,
    /// Train examples read to build a new vocabulary
    #[serde(default = "default_tokenizer_sample")]
    pub tokenizer_sample: usize,
}

/// burn's Config deserializer wants every field, so a partial `model`
/// section is laid over the serialised defaults before it is read.
fn model_over_defaults<'de, D>(deserializer: D) -> Result<LanguageModelConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let overrides = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Object(overrides) = overrides else {
        return Err(D::Error::custom("model section must be a JSON object"));
    };

    let mut merged = serde_json::to_value(LanguageModelConfig::new()).map_err(D::Error::custom)?;
    if let serde_json::Value::Object(fields) = &mut merged {
        fields.extend(overrides);
    }
    serde_json::from_value(merged).map_err(D::Error::custom)
}

fn default_tokenizer_dir() -> String {
    "tokenizer".to_string()
}

fn default_tokenizer_sample() -> usize {
    10_000
}

impl RunConfig {
    pub fn new(train: SplitConfig) -> Self {
        Self {
            pipeline:         PipelineConfig::default(),
            train,
            eval:             None,
            model:            LanguageModelConfig::new(),
            tokenizer_dir:    default_tokenizer_dir(),
            tokenizer_sample: default_tokenizer_sample(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw  = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Cannot parse config '{}'", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        for (name, split) in self.splits() {
            split
                .validate()
                .with_context(|| format!("Invalid {name} split"))?;
        }
        self.model.validate()?;
        anyhow::ensure!(self.tokenizer_sample > 0, "tokenizer_sample must be at least 1");
        Ok(())
    }

    /// ("train", ..) always, then ("eval", ..) when configured
    pub fn splits(&self) -> Vec<(&'static str, &SplitConfig)> {
        let mut splits = vec![("train", &self.train)];
        if let Some(eval) = &self.eval {
            splits.push(("eval", eval));
        }
        splits
    }

    /// Load tokenizer.json, or build one from the first
    /// `tokenizer_sample` train examples with `model.num_tokens` entries.
    pub fn tokenizer(&self) -> Result<Tokenizer> {
        let store = TokenizerStore::new(&self.tokenizer_dir);
        if store.path().exists() {
            return store.load();
        }

        let source = JsonlSource::new(&self.train.path, &self.train.text_field);
        let sample = source
            .examples()?
            .take(self.tokenizer_sample)
            .map(|example| example.map(|e| e.text))
            .collect::<Result<Vec<String>, _>>()
            .with_context(|| format!("Cannot sample '{}' for the tokenizer", self.train.path))?;

        store.load_or_build(&sample, self.model.num_tokens)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let cfg: RunConfig = serde_json::from_str(r#"{ "train": { "path": "a.jsonl" } }"#).unwrap();

        assert_eq!(cfg.train.path, "a.jsonl");
        assert_eq!(cfg.train.text_field, "text");
        assert!(cfg.eval.is_none());
        assert_eq!(cfg.pipeline, PipelineConfig::default());
        assert_eq!(cfg.model.num_tokens, 20000);
        assert_eq!(cfg.tokenizer_dir, "tokenizer");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_override() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{
                "pipeline": { "sequence_length": 16, "batch_size": 2 },
                "train":    { "path": "t.jsonl", "text_field": "content" },
                "eval":     { "path": "e.jsonl", "example_buffer": 5 },
                "model":    { "dim": 32, "depth": 1 }
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.pipeline.sequence_length, 16);
        assert_eq!(cfg.pipeline.batch_size, 2);
        assert_eq!(cfg.pipeline.seed, 42);
        assert_eq!(cfg.train.text_field, "content");
        assert_eq!(cfg.model.dim, 32);
        assert_eq!(cfg.model.heads, 8);

        let names: Vec<&str> = cfg.splits().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["train", "eval"]);
        assert_eq!(cfg.splits()[1].1.example_buffer, 5);
    }

    #[test]
    fn test_model_section_with_one_field() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{ "train": { "path": "t.jsonl" }, "model": { "relative_position_buckets": 16 } }"#,
        )
        .unwrap();

        assert_eq!(cfg.model.relative_position_buckets, 16);
        assert_eq!(cfg.model.relative_position_max_distance, 128);
        assert_eq!(cfg.model.num_tokens, 20000);
        assert_eq!(cfg.model.dim_head, 64);
    }

    #[test]
    fn test_model_section_must_be_an_object() {
        let parsed = serde_json::from_str::<RunConfig>(
            r#"{ "train": { "path": "t.jsonl" }, "model": 3 }"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_reports_bad_sections() {
        let mut cfg = RunConfig::new(SplitConfig::new("t.jsonl"));
        cfg.pipeline.batch_size = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::new(SplitConfig::new("t.jsonl"));
        cfg.model = cfg.model.with_dim_head(0);
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::new(SplitConfig::new("t.jsonl"));
        let mut eval = SplitConfig::new("e.jsonl");
        eval.example_buffer = 0;
        cfg.eval = Some(eval);
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("eval"));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = RunConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
