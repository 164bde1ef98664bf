// ============================================================
// Layer 4 — Pipeline Assembly
// ============================================================
// Wires the lazy stages together, leaves first:
//
//   ExampleSource::examples()       raw records (text only)
//       │
//       ▼
//   ShuffleBuffer (example_buffer)   reorder documents
//       │
//       ▼
//   tokenize()                       text → token ids
//       │
//       ▼
//   SequencePacker (L)               ids → Blocks
//       │
//       ▼
//   ShuffleBuffer (block buffer)     reorder blocks
//       │
//       ▼
//   Batcher (N)                      Blocks → Batches
//
// Every stage is a plain Iterator pulled by the next one, so the
// whole chain runs in bounded memory and stops as soon as the
// consumer stops pulling. To restart, build a new pipeline from
// the source — there is no rewind.

use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::Batcher,
    packer::SequencePacker,
    shuffle::ShuffleBuffer,
    tokenize::tokenize,
};
use crate::domain::block::Batch;
use crate::domain::traits::{ExampleSource, TextTokenizer};
use crate::error::PipelineError;

// ─── PipelineConfig ───────────────────────────────────────────────────────────
/// Settings shared by the train and eval pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// L — tokens per packed block
    pub sequence_length:         usize,
    /// B — blocks held by the block-level shuffle buffer
    pub shuffle_buffer_capacity: usize,
    /// N — blocks per batch
    pub batch_size:              usize,
    /// Seed for both shuffle buffers
    pub seed:                    u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sequence_length:         2048,
            shuffle_buffer_capacity: 10_000,
            batch_size:              4,
            seed:                    42,
        }
    }
}

impl PipelineConfig {
    /// Reject impossible settings before any data flows.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.sequence_length == 0 {
            return Err(PipelineError::InvalidConfig(
                "sequence_length must be greater than zero".into(),
            ));
        }
        if self.shuffle_buffer_capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "shuffle_buffer_capacity must be at least 1".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ─── SplitConfig ──────────────────────────────────────────────────────────────
/// Where one split (train or eval) reads its examples from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Path to the .jsonl file
    pub path:           String,
    /// Column holding the text; every other column is dropped
    #[serde(default = "default_text_field")]
    pub text_field:     String,
    /// Examples held by the example-level shuffle buffer
    #[serde(default = "default_example_buffer")]
    pub example_buffer: usize,
}

fn default_text_field() -> String {
    "text".to_string()
}

fn default_example_buffer() -> usize {
    10_000
}

impl SplitConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path:           path.into(),
            text_field:     default_text_field(),
            example_buffer: default_example_buffer(),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.example_buffer == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "example_buffer for '{}' must be at least 1",
                self.path
            )));
        }
        Ok(())
    }
}

// ─── Assembly ─────────────────────────────────────────────────────────────────
/// Build the full lazy chain from a source to Batches.
///
/// `example_buffer` sizes the document-level shuffle; the block-level
/// shuffle uses `config.shuffle_buffer_capacity`. The two buffers draw
/// from different seeds derived from `config.seed`.
pub fn packed_batches<S, T>(
    source:         &S,
    tokenizer:      T,
    example_buffer: usize,
    config:         &PipelineConfig,
) -> Result<impl Iterator<Item = Result<Batch, PipelineError>>, PipelineError>
where
    S: ExampleSource,
    T: TextTokenizer,
{
    config.validate()?;

    let examples = ShuffleBuffer::new(source.examples()?, example_buffer, config.seed)?;
    let tokens   = tokenize(examples, tokenizer);
    let blocks   = SequencePacker::new(tokens, config.sequence_length)?;
    let blocks   = ShuffleBuffer::new(
        blocks,
        config.shuffle_buffer_capacity,
        config.seed.wrapping_add(1),
    )?;

    tracing::debug!(
        "Pipeline ready: L={}, block buffer={}, N={}, example buffer={}",
        config.sequence_length,
        config.shuffle_buffer_capacity,
        config.batch_size,
        example_buffer
    );

    Batcher::new(blocks, config.batch_size)
}
