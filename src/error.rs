// ============================================================
// Error Types
// ============================================================
// Typed errors for the two library halves:
//   PipelineError — source reading, tokenisation, packing config
//   ModelError    — model configuration and input validation
//
// The application and CLI layers wrap these in anyhow so the
// user sees a context chain; library callers can still match
// on the variants.
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Recoverable Errors with Result)

use thiserror::Error;

/// Errors raised while building or pulling the data pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A pipeline setting is out of range (e.g. sequence_length == 0).
    /// Raised at construction time, before any data flows.
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The tokenizer adapter failed on a piece of text
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Reading the example source failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building or running the language model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A model hyperparameter is out of range (e.g. dim_head == 0)
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    /// The tokenizer produced an id the embedding table cannot hold
    #[error("Token id {token} is outside the vocabulary [0, {num_tokens})")]
    TokenOutOfRange { token: i64, num_tokens: usize },

    /// Input tensor shape does not match what the component expects
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },
}
