// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The pipeline talks to its two external collaborators through
// these traits only:
//   - ExampleSource  → where raw records come from
//   - TextTokenizer  → how text becomes token ids
//
// JsonlSource implements ExampleSource; tokenizers::Tokenizer
// implements TextTokenizer (see infra/tokenizer_store.rs). Tests
// plug in tiny in-memory implementations of both.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use crate::domain::example::Example;
use crate::error::PipelineError;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// A restartable, possibly unbounded source of raw examples.
///
/// Each call to `examples()` starts a fresh pass; a pipeline is
/// restarted by rebuilding it from a new pass, never by rewinding.
pub trait ExampleSource {
    type Iter: Iterator<Item = Result<Example, PipelineError>>;

    /// Open a new lazy pass over the source.
    fn examples(&self) -> Result<Self::Iter, PipelineError>;
}

// ─── TextTokenizer ────────────────────────────────────────────────────────────
/// Maps text to token ids. Must be deterministic for a given
/// input and vocabulary.
pub trait TextTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, PipelineError>;
}

impl<T: TextTokenizer + ?Sized> TextTokenizer for &T {
    fn encode(&self, text: &str) -> Result<Vec<u32>, PipelineError> {
        (**self).encode(text)
    }
}
