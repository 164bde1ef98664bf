// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer turns a raw text corpus into packed, shuffled,
// fixed-size batches ready for the model.
//
// The pipeline flows in this order:
//
//   .jsonl records
//       │
//       ▼
//   JsonlSource       → streams records, keeps the text field
//       │
//       ▼
//   ShuffleBuffer     → windowed shuffle of documents
//       │
//       ▼
//   tokenize          → text → token ids
//       │
//       ▼
//   SequencePacker    → concatenate and cut into L-token Blocks
//       │
//       ▼
//   ShuffleBuffer     → windowed shuffle of Blocks
//       │
//       ▼
//   Batcher           → exactly N Blocks per Batch
//       │
//       ▼
//   BlockBatcher      → [N, L] Burn tensors
//
// Each stage is a lazy Iterator responsible for exactly one
// step, so each is independently testable and replaceable.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Streams examples from JSON-lines files
pub mod loader;

/// Lazily applies a tokenizer to each example
pub mod tokenize;

/// Concatenates token streams into fixed-length blocks
pub mod packer;

/// Bounded-memory windowed shuffle
pub mod shuffle;

/// Groups blocks into batches and stacks them into tensors
pub mod batcher;

/// Configuration and assembly of the full chain
pub mod pipeline;
