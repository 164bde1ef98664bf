// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Concerns that touch the filesystem but belong to no single
// business layer:
//
//   tokenizer_store.rs — Tokenizer persistence
//                        Loads tokenizer.json if present,
//                        otherwise builds a word-level one from
//                        a corpus sample and saves it, so every
//                        run over the same directory uses the
//                        same vocabulary. Also adapts
//                        tokenizers::Tokenizer to TextTokenizer.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Tokenizer loading, building, and the TextTokenizer adapter
pub mod tokenizer_store;
