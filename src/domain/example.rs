// ============================================================
// Layer 3 — Example Domain Types
// ============================================================
// An Example is one record pulled from the raw source. Sources
// may carry any number of metadata columns (url, timestamp, ...)
// but only the designated text field survives parsing.
//
// A TokenizedExample is what the tokenizer adapter returns for
// one Example. It may be empty (e.g. empty text); the packer
// skips such examples without complaint.

use serde::{Deserialize, Serialize};

/// One raw text record with every non-text column already discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// The designated text field of the source record
    pub text: String,
}

impl Example {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Token ids for a single Example, variable length (possibly zero).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenizedExample {
    pub input_ids: Vec<u32>,
}

impl TokenizedExample {
    pub fn new(input_ids: Vec<u32>) -> Self {
        Self { input_ids }
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

impl From<Vec<u32>> for TokenizedExample {
    fn from(input_ids: Vec<u32>) -> Self {
        Self::new(input_ids)
    }
}
