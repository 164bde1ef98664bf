// ============================================================
// Layer 3 — Block and Batch Domain Types
// ============================================================
// A Block is exactly L contiguous real tokens cut from the
// concatenated token stream. There is no padding in packed
// mode, so:
//   - attention_mask is all `true`
//   - labels is an independent copy of input_ids
//
// Example with L = 4 and stream [1..9]:
//   Block 1: ids [1,2,3,4]  mask [T,T,T,T]  labels [1,2,3,4]
//   Block 2: ids [5,6,7,8]  mask [T,T,T,T]  labels [5,6,7,8]
//   token 9 is never emitted
//
// A Batch is exactly N Blocks. Partial batches do not exist.

use serde::{Deserialize, Serialize};

/// One fixed-length training sequence. Fields are private so a
/// Block cannot be edited after the packer creates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    input_ids:      Vec<u32>,
    attention_mask: Vec<bool>,
    labels:         Vec<u32>,
}

impl Block {
    /// Build a block from L real tokens.
    /// `labels` is cloned, not shared, so later shifting or masking
    /// of one side never leaks into the other.
    pub fn from_tokens(tokens: &[u32]) -> Self {
        Self {
            input_ids:      tokens.to_vec(),
            attention_mask: vec![true; tokens.len()],
            labels:         tokens.to_vec(),
        }
    }

    pub fn input_ids(&self) -> &[u32] {
        &self.input_ids
    }

    pub fn attention_mask(&self) -> &[bool] {
        &self.attention_mask
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Sequence length L
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Exactly N blocks, all of the same length L.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    blocks: Vec<Block>,
}

impl Batch {
    /// Only the batcher creates batches, and only once it holds N blocks.
    pub(crate) fn new(blocks: Vec<Block>) -> Self {
        debug_assert!(
            blocks.windows(2).all(|w| w[0].len() == w[1].len()),
            "all blocks in a batch share one sequence length"
        );
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Batch size N
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Sequence length L shared by every block
    pub fn sequence_length(&self) -> usize {
        self.blocks.first().map(Block::len).unwrap_or(0)
    }

    /// Shape of the stacked tensors: [N, L]
    pub fn shape(&self) -> [usize; 2] {
        [self.len(), self.sequence_length()]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_mask_is_all_attended() {
        let block = Block::from_tokens(&[7, 8, 9]);
        assert_eq!(block.attention_mask(), &[true, true, true]);
    }

    #[test]
    fn test_labels_match_ids_at_creation() {
        let block = Block::from_tokens(&[3, 1, 4, 1]);
        assert_eq!(block.labels(), block.input_ids());
        // Independent buffers, not two views of one
        assert_ne!(block.labels().as_ptr(), block.input_ids().as_ptr());
    }

    #[test]
    fn test_batch_shape() {
        let batch = Batch::new(vec![
            Block::from_tokens(&[1, 2]),
            Block::from_tokens(&[3, 4]),
            Block::from_tokens(&[5, 6]),
        ]);
        assert_eq!(batch.shape(), [3, 2]);
    }
}
