// ============================================================
// Layer 4 — Sequence Packer
// ============================================================
// Concatenates tokenized examples into one running stream and
// cuts it into non-overlapping blocks of exactly L tokens.
//
// Why pack instead of pad?
//   Padding every example to L wastes compute on [PAD] tokens.
//   Packing keeps every position a real token; the price is
//   that a block may span the end of one example and the start
//   of the next.
//
// Example with L = 4:
//   examples:  [1,2,3]  []  [4,5,6,7,8,9]
//   stream:    1 2 3 4 5 6 7 8 9
//   blocks:    [1,2,3,4] [5,6,7,8]
//   leftover:  [9] — held until more input arrives, and
//                    dropped if the stream ends first
//
// The packer is lazy: it pulls only as many examples as it
// needs to fill the next block.

use crate::domain::block::Block;
use crate::domain::example::TokenizedExample;
use crate::error::PipelineError;

/// Lazy iterator: Result<TokenizedExample> → Result<Block>
pub struct SequencePacker<I> {
    examples:        I,
    sequence_length: usize,
    /// Concatenated ids; `buffer[cursor..]` is not yet emitted
    buffer:          Vec<u32>,
    cursor:          usize,
    exhausted:       bool,
}

impl<I> SequencePacker<I>
where
    I: Iterator<Item = Result<TokenizedExample, PipelineError>>,
{
    /// Create a packer producing blocks of `sequence_length` tokens.
    ///
    /// # Errors
    /// `InvalidConfig` if `sequence_length` is zero.
    pub fn new(examples: I, sequence_length: usize) -> Result<Self, PipelineError> {
        if sequence_length == 0 {
            return Err(PipelineError::InvalidConfig(
                "sequence_length must be greater than zero".into(),
            ));
        }
        Ok(Self {
            examples,
            sequence_length,
            buffer: Vec::with_capacity(sequence_length * 2),
            cursor: 0,
            exhausted: false,
        })
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Tokens buffered but not yet emitted (always < L between pulls)
    pub fn remainder(&self) -> &[u32] {
        &self.buffer[self.cursor..]
    }
}

impl<I> Iterator for SequencePacker<I>
where
    I: Iterator<Item = Result<TokenizedExample, PipelineError>>,
{
    type Item = Result<Block, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // ── Emit while a full block is buffered ───────────────────────────
            let end = self.cursor + self.sequence_length;
            if end <= self.buffer.len() {
                let block   = Block::from_tokens(&self.buffer[self.cursor..end]);
                self.cursor = end;
                return Some(Ok(block));
            }

            if self.exhausted {
                return None;
            }

            // ── Shift the remainder to the front before refilling ─────────────
            self.buffer.drain(..self.cursor);
            self.cursor = 0;

            match self.examples.next() {
                Some(Ok(example)) if example.is_empty() => {
                    tracing::debug!("Skipping example with zero tokens");
                }
                Some(Ok(example)) => self.buffer.extend_from_slice(&example.input_ids),
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.exhausted = true;
                    if !self.buffer.is_empty() {
                        tracing::debug!(
                            "Dropping {} trailing tokens (shorter than sequence_length={})",
                            self.buffer.len(),
                            self.sequence_length
                        );
                    }
                }
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn examples(seqs: &[&[u32]]) -> Vec<Result<TokenizedExample, PipelineError>> {
        seqs.iter()
            .map(|s| Ok(TokenizedExample::new(s.to_vec())))
            .collect()
    }

    fn pack(seqs: &[&[u32]], l: usize) -> Vec<Block> {
        SequencePacker::new(examples(seqs).into_iter(), l)
            .unwrap()
            .map(|b| b.unwrap())
            .collect()
    }

    #[test]
    fn test_drops_trailing_remainder() {
        let blocks = pack(&[&[1, 2, 3, 4, 5, 6, 7, 8, 9]], 4);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].input_ids(), &[1, 2, 3, 4]);
        assert_eq!(blocks[1].input_ids(), &[5, 6, 7, 8]);
    }

    #[test]
    fn test_blocks_span_example_boundaries() {
        let blocks = pack(&[&[1, 2, 3], &[4, 5], &[6, 7, 8, 9, 10]], 4);
        assert_eq!(blocks[0].input_ids(), &[1, 2, 3, 4]);
        assert_eq!(blocks[1].input_ids(), &[5, 6, 7, 8]);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_empty_examples_are_skipped() {
        let blocks = pack(&[&[], &[1, 2], &[], &[3, 4], &[]], 2);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].input_ids(), &[3, 4]);
    }

    #[test]
    fn test_every_block_has_length_mask_and_labels() {
        let seqs: Vec<Vec<u32>> = (0..20u32)
            .map(|n| (0..(n * 7 % 11)).map(|t| t + n).collect())
            .collect();
        let refs: Vec<&[u32]> = seqs.iter().map(|s| s.as_slice()).collect();

        for block in pack(&refs, 5) {
            assert_eq!(block.input_ids().len(), 5);
            assert_eq!(block.attention_mask(), &[true; 5]);
            assert_eq!(block.labels(), block.input_ids());
        }
    }

    #[test]
    fn test_output_is_prefix_of_concatenation() {
        let seqs: Vec<Vec<u32>> = vec![(0..13).collect(), vec![], (100..117).collect(), vec![7]];
        let refs: Vec<&[u32]>   = seqs.iter().map(|s| s.as_slice()).collect();
        let all: Vec<u32>       = seqs.concat();

        for l in 1..=12 {
            let emitted: Vec<u32> = pack(&refs, l)
                .iter()
                .flat_map(|b| b.input_ids().to_vec())
                .collect();
            let expected_len = (all.len() / l) * l;
            assert_eq!(emitted, all[..expected_len].to_vec(), "L = {l}");
        }
    }

    #[test]
    fn test_remainder_is_kept_between_pulls() {
        let mut packer = SequencePacker::new(examples(&[&[1, 2, 3], &[4, 5, 6]]).into_iter(), 2)
            .unwrap();
        assert_eq!(packer.next().unwrap().unwrap().input_ids(), &[1, 2]);
        assert_eq!(packer.remainder(), &[3]);
        assert_eq!(packer.next().unwrap().unwrap().input_ids(), &[3, 4]);
        assert_eq!(packer.next().unwrap().unwrap().input_ids(), &[5, 6]);
        assert!(packer.next().is_none());
    }

    #[test]
    fn test_zero_sequence_length_is_rejected() {
        let result = SequencePacker::new(examples(&[&[1]]).into_iter(), 0);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_upstream_error_is_passed_through() {
        let input = vec![
            Ok(TokenizedExample::new(vec![1, 2])),
            Err(PipelineError::Tokenizer("bad".into())),
            Ok(TokenizedExample::new(vec![3, 4])),
        ];
        let out: Vec<_> = SequencePacker::new(input.into_iter(), 2).unwrap().collect();
        assert!(out[0].is_ok());
        assert!(out[1].is_err());
        assert_eq!(out[2].as_ref().unwrap().input_ids(), &[3, 4]);
    }
}
