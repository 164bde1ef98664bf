// ============================================================
// Layer 4 — Batcher
// ============================================================
// Two steps live here:
//
//   Batcher       — groups the shuffled Block stream into
//                   host-side Batches of exactly N blocks
//   BlockBatcher  — stacks one Batch into Burn tensors
//
// Why drop the last partial group?
//   Every Batch must be exactly [N, L]. A stream of N + k blocks
//   (0 < k < N) yields one batch; the k leftovers are discarded
//   rather than padded, so the model never sees a ragged batch.
//
// How stacking works:
//   Input:  N Blocks, each with L ids
//   Output: BlockBatch with tensors of shape [N, L]
//
//   We flatten all ids into one long Vec, then reshape:
//   [b1_t1, b1_t2, ..., b1_tL, b2_t1, ..., bN_tL] → [N, L]
//
// Reference: Burn Book §4 (Batcher)
//            Rust Book §8 (Vectors)

use burn::{prelude::*, tensor::TensorData};

use crate::domain::block::{Batch, Block};
use crate::error::PipelineError;

// ─── Batcher ──────────────────────────────────────────────────────────────────
/// Lazy iterator: Result<Block> → Result<Batch>, exactly N per batch.
pub struct Batcher<I> {
    blocks:     I,
    batch_size: usize,
}

impl<I> Batcher<I>
where
    I: Iterator<Item = Result<Block, PipelineError>>,
{
    /// # Errors
    /// `InvalidConfig` if `batch_size` is zero.
    pub fn new(blocks: I, batch_size: usize) -> Result<Self, PipelineError> {
        if batch_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        Ok(Self { blocks, batch_size })
    }
}

impl<I> Iterator for Batcher<I>
where
    I: Iterator<Item = Result<Block, PipelineError>>,
{
    type Item = Result<Batch, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut group = Vec::with_capacity(self.batch_size);

        while group.len() < self.batch_size {
            match self.blocks.next() {
                Some(Ok(block)) => group.push(block),
                Some(Err(e)) => {
                    if !group.is_empty() {
                        tracing::debug!(
                            "Discarding {} blocks of an unfinished batch after an upstream error",
                            group.len()
                        );
                    }
                    return Some(Err(e));
                }
                None => {
                    if !group.is_empty() {
                        tracing::debug!(
                            "Discarding {} blocks that do not fill a batch of {}",
                            group.len(),
                            self.batch_size
                        );
                    }
                    return None;
                }
            }
        }

        Some(Ok(Batch::new(group)))
    }
}

// ─── BlockBatch ───────────────────────────────────────────────────────────────
/// A batch of packed blocks ready for the model forward pass.
/// All tensors have shape [batch_size, sequence_length].
#[derive(Debug, Clone)]
pub struct BlockBatch<B: Backend> {
    /// Token ids — each row is one block
    pub input_ids: Tensor<B, 2, Int>,

    /// Always all-true in packed mode; kept so consumers that
    /// expect a mask column receive one
    pub attention_mask: Tensor<B, 2, Bool>,

    /// Copy of input_ids for next-token prediction
    pub labels: Tensor<B, 2, Int>,
}

// ─── BlockBatcher ─────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the
/// correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct BlockBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> BlockBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack one host Batch into [N, L] tensors.
    pub fn batch(&self, batch: &Batch) -> BlockBatch<B> {
        let [batch_size, seq_len] = batch.shape();

        // ── Flatten ids, mask and labels ──────────────────────────────────────
        // i64 holds every u32 id, so an out-of-vocabulary id reaches the
        // model's range check unchanged
        let ids_flat: Vec<i64> = batch
            .blocks()
            .iter()
            .flat_map(|b| b.input_ids().iter().map(|&x| i64::from(x)))
            .collect();

        let mask_flat: Vec<bool> = batch
            .blocks()
            .iter()
            .flat_map(|b| b.attention_mask().iter().copied())
            .collect();

        let labels_flat: Vec<i64> = batch
            .blocks()
            .iter()
            .flat_map(|b| b.labels().iter().map(|&x| i64::from(x)))
            .collect();

        // ── Create tensors ────────────────────────────────────────────────────
        let input_ids = Tensor::<B, 2, Int>::from_data(
            TensorData::new(ids_flat, [batch_size, seq_len]),
            &self.device,
        );
        let attention_mask = Tensor::<B, 2, Bool>::from_data(
            TensorData::new(mask_flat, [batch_size, seq_len]),
            &self.device,
        );
        let labels = Tensor::<B, 2, Int>::from_data(
            TensorData::new(labels_flat, [batch_size, seq_len]),
            &self.device,
        );

        BlockBatch { input_ids, attention_mask, labels }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn blocks(n: usize, l: usize) -> Vec<Result<Block, PipelineError>> {
        (0..n)
            .map(|i| {
                let ids: Vec<u32> = (0..l as u32).map(|t| i as u32 * 100 + t).collect();
                Ok(Block::from_tokens(&ids))
            })
            .collect()
    }

    fn batch_count(n: usize, batch_size: usize) -> usize {
        Batcher::new(blocks(n, 3).into_iter(), batch_size)
            .unwrap()
            .count()
    }

    #[test]
    fn test_partial_final_group_is_dropped() {
        // N + k blocks with 0 < k < N → exactly one batch
        assert_eq!(batch_count(4 + 3, 4), 1);
        assert_eq!(batch_count(4 + 1, 4), 1);
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(batch_count(12, 4), 3);
    }

    #[test]
    fn test_too_few_blocks_gives_nothing() {
        assert_eq!(batch_count(3, 4), 0);
        assert_eq!(batch_count(0, 4), 0);
    }

    #[test]
    fn test_every_batch_has_exactly_n_blocks() {
        for batch in Batcher::new(blocks(23, 5).into_iter(), 6).unwrap() {
            assert_eq!(batch.unwrap().shape(), [6, 5]);
        }
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        assert!(Batcher::new(blocks(2, 2).into_iter(), 0).is_err());
    }

    #[test]
    fn test_tensor_shapes_and_values() {
        let device  = Default::default();
        let batch   = Batcher::new(blocks(2, 3).into_iter(), 2)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let tensors = BlockBatcher::<TestBackend>::new(device).batch(&batch);

        assert_eq!(tensors.input_ids.dims(), [2, 3]);
        assert_eq!(tensors.attention_mask.dims(), [2, 3]);
        assert_eq!(tensors.labels.dims(), [2, 3]);

        let ids: Vec<i64> = tensors
            .input_ids
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .unwrap();
        assert_eq!(ids, vec![0, 1, 2, 100, 101, 102]);

        let mask: Vec<bool> = tensors.attention_mask.into_data().to_vec::<bool>().unwrap();
        assert!(mask.into_iter().all(|m| m));
    }

    #[test]
    fn test_upstream_error_mid_group_is_returned() {
        let stream = vec![
            Ok(Block::from_tokens(&[1, 2])),
            Err(PipelineError::InvalidConfig("broken block".into())),
            Ok(Block::from_tokens(&[3, 4])),
            Ok(Block::from_tokens(&[5, 6])),
        ];
        let mut batcher = Batcher::new(stream.into_iter(), 2).unwrap();

        // The half-built group holding [1, 2] goes with the error
        assert!(batcher.next().unwrap().is_err());
        let batch = batcher.next().unwrap().unwrap();
        assert_eq!(batch.blocks()[0].input_ids(), &[3, 4]);
        assert_eq!(batch.blocks()[1].input_ids(), &[5, 6]);
        assert!(batcher.next().is_none());
    }

    #[test]
    fn test_ids_above_i32_range_keep_their_value() {
        let block = Block::from_tokens(&[u32::MAX, 7]);
        let batch = Batcher::new(vec![Ok(block)].into_iter(), 1)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let tensors = BlockBatcher::<TestBackend>::new(Default::default()).batch(&batch);

        let ids: Vec<i64> = tensors.input_ids.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        let labels: Vec<i64> = tensors.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(ids, vec![4_294_967_295, 7]);
        assert_eq!(labels, ids);
    }
}
