// ============================================================
// Layer 5 — T5 Relative Position Bias
// ============================================================
// Instead of adding position embeddings to the tokens, every
// attention score gets a learned scalar that depends only on
// how far back the key is from the query.
//
// Distances are bucketed on a split scale:
//
//   n = max(-(key_pos - query_pos), 0)     (how far back)
//   max_exact = num_buckets / 2
//
//   n <  max_exact → bucket = n                        (linear)
//   n >= max_exact → bucket = max_exact
//                      + floor( ln(n / max_exact)
//                             / ln(max_distance / max_exact)
//                             * (num_buckets - max_exact) )
//                    clamped to num_buckets - 1          (log)
//
// Example with num_buckets = 32, max_distance = 128:
//   n = 0..15   → buckets 0..15, one per distance
//   n = 16..127 → buckets 16..31, wider and wider ranges
//   n >= 128    → bucket 31
//
// Keys in the future (key_pos > query_pos) clamp to n = 0 and
// share bucket 0 with the diagonal; the causal mask removes them
// anyway, so only the one-sided scale matters in this model.
//
// Each bucket maps to one learned value per head, scaled by
// sqrt(dim_head) to match the 1/sqrt(dim_head) on the queries.
//
// Reference: Raffel et al. (2020) T5 paper, §2.1

use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
    tensor::TensorData,
};

/// Bucket index for one signed relative position (key - query).
///
/// # Panics
/// If the result falls outside `[0, num_buckets)`, which can only
/// happen with a configuration that skipped validation.
pub fn relative_position_bucket(
    relative_position: i64,
    num_buckets:       usize,
    max_distance:      usize,
) -> usize {
    let n         = relative_position.saturating_neg().max(0) as usize;
    let max_exact = num_buckets / 2;

    let bucket = if n < max_exact {
        n
    } else {
        let log_ratio = (n as f64 / max_exact as f64).ln()
            / (max_distance as f64 / max_exact as f64).ln();
        let large = max_exact + (log_ratio * (num_buckets - max_exact) as f64) as usize;
        large.min(num_buckets - 1)
    };

    assert!(
        bucket < num_buckets,
        "relative position bucket {bucket} out of range for {num_buckets} buckets"
    );
    bucket
}

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct RelativePositionBiasConfig {
    /// One learned scalar per head for every bucket
    pub heads: usize,
    /// Multiplier applied to the looked-up values
    pub scale: f64,
    #[config(default = 32)]
    pub num_buckets: usize,
    #[config(default = 128)]
    pub max_distance: usize,
}

impl RelativePositionBiasConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RelativePositionBias<B> {
        RelativePositionBias {
            relative_attention_bias: EmbeddingConfig::new(self.num_buckets, self.heads).init(device),
            num_buckets:  self.num_buckets,
            max_distance: self.max_distance,
            heads:        self.heads,
            scale:        self.scale as f32,
        }
    }
}

// ─── Module ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct RelativePositionBias<B: Backend> {
    /// [num_buckets, heads] lookup table, read-only during forward
    pub relative_attention_bias: Embedding<B>,
    pub num_buckets:  usize,
    pub max_distance: usize,
    pub heads:        usize,
    pub scale:        f32,
}

impl<B: Backend> RelativePositionBias<B> {
    /// Row-major [query_len, key_len] bucket matrix.
    pub fn buckets(&self, query_len: usize, key_len: usize) -> Vec<i32> {
        (0..query_len)
            .flat_map(|q| {
                (0..key_len).map(move |k| {
                    let relative = k as i64 - q as i64;
                    relative_position_bucket(relative, self.num_buckets, self.max_distance) as i32
                })
            })
            .collect()
    }

    /// Bias for every (head, query, key) triple: [heads, query_len, key_len]
    pub fn forward(&self, query_len: usize, key_len: usize, device: &B::Device) -> Tensor<B, 3> {
        let buckets = Tensor::<B, 2, Int>::from_data(
            TensorData::new(self.buckets(query_len, key_len), [1, query_len * key_len]),
            device,
        );

        // [1, i*j] → [1, i*j, heads] → [i, j, heads] → [heads, i, j]
        self.relative_attention_bias
            .forward(buckets)
            .reshape([query_len, key_len, self.heads])
            .permute([2, 0, 1])
            .mul_scalar(self.scale)
    }
}
