// ============================================================
// Layer 5 — Causal Multi-Query Self-Attention
// ============================================================
// Shapes (b = batch, n = length, h = heads, d = dim_head):
//
//   x            [b, n, dim]
//   q = to_q(x)  [b, n, h*d] → [b, h, n, d], scaled by d^-0.5
//   k, v         [b, n, d] each — ONE key/value head shared by
//                all h query heads (multi-query attention)
//   scores       [b, h, n, n] = q · kᵀ + relative position bias
//   mask         position i may not look at j > i
//   weights      softmax over keys, dropout while training
//   out          [b, h, n, d] → [b, n, h*d] → to_out → [b, n, dim]
//
// Sharing one key/value head shrinks the k/v projections from
// h*d to d columns; every query head reads the same keys.
//
// Masked scores are set to -f32::MAX rather than -inf. The
// softmax subtracts each row's max first, so the masked entries
// underflow to exactly 0 and the diagonal (never masked) keeps
// every row finite.
//
// Reference: Shazeer (2019) Fast Transformer Decoding (MQA)
//            Vaswani et al. (2017) Attention Is All You Need

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::TensorData,
};

use crate::ml::position_bias::{RelativePositionBias, RelativePositionBiasConfig};

/// Score written into masked (future) positions
const MASK_VALUE: f32 = -f32::MAX;

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct CausalSelfAttentionConfig {
    pub dim: usize,
    #[config(default = 8)]
    pub heads: usize,
    #[config(default = 64)]
    pub dim_head: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
    #[config(default = 32)]
    pub num_buckets: usize,
    #[config(default = 128)]
    pub max_distance: usize,
}

impl CausalSelfAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CausalSelfAttention<B> {
        let inner_dim = self.heads * self.dim_head;

        CausalSelfAttention {
            to_q: LinearConfig::new(self.dim, inner_dim)
                .with_bias(false)
                .init(device),
            // keys and values come out of one projection: [k | v]
            to_kv: LinearConfig::new(self.dim, self.dim_head * 2)
                .with_bias(false)
                .init(device),
            to_out: LinearConfig::new(inner_dim, self.dim).init(device),
            rel_pos_bias: RelativePositionBiasConfig::new(self.heads, (self.dim_head as f64).sqrt())
                .with_num_buckets(self.num_buckets)
                .with_max_distance(self.max_distance)
                .init(device),
            dropout:  DropoutConfig::new(self.dropout).init(),
            heads:    self.heads,
            dim_head: self.dim_head,
            scale:    (self.dim_head as f32).powf(-0.5),
        }
    }
}

// ─── Module ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct CausalSelfAttention<B: Backend> {
    pub to_q:         Linear<B>,
    pub to_kv:        Linear<B>,
    pub to_out:       Linear<B>,
    pub rel_pos_bias: RelativePositionBias<B>,
    pub dropout:      Dropout,
    pub heads:        usize,
    pub dim_head:     usize,
    pub scale:        f32,
}

impl<B: Backend> CausalSelfAttention<B> {
    /// [b, n, dim] → [b, n, dim]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, len, _] = x.dims();

        let (q, k, v) = self.project(x);
        let weights   = self.dropout.forward(self.attend(q, k));

        // Every query head reads the single shared value head
        let v   = v.unsqueeze_dim::<4>(1).expand([batch, self.heads, len, self.dim_head]);
        let out = weights.matmul(v);

        // [b, h, n, d] → [b, n, h*d]
        let out = out.swap_dims(1, 2).reshape([batch, len, self.heads * self.dim_head]);
        self.to_out.forward(out)
    }

    /// Post-softmax attention weights [b, h, n, n], without dropout.
    pub fn attention_weights(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        let (q, k, _) = self.project(x);
        self.attend(q, k)
    }

    /// Returns q [b, h, n, d] (already scaled), k [b, n, d], v [b, n, d]
    fn project(&self, x: Tensor<B, 3>) -> (Tensor<B, 4>, Tensor<B, 3>, Tensor<B, 3>) {
        let [batch, len, _] = x.dims();

        let q = self
            .to_q
            .forward(x.clone())
            .reshape([batch, len, self.heads, self.dim_head])
            .swap_dims(1, 2)
            .mul_scalar(self.scale);

        let kv = self.to_kv.forward(x);
        let k  = kv.clone().narrow(2, 0, self.dim_head);
        let v  = kv.narrow(2, self.dim_head, self.dim_head);

        (q, k, v)
    }

    /// Scores + bias + causal mask → softmax weights
    fn attend(&self, q: Tensor<B, 4>, k: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch, heads, len, dim_head] = q.dims();
        let device = q.device();

        let k      = k.unsqueeze_dim::<4>(1).expand([batch, heads, len, dim_head]);
        let scores = q.matmul(k.swap_dims(2, 3)); // [b, h, n, n]

        // ── T5 relative position bias ─────────────────────────────────────────
        let bias = self
            .rel_pos_bias
            .forward(len, len, &device)
            .unsqueeze_dim::<4>(0)
            .expand([batch, heads, len, len]);
        let scores = scores + bias;

        // ── Causal mask ───────────────────────────────────────────────────────
        let mask = causal_mask::<B>(len, &device)
            .reshape([1, 1, len, len])
            .expand([batch, heads, len, len]);
        let scores = scores.mask_fill(mask, MASK_VALUE);

        stable_softmax(scores)
    }
}

/// [len, len] mask, `true` where key j lies in the future of query i (j > i).
pub fn causal_mask<B: Backend>(len: usize, device: &B::Device) -> Tensor<B, 2, Bool> {
    let data: Vec<bool> = (0..len)
        .flat_map(|i| (0..len).map(move |j| j > i))
        .collect();
    Tensor::from_data(TensorData::new(data, [len, len]), device)
}

/// Softmax over the last dimension with the row max subtracted first,
/// so huge negative sentinels never overflow exp().
pub fn stable_softmax<B: Backend>(scores: Tensor<B, 4>) -> Tensor<B, 4> {
    let dims    = scores.dims();
    let row_max = scores.clone().max_dim(3).expand(dims);
    let exp     = (scores - row_max).exp();
    let total   = exp.clone().sum_dim(3).expand(dims);
    exp / total
}
