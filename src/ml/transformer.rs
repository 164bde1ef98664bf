// ============================================================
// Layer 5 — Transformer Stack
// ============================================================
// D identical layers, applied strictly in order. Each layer is
// pre-normalised with a residual connection around both halves:
//
//   x = x + attention(norm_1(x))
//   x = x + feedforward(norm_2(x))
//
// The residual and normalisation are written inline as that
// expression rather than as wrapper modules — the contract is
// "output = input + f(normalize(input))", nothing more.
//
// Reference: Xiong et al. (2020) On Layer Normalization in the
//            Transformer Architecture (pre-LN)

use burn::{
    nn::{LayerNorm, LayerNormConfig},
    prelude::*,
};

use crate::ml::attention::{CausalSelfAttention, CausalSelfAttentionConfig};
use crate::ml::feedforward::{FeedForward, FeedForwardConfig};

#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub dim:          usize,
    pub depth:        usize,
    pub heads:        usize,
    pub dim_head:     usize,
    #[config(default = 4)]
    pub ff_mult:      usize,
    #[config(default = 0.0)]
    pub dropout:      f64,
    #[config(default = 32)]
    pub num_buckets:  usize,
    #[config(default = 128)]
    pub max_distance: usize,
}

impl TransformerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Transformer<B> {
        let layers = (0..self.depth)
            .map(|_| self.build_layer(device))
            .collect();
        Transformer { layers }
    }

    fn build_layer<B: Backend>(&self, device: &B::Device) -> TransformerLayer<B> {
        let attn = CausalSelfAttentionConfig::new(self.dim)
            .with_heads(self.heads)
            .with_dim_head(self.dim_head)
            .with_dropout(self.dropout)
            .with_num_buckets(self.num_buckets)
            .with_max_distance(self.max_distance)
            .init(device);
        let ff = FeedForwardConfig::new(self.dim)
            .with_mult(self.ff_mult)
            .with_dropout(self.dropout)
            .init(device);

        TransformerLayer {
            attn_norm: LayerNormConfig::new(self.dim).init(device),
            attn,
            ff_norm:   LayerNormConfig::new(self.dim).init(device),
            ff,
        }
    }
}

#[derive(Module, Debug)]
pub struct TransformerLayer<B: Backend> {
    pub attn_norm: LayerNorm<B>,
    pub attn:      CausalSelfAttention<B>,
    pub ff_norm:   LayerNorm<B>,
    pub ff:        FeedForward<B>,
}

impl<B: Backend> TransformerLayer<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = x.clone() + self.attn.forward(self.attn_norm.forward(x));
        x.clone() + self.ff.forward(self.ff_norm.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct Transformer<B: Backend> {
    pub layers: Vec<TransformerLayer<B>>,
}

impl<B: Backend> Transformer<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.layers.iter().fold(x, |x, layer| layer.forward(x))
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}
