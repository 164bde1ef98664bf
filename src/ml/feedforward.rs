// ============================================================
// Layer 5 — Gated Feed-Forward (GEGLU)
// ============================================================
// Position-wise network with a gated GELU in the middle:
//
//   h            = project_in(x)           [.., dim * mult * 2]
//   value, gates = split h in half         [.., dim * mult] each
//   g            = value * gelu(gates)
//   out          = project_out(dropout(g)) [.., dim]
//
// The gate lets the network scale each hidden unit by a smooth
// data-dependent factor instead of a fixed activation.
//
// Reference: Shazeer (2020) GLU Variants Improve Transformer

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::gelu,
};

#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    pub dim: usize,
    #[config(default = 4)]
    pub mult: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl FeedForwardConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        let inner_dim = self.dim * self.mult;
        FeedForward {
            project_in:  LinearConfig::new(self.dim, inner_dim * 2).init(device),
            project_out: LinearConfig::new(inner_dim, self.dim).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub project_in:  Linear<B>,
    pub project_out: Linear<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> FeedForward<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let hidden = geglu(self.project_in.forward(x));
        self.project_out.forward(self.dropout.forward(hidden))
    }
}

/// Split the last dimension in half and gate the first half with
/// GELU of the second.
pub fn geglu<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    let last  = D - 1;
    let inner = x.dims()[last] / 2;

    let value = x.clone().narrow(last, 0, inner);
    let gates = x.narrow(last, inner, inner);
    value * gelu(gates)
}
