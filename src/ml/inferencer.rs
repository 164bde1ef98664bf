// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Runs the language model over packed batches and reduces the
// logits to a small host-side summary that can be logged:
//
//   logits        [N, L, num_tokens]
//   mean / max    over every logit value
//   next-token    argmax at position t compared with labels[t+1]
//                 (labels are the inputs themselves, so the
//                 shift happens here, not in the packer)
//
// The model never sees the attention mask: every packed block
// is fully attended, and causality is enforced inside attention.
use burn::{prelude::*, tensor::ElementConversion};

use crate::data::batcher::BlockBatch;
use crate::error::ModelError;
use crate::ml::model::LanguageModel;

/// Host-side summary of one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardSummary {
    /// [batch, length, num_tokens]
    pub logits_shape: [usize; 3],
    pub mean_logit:   f32,
    pub max_logit:    f32,
    /// Fraction of positions whose argmax equals the following label
    pub next_token_agreement: f32,
}

pub struct Inferencer<B: Backend> {
    model: LanguageModel<B>,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: LanguageModel<B>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &LanguageModel<B> {
        &self.model
    }

    /// Raw logits for a batch: [N, L, num_tokens]
    pub fn logits(&self, batch: &BlockBatch<B>) -> Result<Tensor<B, 3>, ModelError> {
        self.model.forward(batch.input_ids.clone())
    }

    pub fn summarize(&self, batch: &BlockBatch<B>) -> Result<ForwardSummary, ModelError> {
        let logits = self.logits(batch)?;
        let [n, len, vocab] = logits.dims();

        let mean_logit = logits.clone().mean().into_scalar().elem::<f32>();
        let max_logit  = logits.clone().max().into_scalar().elem::<f32>();

        // ── Next-token agreement ──────────────────────────────────────────────
        // prediction at t vs label at t+1, over the first len-1 positions
        let next_token_agreement = if len < 2 {
            0.0
        } else {
            let predicted = logits.argmax(2).reshape([n, len]).narrow(1, 0, len - 1);
            let targets   = batch.labels.clone().narrow(1, 1, len - 1);
            let hits      = predicted.equal(targets).int().sum().into_scalar().elem::<i64>();
            hits as f32 / (n * (len - 1)) as f32
        };

        let summary = ForwardSummary {
            logits_shape: [n, len, vocab],
            mean_logit,
            max_logit,
            next_token_agreement,
        };
        tracing::debug!("Forward summary: {:?}", summary);
        Ok(summary)
    }
}
