// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model code lives here. The data layer only touches burn
// to stack finished batches into tensors; everything that owns
// parameters is in this layer.
//
// Module order follows the forward pass, innermost first:
//
//   position_bias.rs — T5 relative position buckets and the
//                      learned per-head bias table
//
//   attention.rs     — causal multi-query self-attention
//                      • one shared key/value head
//                      • relative bias added to the scores
//                      • -f32::MAX causal mask, stable softmax
//
//   feedforward.rs   — GEGLU position-wise network
//
//   transformer.rs   — D pre-norm residual layers
//
//   model.rs         — token embedding → stack → norm → logits
//
//   inferencer.rs    — runs the model over packed batches and
//                      summarises the logits for logging
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need
//            Thoppilan et al. (2022) LaMDA

/// T5-style relative position bias
pub mod position_bias;

/// Causal multi-query self-attention
pub mod attention;

/// Gated GELU feed-forward network
pub mod feedforward;

/// Stack of pre-norm residual layers
pub mod transformer;

/// Decoder-only language model head
pub mod model;

/// Forward pass over packed batches with logit summaries
pub mod inferencer;
