// ============================================================
// Layer 5 — Language Model Head
// ============================================================
// Full autoregressive forward pass:
//
//   tokens  [b, n]            Int ids in [0, num_tokens)
//   embed   [b, n, dim]       token embedding (no position
//                             embedding, order comes from the
//                             relative bias inside attention)
//   stack   [b, n, dim]       depth × TransformerLayer
//   norm    [b, n, dim]       final LayerNorm
//   logits  [b, n, num_tokens]
//
// Token ids are range-checked before anything runs, so a
// tokenizer / vocabulary mismatch surfaces as a typed error
// instead of an out-of-bounds gather deep inside the backend.
//
// Reference: Thoppilan et al. (2022) LaMDA
//            Radford et al. (2019) GPT-2 (decoder-only LM)

use burn::{
    nn::{Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
    tensor::ElementConversion,
};

use crate::error::ModelError;
use crate::ml::transformer::{Transformer, TransformerConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct LanguageModelConfig {
    #[config(default = 20000)]
    pub num_tokens:                     usize,
    #[config(default = 512)]
    pub dim:                            usize,
    #[config(default = 12)]
    pub depth:                          usize,
    #[config(default = 8)]
    pub heads:                          usize,
    #[config(default = 64)]
    pub dim_head:                       usize,
    #[config(default = 4)]
    pub feedforward_mult:               usize,
    #[config(default = 0.0)]
    pub dropout_rate:                   f64,
    #[config(default = 32)]
    pub relative_position_buckets:      usize,
    #[config(default = 128)]
    pub relative_position_max_distance: usize,
}

impl LanguageModelConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        let positive = [
            ("num_tokens",       self.num_tokens),
            ("dim",              self.dim),
            ("heads",            self.heads),
            ("dim_head",         self.dim_head),
            ("feedforward_mult", self.feedforward_mult),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ModelError::InvalidConfig(format!("{name} must be at least 1")));
        }

        // The log regime divides by max_exact = buckets / 2 and by
        // ln(max_distance / max_exact); both must be positive.
        if self.relative_position_buckets < 2 {
            return Err(ModelError::InvalidConfig(format!(
                "relative_position_buckets must be at least 2, got {}",
                self.relative_position_buckets
            )));
        }
        let max_exact = self.relative_position_buckets / 2;
        if self.relative_position_max_distance <= max_exact {
            return Err(ModelError::InvalidConfig(format!(
                "relative_position_max_distance ({}) must exceed relative_position_buckets / 2 ({})",
                self.relative_position_max_distance, max_exact
            )));
        }

        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(ModelError::InvalidConfig(format!(
                "dropout_rate must lie in [0, 1), got {}",
                self.dropout_rate
            )));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<LanguageModel<B>, ModelError> {
        self.validate()?;

        let transformer = TransformerConfig::new(self.dim, self.depth, self.heads, self.dim_head)
            .with_ff_mult(self.feedforward_mult)
            .with_dropout(self.dropout_rate)
            .with_num_buckets(self.relative_position_buckets)
            .with_max_distance(self.relative_position_max_distance)
            .init(device);

        Ok(LanguageModel {
            token_emb:  EmbeddingConfig::new(self.num_tokens, self.dim).init(device),
            transformer,
            norm:       LayerNormConfig::new(self.dim).init(device),
            to_logits:  LinearConfig::new(self.dim, self.num_tokens).init(device),
            num_tokens: self.num_tokens,
        })
    }
}

#[derive(Module, Debug)]
pub struct LanguageModel<B: Backend> {
    pub token_emb:   Embedding<B>,
    pub transformer: Transformer<B>,
    pub norm:        LayerNorm<B>,
    pub to_logits:   Linear<B>,
    pub num_tokens:  usize,
}

impl<B: Backend> LanguageModel<B> {
    /// tokens: [batch, len] → logits: [batch, len, num_tokens]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Result<Tensor<B, 3>, ModelError> {
        self.check_tokens(&tokens)?;

        let x = self.token_emb.forward(tokens);
        let x = self.transformer.forward(x);
        let x = self.norm.forward(x);
        Ok(self.to_logits.forward(x))
    }

    fn check_tokens(&self, tokens: &Tensor<B, 2, Int>) -> Result<(), ModelError> {
        let [batch, len] = tokens.dims();
        if batch == 0 || len == 0 {
            return Err(ModelError::ShapeMismatch {
                expected: "[batch >= 1, len >= 1]".to_string(),
                got:      format!("[{batch}, {len}]"),
            });
        }

        let min = tokens.clone().min().into_scalar().elem::<i64>();
        let max = tokens.clone().max().into_scalar().elem::<i64>();
        let offending = if min < 0 {
            Some(min)
        } else if max >= self.num_tokens as i64 {
            Some(max)
        } else {
            None
        };

        match offending {
            Some(token) => Err(ModelError::TokenOutOfRange { token, num_tokens: self.num_tokens }),
            None        => Ok(()),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;

    type TestBackend = burn::backend::NdArray;

    fn small_config() -> LanguageModelConfig {
        LanguageModelConfig::new()
            .with_num_tokens(50)
            .with_dim(16)
            .with_depth(2)
            .with_heads(2)
            .with_dim_head(8)
            .with_feedforward_mult(2)
            .with_relative_position_buckets(8)
            .with_relative_position_max_distance(16)
    }

    fn tokens(ids: Vec<i32>, shape: [usize; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::from_data(TensorData::new(ids, shape), &Default::default())
    }

    #[test]
    fn test_defaults() {
        let cfg = LanguageModelConfig::new();
        assert_eq!(cfg.num_tokens, 20000);
        assert_eq!(cfg.dim, 512);
        assert_eq!(cfg.depth, 12);
        assert_eq!(cfg.heads, 8);
        assert_eq!(cfg.dim_head, 64);
        assert_eq!(cfg.feedforward_mult, 4);
        assert_eq!(cfg.relative_position_buckets, 32);
        assert_eq!(cfg.relative_position_max_distance, 128);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_logits_shape_invariant() {
        let device = Default::default();
        let model  = small_config().init::<TestBackend>(&device).unwrap();

        for &(batch, len) in &[(1, 1), (2, 5), (3, 9)] {
            let ids: Vec<i32> = (0..batch * len).map(|i| (i % 50) as i32).collect();
            let logits = model.forward(tokens(ids, [batch, len])).unwrap();
            assert_eq!(logits.dims(), [batch, len, 50]);
        }
    }

    #[test]
    fn test_zero_depth_model_runs() {
        let device = Default::default();
        let model  = small_config().with_depth(0).init::<TestBackend>(&device).unwrap();
        let logits = model.forward(tokens(vec![1, 2, 3], [1, 3])).unwrap();
        assert_eq!(logits.dims(), [1, 3, 50]);
    }

    #[test]
    fn test_token_out_of_range_is_rejected() {
        let device = Default::default();
        let model  = small_config().init::<TestBackend>(&device).unwrap();

        let err = model.forward(tokens(vec![1, 50], [1, 2])).unwrap_err();
        assert!(matches!(err, ModelError::TokenOutOfRange { token: 50, num_tokens: 50 }));

        let err = model.forward(tokens(vec![-3, 4], [1, 2])).unwrap_err();
        assert!(matches!(err, ModelError::TokenOutOfRange { token: -3, .. }));
    }

    #[test]
    fn test_packed_id_above_i32_range_is_reported_as_is() {
        use crate::data::batcher::BlockBatcher;
        use crate::domain::block::{Batch, Block};

        let device = Default::default();
        let model  = small_config().init::<TestBackend>(&device).unwrap();
        let batch  = Batch::new(vec![Block::from_tokens(&[1, u32::MAX])]);
        let input  = BlockBatcher::<TestBackend>::new(device).batch(&batch);

        let err = model.forward(input.input_ids).unwrap_err();
        assert!(matches!(
            err,
            ModelError::TokenOutOfRange { token: 4_294_967_295, num_tokens: 50 }
        ));
    }

    #[test]
    fn test_logits_are_causal() {
        // Editing the last token leaves every earlier position's logits untouched
        let device = Default::default();
        let model  = small_config().init::<TestBackend>(&device).unwrap();

        let a = model.forward(tokens(vec![3, 7, 11, 13], [1, 4])).unwrap();
        let b = model.forward(tokens(vec![3, 7, 11, 42], [1, 4])).unwrap();

        let a: Vec<f32> = a.narrow(1, 0, 3).into_data().convert::<f32>().to_vec::<f32>().unwrap();
        let b: Vec<f32> = b.narrow(1, 0, 3).into_data().convert::<f32>().to_vec::<f32>().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let bad = [
            small_config().with_dim_head(0),
            small_config().with_heads(0),
            small_config().with_dim(0),
            small_config().with_num_tokens(0),
            small_config().with_relative_position_buckets(1),
            small_config().with_relative_position_max_distance(4),
            small_config().with_dropout_rate(1.0),
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.validate(), Err(ModelError::InvalidConfig(_))),
                "accepted {cfg:?}"
            );
        }
    }
}
