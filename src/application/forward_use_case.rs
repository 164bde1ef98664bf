// ============================================================
// Layer 2 — ForwardUseCase
// ============================================================
// Runs packed batches through a freshly initialised language
// model and logs what comes out:
//
//   Step 1: Validate the merged config
//   Step 2: Load / build the tokenizer      (Layer 6 - infra)
//   Step 3: Check vocabulary vs num_tokens
//   Step 4: Initialise the model            (Layer 5 - ml)
//   Step 5: For each split, pull up to
//           max_batches batches              (Layer 4 - data)
//           and summarise their logits      (Layer 5 - ml)
//
// Generic over the burn backend; the CLI picks NdArray (cpu)
// or Wgpu (gpu).

use anyhow::{Context, Result};
use burn::prelude::*;

use crate::application::config::RunConfig;
use crate::data::{batcher::BlockBatcher, loader::JsonlSource, pipeline::packed_batches};
use crate::ml::inferencer::{ForwardSummary, Inferencer};

/// Aggregate over the batches of one split
#[derive(Debug, Clone, PartialEq)]
pub struct SplitReport {
    pub split:        String,
    pub batches:      usize,
    /// Shape of the last batch's logits, [0, 0, 0] if none ran
    pub logits_shape: [usize; 3],
    pub mean_logit:   f32,
    pub next_token_agreement: f32,
}

pub struct ForwardUseCase<B: Backend> {
    config:      RunConfig,
    device:      B::Device,
    max_batches: usize,
}

impl<B: Backend> ForwardUseCase<B> {
    pub fn new(config: RunConfig, device: B::Device, max_batches: usize) -> Self {
        Self { config, device, max_batches }
    }

    pub fn execute(&self) -> Result<Vec<SplitReport>> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        let tokenizer = cfg.tokenizer()?;

        // ── Step 3: Every id the tokenizer emits must fit the embedding ───────
        let vocab_size = tokenizer.get_vocab_size(true);
        anyhow::ensure!(
            vocab_size <= cfg.model.num_tokens,
            "Tokenizer has {} entries but the model only embeds {} tokens",
            vocab_size,
            cfg.model.num_tokens
        );

        // ── Step 4: Model ─────────────────────────────────────────────────────
        let model = cfg.model.init::<B>(&self.device)?;
        tracing::info!(
            "Model ready: {} parameters, depth={}, dim={}, heads={}",
            model.num_params(),
            cfg.model.depth,
            cfg.model.dim,
            cfg.model.heads
        );
        let inferencer = Inferencer::new(model);
        let batcher    = BlockBatcher::<B>::new(self.device.clone());

        // ── Step 5: Run each split ────────────────────────────────────────────
        let mut reports = Vec::new();
        for (name, split) in cfg.splits() {
            let source  = JsonlSource::new(&split.path, &split.text_field);
            let batches = packed_batches(&source, &tokenizer, split.example_buffer, &cfg.pipeline)
                .with_context(|| format!("Cannot build {name} pipeline"))?;

            let mut summaries: Vec<ForwardSummary> = Vec::new();
            for batch in batches.take(self.max_batches) {
                let batch   = batch.with_context(|| format!("Pipeline failed on {name} split"))?;
                let summary = inferencer.summarize(&batcher.batch(&batch))?;
                tracing::info!(
                    "[{}] batch {:>4} | logits {:?} | mean {:.4} | max {:.4} | next-token {:.3}",
                    name,
                    summaries.len() + 1,
                    summary.logits_shape,
                    summary.mean_logit,
                    summary.max_logit,
                    summary.next_token_agreement
                );
                summaries.push(summary);
            }

            let report = aggregate(name, &summaries);
            if report.batches == 0 {
                tracing::warn!("[{}] produced no full batch", name);
            }
            reports.push(report);
        }

        Ok(reports)
    }
}

fn aggregate(split: &str, summaries: &[ForwardSummary]) -> SplitReport {
    let batches = summaries.len();
    let mean    = |f: fn(&ForwardSummary) -> f32| {
        if batches == 0 {
            0.0
        } else {
            summaries.iter().map(f).sum::<f32>() / batches as f32
        }
    };

    SplitReport {
        split:        split.to_string(),
        batches,
        logits_shape: summaries.last().map(|s| s.logits_shape).unwrap_or([0, 0, 0]),
        mean_logit:   mean(|s| s.mean_logit),
        next_token_agreement: mean(|s| s.next_token_agreement),
    }
}
