// ============================================================
// Layer 2 — PackUseCase
// ============================================================
// Runs the data pipeline on its own and writes the packed
// batches to disk, one JSON object per batch:
//
//   {"input_ids": [[..L..], ..N..], "attention_mask": [[..]], "labels": [[..]]}
//
//   Step 1: Validate the merged config
//   Step 2: Load / build the tokenizer     (Layer 6 - infra)
//   Step 3: For each split, build the lazy
//           pipeline and drain it          (Layer 4 - data)
//           into <output_dir>/<split>.jsonl
//
// Useful for inspecting what the model would see, or for
// feeding an external trainer.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use crate::application::config::RunConfig;
use crate::data::{loader::JsonlSource, pipeline::packed_batches};
use crate::domain::block::Batch;

/// Batches written for one split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackReport {
    pub split:   String,
    pub path:    PathBuf,
    pub batches: usize,
}

#[derive(Serialize)]
struct BatchRecord<'a> {
    input_ids:      Vec<&'a [u32]>,
    attention_mask: Vec<&'a [bool]>,
    labels:         Vec<&'a [u32]>,
}

impl<'a> From<&'a Batch> for BatchRecord<'a> {
    fn from(batch: &'a Batch) -> Self {
        Self {
            input_ids:      batch.blocks().iter().map(|b| b.input_ids()).collect(),
            attention_mask: batch.blocks().iter().map(|b| b.attention_mask()).collect(),
            labels:         batch.blocks().iter().map(|b| b.labels()).collect(),
        }
    }
}

pub struct PackUseCase {
    config:      RunConfig,
    output_dir:  PathBuf,
    max_batches: Option<usize>,
}

impl PackUseCase {
    pub fn new(config: RunConfig, output_dir: impl Into<PathBuf>, max_batches: Option<usize>) -> Self {
        Self { config, output_dir: output_dir.into(), max_batches }
    }

    pub fn execute(&self) -> Result<Vec<PackReport>> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        let tokenizer = cfg.tokenizer()?;

        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Cannot create output dir '{}'", self.output_dir.display())
        })?;

        // ── Step 3: Pack each split ───────────────────────────────────────────
        let mut reports = Vec::new();
        for (name, split) in cfg.splits() {
            let source  = JsonlSource::new(&split.path, &split.text_field);
            let batches = packed_batches(&source, &tokenizer, split.example_buffer, &cfg.pipeline)
                .with_context(|| format!("Cannot build {name} pipeline"))?;
            let batches = batches.take(self.max_batches.unwrap_or(usize::MAX));

            let path   = self.output_dir.join(format!("{name}.jsonl"));
            let file   = File::create(&path)
                .with_context(|| format!("Cannot create '{}'", path.display()))?;
            let mut writer = BufWriter::new(file);

            let mut written = 0usize;
            for batch in batches {
                let batch = batch.with_context(|| format!("Pipeline failed on {name} split"))?;
                serde_json::to_writer(&mut writer, &BatchRecord::from(&batch))?;
                writer.write_all(b"\n")?;
                written += 1;
            }
            writer.flush()?;

            tracing::info!("Packed {} {} batches into '{}'", written, name, path.display());
            reports.push(PackReport { split: name.to_string(), path, batches: written });
        }

        Ok(reports)
    }
}
