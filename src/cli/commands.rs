// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `pack` and `forward`, and all
// their configurable flags.
//
// Both commands share RunArgs: an optional --config JSON file
// plus flags that override single fields of it. Without a
// config file, --train is required.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, u64, enum, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::config::RunConfig;
use crate::data::pipeline::SplitConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pack a corpus into fixed-length batches and write them as JSON lines
    Pack(PackArgs),

    /// Run packed batches through the language model and log the logits
    Forward(ForwardArgs),
}

/// Where the model runs
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    /// burn NdArray backend
    Cpu,
    /// burn Wgpu backend
    Gpu,
}

/// Flags shared by every command.
/// Each `Some` overrides the matching field of the config file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// JSON run configuration (pipeline, train, eval, model sections)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Training split .jsonl file
    #[arg(long)]
    pub train: Option<String>,

    /// Optional evaluation split .jsonl file
    #[arg(long)]
    pub eval: Option<String>,

    /// Column holding the text in both splits
    #[arg(long)]
    pub text_field: Option<String>,

    /// Tokens per packed block (L)
    #[arg(long)]
    pub sequence_length: Option<usize>,

    /// Blocks per batch (N)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Blocks held by the block-level shuffle buffer
    #[arg(long)]
    pub shuffle_buffer: Option<usize>,

    /// Examples held by each split's example-level shuffle buffer
    #[arg(long)]
    pub example_buffer: Option<usize>,

    /// Seed for both shuffle buffers
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory holding tokenizer.json (built there if missing)
    #[arg(long)]
    pub tokenizer_dir: Option<String>,

    /// Vocabulary size: model embedding rows, and the size of a newly built tokenizer
    #[arg(long)]
    pub num_tokens: Option<usize>,
}

impl RunArgs {
    /// Merge the config file (if any) with the flag overrides.
    /// Validation happens later, in the use case.
    pub fn into_config(self) -> Result<RunConfig> {
        let mut cfg = match (&self.config, &self.train) {
            (Some(path), _)     => RunConfig::load(path)?,
            (None, Some(train)) => RunConfig::new(SplitConfig::new(train.clone())),
            (None, None)        => anyhow::bail!("Either --config or --train is required"),
        };

        if let Some(train) = self.train {
            cfg.train.path = train;
        }
        if let Some(eval) = self.eval {
            cfg.eval = Some(SplitConfig::new(eval));
        }
        if let Some(field) = self.text_field {
            cfg.train.text_field = field.clone();
            if let Some(eval) = cfg.eval.as_mut() {
                eval.text_field = field;
            }
        }
        if let Some(buffer) = self.example_buffer {
            cfg.train.example_buffer = buffer;
            if let Some(eval) = cfg.eval.as_mut() {
                eval.example_buffer = buffer;
            }
        }

        if let Some(l) = self.sequence_length {
            cfg.pipeline.sequence_length = l;
        }
        if let Some(n) = self.batch_size {
            cfg.pipeline.batch_size = n;
        }
        if let Some(b) = self.shuffle_buffer {
            cfg.pipeline.shuffle_buffer_capacity = b;
        }
        if let Some(seed) = self.seed {
            cfg.pipeline.seed = seed;
        }
        if let Some(dir) = self.tokenizer_dir {
            cfg.tokenizer_dir = dir;
        }
        if let Some(num_tokens) = self.num_tokens {
            cfg.model.num_tokens = num_tokens;
        }
        Ok(cfg)
    }
}

/// All arguments for the `pack` command
#[derive(Args, Debug)]
pub struct PackArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Directory receiving <split>.jsonl
    #[arg(long, default_value = "packed")]
    pub output: PathBuf,

    /// Stop each split after this many batches (default: drain the source)
    #[arg(long)]
    pub max_batches: Option<usize>,
}

/// All arguments for the `forward` command
#[derive(Args, Debug)]
pub struct ForwardArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Compute device
    #[arg(long, value_enum, default_value_t = Device::Cpu)]
    pub device: Device,

    /// Batches to run per split
    #[arg(long, default_value_t = 4)]
    pub max_batches: usize,

    /// Model width (dim)
    #[arg(long)]
    pub dim: Option<usize>,

    /// Number of transformer layers
    #[arg(long)]
    pub depth: Option<usize>,

    /// Query heads per attention layer
    #[arg(long)]
    pub heads: Option<usize>,

    /// Width of each attention head
    #[arg(long)]
    pub dim_head: Option<usize>,
}

impl ForwardArgs {
    /// Merged config with the model-shape overrides applied
    pub fn into_config(self) -> Result<RunConfig> {
        let mut cfg = self.run.into_config()?;
        if let Some(dim) = self.dim {
            cfg.model.dim = dim;
        }
        if let Some(depth) = self.depth {
            cfg.model.depth = depth;
        }
        if let Some(heads) = self.heads {
            cfg.model.heads = heads;
        }
        if let Some(dim_head) = self.dim_head {
            cfg.model.dim_head = dim_head;
        }
        Ok(cfg)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_flag_alone_builds_config() {
        let args = RunArgs {
            train:           Some("corpus.jsonl".into()),
            sequence_length: Some(128),
            text_field:      Some("body".into()),
            ..Default::default()
        };
        let cfg = args.into_config().unwrap();
        assert_eq!(cfg.train.path, "corpus.jsonl");
        assert_eq!(cfg.train.text_field, "body");
        assert_eq!(cfg.pipeline.sequence_length, 128);
        assert_eq!(cfg.pipeline.batch_size, 4);
        assert!(cfg.eval.is_none());
    }

    #[test]
    fn test_shared_overrides_reach_eval_split() {
        let args = RunArgs {
            train:          Some("t.jsonl".into()),
            eval:           Some("e.jsonl".into()),
            text_field:     Some("content".into()),
            example_buffer: Some(7),
            ..Default::default()
        };
        let cfg  = args.into_config().unwrap();
        let eval = cfg.eval.unwrap();
        assert_eq!(eval.path, "e.jsonl");
        assert_eq!(eval.text_field, "content");
        assert_eq!(eval.example_buffer, 7);
    }

    #[test]
    fn test_no_source_is_an_error() {
        assert!(RunArgs::default().into_config().is_err());
    }

    #[test]
    fn test_config_file_then_flags() {
        let path = std::env::temp_dir().join(format!("packed-lm-cli-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "train": { "path": "from-file.jsonl" }, "pipeline": { "batch_size": 16, "seed": 5 } }"#,
        )
        .unwrap();

        let args = RunArgs {
            config: Some(path.clone()),
            seed:   Some(9),
            ..Default::default()
        };
        let cfg = args.into_config().unwrap();
        assert_eq!(cfg.train.path, "from-file.jsonl");
        assert_eq!(cfg.pipeline.batch_size, 16);
        assert_eq!(cfg.pipeline.seed, 9);

        let _ = std::fs::remove_file(&path);
    }
}
