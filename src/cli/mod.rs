// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `pack`    — pack a corpus into batches, write JSON lines
//   2. `forward` — run batches through the model, log logits
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, Device, ForwardArgs, PackArgs};

use crate::application::{
    config::RunConfig,
    forward_use_case::{ForwardUseCase, SplitReport},
    pack_use_case::PackUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "packed-lm",
    version = "0.1.0",
    about = "Pack text corpora into fixed-length blocks and run a causal transformer over them."
)]
pub struct Cli {
    /// The subcommand to run (pack or forward)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Pack(args)    => run_pack(args),
            Commands::Forward(args) => run_forward(args),
        }
    }
}

fn run_pack(args: PackArgs) -> Result<()> {
    let config = args.run.into_config()?;
    let reports = PackUseCase::new(config, args.output, args.max_batches).execute()?;

    for report in reports {
        println!("{:<6} {:>6} batches → {}", report.split, report.batches, report.path.display());
    }
    Ok(())
}

fn run_forward(args: ForwardArgs) -> Result<()> {
    let device      = args.device;
    let max_batches = args.max_batches;
    let config      = args.into_config()?;

    tracing::info!("Running forward pass on {:?}", device);
    let reports = match device {
        Device::Cpu => forward::<burn::backend::NdArray>(config, Default::default(), max_batches)?,
        Device::Gpu => forward::<burn::backend::Wgpu>(config, Default::default(), max_batches)?,
    };

    for r in reports {
        println!(
            "{:<6} {:>4} batches | logits {:?} | mean logit {:.4} | next-token agreement {:.3}",
            r.split, r.batches, r.logits_shape, r.mean_logit, r.next_token_agreement
        );
    }
    Ok(())
}

fn forward<B: burn::tensor::backend::Backend>(
    config:      RunConfig,
    device:      B::Device,
    max_batches: usize,
) -> Result<Vec<SplitReport>> {
    ForwardUseCase::<B>::new(config, device, max_batches).execute()
}
