// ============================================================
// packed-lm
// ============================================================
// Layers, outermost first:
//
//   cli/          Layer 1 — argument parsing, output
//   application/  Layer 2 — pack and forward workflows
//   domain/       Layer 3 — Example, Block, Batch, core traits
//   data/         Layer 4 — lazy packing pipeline
//   ml/           Layer 5 — burn model code
//   infra/        Layer 6 — tokenizer persistence
//
// Errors shared by the library layers live in error.rs.
#![recursion_limit = "256"]

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod infra;
pub mod ml;
