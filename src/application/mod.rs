// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal per command (packing batches, or running the forward
// pass over them).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing or printing here (that's Layer 1)
//   - Only workflow coordination and error context
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The merged run configuration (JSON file + CLI overrides)
pub mod config;

// The batch packing workflow
pub mod pack_use_case;

// The forward-pass workflow
pub mod forward_use_case;
