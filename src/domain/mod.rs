// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of the packing pipeline:
//
//   Example          — one raw text record (extra columns dropped)
//   TokenizedExample — the token ids produced for one Example
//   Block            — L contiguous ids + mask + labels
//   Batch            — exactly N Blocks
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Raw text records from the example source
pub mod example;

/// Packed blocks and batches
pub mod block;

/// Core abstractions (traits) that other layers implement
pub mod traits;
