// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong in any specific
// business layer:
//
//   download.rs     fetch the dataset once into DATASET.ROOT
//   seed.rs         one seed for the backend and host RNGs
//   checkpoint.rs   model records and the run config on disk
//   metrics.rs      per-epoch CSV log
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Cached HTTP download
pub mod download;

/// Backend and host RNG seeding
pub mod seed;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
