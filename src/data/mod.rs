// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a file on disk and a PoseDataset in host
// memory:
//
//   URL ──download──▶ ROOT/pose.safetensors
//                         │
//                         ▼
//                    TensorBundle       named tensors, owned bytes
//                         │
//                         ▼
//                    PoseDataset        edges, types, features
//
// `synthetic` builds the same PoseDataset without any file, and
// `sampler` draws the typed negatives used by the training loop.

/// Typed errors for malformed bundles
pub mod error;

/// safetensors reading and writing
pub mod bundle;

/// Bundle → PoseDataset, plus the downloading GraphSource
pub mod loader;

/// Small random PoSE-shaped graphs
pub mod synthetic;

/// Negative drug pairs that keep the side-effect type
pub mod sampler;
