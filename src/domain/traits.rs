// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer asks for a dataset without caring where
// it comes from:
//   - BundleSource    → downloads and reads a tensor bundle
//   - SyntheticSource → generates a small random PoSE-shaped graph
//
// Both hand back the same PoseDataset, so the training and
// summary workflows run unchanged offline.

use anyhow::Result;

use crate::domain::dataset::PoseDataset;

// ─── GraphSource ──────────────────────────────────────────────────────────────
/// Any component that can produce the PoSE graph.
pub trait GraphSource {
    /// Load (or build) the dataset. Implementations validate index bounds
    /// before returning.
    fn load(&self) -> Result<PoseDataset>;

    /// Short human-readable origin, used in log lines.
    fn describe(&self) -> String;
}
