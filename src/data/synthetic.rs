// ============================================================
// Layer 4 — Synthetic PoSE Graph
// ============================================================
// A small random graph with the same shape as PoSE, for offline
// runs and tests. Every side-effect type occurs in the training
// split, node indices are always in range and no edge is a self
// loop. Node features are identity unless `feat_dim` is set.

use anyhow::{Context, Result};
use std::path::Path;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::dataset::{LabeledEdges, PoseDataset};
use crate::domain::error::SupergraphError;
use crate::domain::graph::{EdgeIndex, NodeFeatures};
use crate::domain::traits::GraphSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub num_genes:        usize,
    pub num_drugs:        usize,
    pub num_side_effects: usize,
    pub gene_edges:       usize,
    pub gene_drug_edges:  usize,
    pub train_edges:      usize,
    pub test_edges:       usize,
    pub feat_dim:         Option<usize>,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            num_genes:        60,
            num_drugs:        30,
            num_side_effects: 4,
            gene_edges:       240,
            gene_drug_edges:  90,
            train_edges:      200,
            test_edges:       40,
            feat_dim:         None,
        }
    }
}

pub fn generate(spec: &SyntheticSpec, rng: &mut StdRng) -> Result<PoseDataset, SupergraphError> {
    if spec.num_genes < 2 || spec.num_drugs < 2 {
        return Err(SupergraphError::InvalidSetting {
            name:   "synthetic".into(),
            reason: "need at least two genes and two drugs".into(),
        });
    }
    if spec.num_side_effects == 0 || spec.train_edges < spec.num_side_effects {
        return Err(SupergraphError::InvalidSetting {
            name:   "synthetic".into(),
            reason: "every side-effect type needs a training edge".into(),
        });
    }

    let gene_edges = random_pairs(rng, spec.gene_edges, spec.num_genes, spec.num_genes, true);
    let gene_drug_edges = random_pairs(rng, spec.gene_drug_edges, spec.num_genes, spec.num_drugs, false);
    let train = typed_pairs(rng, spec.train_edges, spec)?;
    let test = match spec.test_edges {
        0 => None,
        n => Some(typed_pairs(rng, n, spec)?),
    };

    let dataset = PoseDataset {
        gene_feat: features(rng, spec.num_genes, spec.feat_dim)?,
        gene_edges,
        drug_feat: features(rng, spec.num_drugs, spec.feat_dim)?,
        train,
        test,
        gene_drug_edges,
    };
    dataset.validate()?;
    Ok(dataset)
}

fn random_pairs(rng: &mut StdRng, n: usize, rows: usize, cols: usize, no_self_loops: bool) -> EdgeIndex {
    EdgeIndex::from_pairs((0..n).map(|_| {
        let i = rng.gen_range(0..rows);
        if no_self_loops {
            (i, distinct_from(&mut *rng, i, cols))
        } else {
            (i, rng.gen_range(0..cols))
        }
    }))
}

fn typed_pairs(rng: &mut StdRng, n: usize, spec: &SyntheticSpec) -> Result<LabeledEdges, SupergraphError> {
    let edges = random_pairs(rng, n, spec.num_drugs, spec.num_drugs, true);
    let types = (0..n).map(|i| i % spec.num_side_effects).collect();
    LabeledEdges::new("synthetic", edges, types)
}

fn features(rng: &mut StdRng, n: usize, dim: Option<usize>) -> Result<NodeFeatures, SupergraphError> {
    match dim {
        None => Ok(NodeFeatures::Identity(n)),
        Some(d) => NodeFeatures::dense((0..n * d).map(|_| rng.gen_range(0.0..1.0)).collect(), n, d),
    }
}

/// Uniform index in `0..n` other than `i`. `n` must be at least 2.
pub(crate) fn distinct_from(rng: &mut impl Rng, i: usize, n: usize) -> usize {
    let j = rng.gen_range(0..n - 1);
    if j >= i { j + 1 } else { j }
}

// ─── SyntheticSource ──────────────────────────────────────────────────────────
pub struct SyntheticSource {
    spec: SyntheticSpec,
    seed: u64,
}

impl SyntheticSource {
    pub fn new(spec: SyntheticSpec, seed: u64) -> Self {
        Self { spec, seed }
    }
}

impl GraphSource for SyntheticSource {
    fn load(&self) -> Result<PoseDataset> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let dataset = generate(&self.spec, &mut rng)?;
        tracing::info!(
            "Generated synthetic graph: {} genes, {} drugs, {} side effects",
            dataset.num_genes(),
            dataset.num_drugs(),
            dataset.num_side_effects()
        );
        Ok(dataset)
    }

    fn describe(&self) -> String {
        format!("synthetic (seed {})", self.seed)
    }
}

/// Generate a dataset and write it as a bundle that `load_bundle_file` reads back.
pub fn export_bundle(spec: &SyntheticSpec, seed: u64, path: &Path) -> Result<PoseDataset> {
    let dataset = generate(spec, &mut StdRng::seed_from_u64(seed))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    dataset.to_bundle().save(path)?;
    tracing::info!("Wrote synthetic PoSE bundle to '{}'", path.display());
    Ok(dataset)
}
