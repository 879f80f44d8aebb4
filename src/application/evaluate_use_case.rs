// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Restores the latest checkpoint of a finished run and scores
// the test split once:
//
//   Step 1: Read config.json           (Layer 6 - infra)
//   Step 2: Seed backend + host RNG    (Layer 6 - infra)
//   Step 3: Load the PoSE graph        (Layer 4 - data)
//   Step 4: Rebuild + load the model   (Layer 5 - ml)
//   Step 5: Score test vs negatives    (Layer 5 - ml)
//
// The architecture is not stored with the weights; it is rebuilt
// from the dataset exactly as training built it.

use std::fmt;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::application::config::Config;
use crate::application::pose_graph::build_pose_supergraph;
use crate::data::sampler::negative_sampling;
use crate::domain::traits::GraphSource;
use crate::infra::{checkpoint::CheckpointManager, seed::set_seed};
use crate::ml::backend::{default_device, DefaultBackend};
use crate::ml::evaluation::LinkMetrics;
use crate::ml::inputs::{EdgeBatch, SupergraphInputs};
use crate::ml::link_prediction::GripNetLinkPrediction;
use crate::ml::trainer::evaluate;

#[derive(Debug, Clone, Copy)]
pub struct EvaluationReport {
    pub epoch:     usize,
    pub num_pairs: usize,
    pub metrics:   LinkMetrics,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch {} | {} test pairs | auroc={:.4} | auprc={:.4} | ap@50={:.4}",
            self.epoch, self.num_pairs, self.metrics.auroc, self.metrics.auprc, self.metrics.ap50
        )
    }
}

pub struct EvaluateUseCase {
    checkpoint: CheckpointManager,
    config:     Config,
}

impl EvaluateUseCase {
    /// Fails when the directory holds no `config.json` from a training run.
    pub fn open(checkpoint_dir: &Path) -> Result<Self> {
        let checkpoint = CheckpointManager::new(checkpoint_dir)?;
        let config = checkpoint.load_config()?;
        Ok(Self { checkpoint, config })
    }

    /// The configuration the run was trained with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn execute(&self, source: &dyn GraphSource) -> Result<EvaluationReport> {
        // ── Step 2: Seed ──────────────────────────────────────────────────────
        let mut rng = set_seed::<DefaultBackend>(self.config.solver.seed);
        let device = default_device();

        // ── Step 3: Data ──────────────────────────────────────────────────────
        tracing::info!("Loading data from {}", source.describe());
        let dataset = source.load()?;
        let test = dataset
            .test
            .as_ref()
            .ok_or_else(|| anyhow!("{} has no test split to evaluate", source.describe()))?;
        let supergraph = build_pose_supergraph(&dataset).context("Cannot build the PoSE supergraph")?;

        // ── Step 4: Model ─────────────────────────────────────────────────────
        let epoch = self.checkpoint.latest_epoch()?;
        tracing::info!("Restoring '{}' at epoch {}", self.checkpoint.dir().display(), epoch);
        let model = GripNetLinkPrediction::<DefaultBackend>::new(&supergraph, &device)?;
        let model = self.checkpoint.load_model(model, &device)?;

        // ── Step 5: Score ─────────────────────────────────────────────────────
        let negatives = negative_sampling(test, dataset.num_drugs(), &mut rng)?;
        let inputs = SupergraphInputs::new(&supergraph, &device);
        let metrics = evaluate(
            &model,
            &inputs,
            &EdgeBatch::new(test, &device),
            &EdgeBatch::new(&negatives, &device),
        )?
        .ok_or_else(|| anyhow!("Nothing to score in the test split"))?;

        Ok(EvaluationReport { epoch, num_pairs: test.num_edges(), metrics })
    }
}
