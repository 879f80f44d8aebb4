// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Seed backend + host RNG    (Layer 6 - infra)
//   Step 2: Load the PoSE graph        (Layer 4 - data)
//   Step 3: Wire the supergraph        (Layer 2 - pose_graph)
//   Step 4: Save config                (Layer 6 - infra)
//   Step 5: Run training loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::config::Config;
use crate::application::pose_graph::build_pose_supergraph;
use crate::domain::traits::GraphSource;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger, seed::set_seed};
use crate::infra::metrics::EpochMetrics;
use crate::ml::backend::TrainBackend;
use crate::ml::trainer::{run_training, TrainContext};

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and the data source, writes everything to `output_dir`.
pub struct TrainUseCase {
    config:     Config,
    source:     Box<dyn GraphSource>,
    output_dir: PathBuf,
}

impl TrainUseCase {
    pub fn new(config: Config, source: Box<dyn GraphSource>, output_dir: impl Into<PathBuf>) -> Self {
        Self { config, source, output_dir: output_dir.into() }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        let cfg = &self.config;

        // ── Step 1: Seed ──────────────────────────────────────────────────────
        let mut rng = set_seed::<TrainBackend>(cfg.solver.seed);

        // ── Step 2: Load ──────────────────────────────────────────────────────
        tracing::info!("Loading data from {}", self.source.describe());
        let dataset = self.source.load()?;
        tracing::info!(
            "Loaded {} genes, {} drugs, {} side effects, {} training pairs",
            dataset.num_genes(),
            dataset.num_drugs(),
            dataset.num_side_effects(),
            dataset.train.num_edges()
        );

        // ── Step 3: Supergraph ────────────────────────────────────────────────
        let supergraph = build_pose_supergraph(&dataset).context("Cannot build the PoSE supergraph")?;
        tracing::debug!("{}", supergraph);

        // ── Step 4: Save config next to the checkpoints ───────────────────────
        let checkpoint = CheckpointManager::new(&self.output_dir)?;
        checkpoint.save_config(cfg)?;
        let metrics = MetricsLogger::new(&self.output_dir)?;
        tracing::info!("Logging metrics to '{}'", metrics.csv_path().display());

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let ctx = TrainContext { solver: &cfg.solver, checkpoint: &checkpoint, metrics: &metrics };
        run_training(&ctx, &supergraph, &dataset, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{SyntheticSource, SyntheticSpec};
    use tempfile::tempdir;

    #[test]
    fn test_train_writes_config_metrics_and_checkpoints() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.solver.max_epochs = 2;

        let source = SyntheticSource::new(SyntheticSpec::default(), 11);
        let history = TrainUseCase::new(config.clone(), Box::new(source), dir.path())
            .execute()
            .unwrap();

        assert_eq!(history.len(), 2);
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert_eq!(ckpt.load_config().unwrap(), config);
        assert_eq!(ckpt.latest_epoch().unwrap(), 2);
        assert!(dir.path().join("metrics.csv").exists());
    }
}
