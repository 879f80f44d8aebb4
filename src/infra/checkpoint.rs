// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved:
//   checkpoints/
//     model_epoch_1.mpk.gz  ← weights after epoch 1 (half precision)
//     model_epoch_2.mpk.gz
//     ...
//     latest_epoch.json     ← number of the latest epoch
//     config.json           ← the run configuration
//
// The model architecture is fully determined by the config and
// the dataset, so rebuilding the model from both and calling
// load_model restores a trained run.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::config::Config;
use crate::ml::link_prediction::GripNetLinkPrediction;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model weights for a given epoch and mark it as the latest.
    pub fn save_model<B: Backend>(&self, model: &GripNetLinkPrediction<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the latest saved weights into a model of the same architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  GripNetLinkPrediction<B>,
        device: &B::Device,
    ) -> Result<GripNetLinkPrediction<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &Config) -> Result<()> {
        let path = self.dir.join("config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<Config> {
        let path = self.dir.join("config.json");
        Config::from_file(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))
    }

    /// Number of the most recently saved epoch.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Has a training run finished an epoch?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::gripnet::tests::pose_like_supergraph;
    use crate::ml::inputs::{EdgeBatch, SupergraphInputs};
    use crate::domain::dataset::LabeledEdges;
    use crate::domain::graph::EdgeIndex;
    use burn::backend::NdArray;
    use tempfile::tempdir;

    type B = NdArray;

    #[test]
    fn test_model_round_trip() {
        let dir = tempdir().unwrap();
        let device = Default::default();
        let sg = pose_like_supergraph();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();

        let trained = GripNetLinkPrediction::<B>::new(&sg, &device).unwrap();
        ckpt.save_model(&trained, 3).unwrap();
        assert_eq!(ckpt.latest_epoch().unwrap(), 3);

        let fresh = GripNetLinkPrediction::<B>::new(&sg, &device).unwrap();
        let restored = ckpt.load_model(fresh, &device).unwrap();

        let inputs = SupergraphInputs::new(&sg, &device);
        let edges = LabeledEdges::new("e", EdgeIndex::from_pairs([(0, 1), (2, 3)]), vec![0, 2]).unwrap();
        let batch = EdgeBatch::new(&edges, &device);
        let a: Vec<f32> = trained.forward(&inputs, &batch, false).into_data().convert::<f32>().to_vec().unwrap();
        let b: Vec<f32> = restored.forward(&inputs, &batch, false).into_data().convert::<f32>().to_vec().unwrap();
        // weights are stored in half precision
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() <= 5e-2 * (1.0 + x.abs()));
        }
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let mut cfg = Config::default();
        cfg.solver.max_epochs = 12;
        ckpt.save_config(&cfg).unwrap();
        assert_eq!(ckpt.load_config().unwrap(), cfg);
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.latest_epoch().is_err());
    }
}
