// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records one CSV row per training epoch:
//
//   epoch,lr,train_loss,auroc,auprc,ap50
//   1,0.010000,1.386294,0.512000,0.498000,0.460000
//   2,0.010000,1.201733,0.603000,0.581000,0.712000
//
// The evaluation columns stay empty when the dataset has no test
// split. Rows are appended, so several runs into the same
// directory accumulate.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::ml::evaluation::LinkMetrics;

/// One row of metrics for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Learning rate used for this epoch's step
    pub lr: f64,

    /// Link-prediction loss on training edges vs. sampled negatives
    pub train_loss: f64,

    /// Test-split metrics after the step, if a test split exists
    pub link: Option<LinkMetrics>,
}

impl EpochMetrics {
    pub fn new(epoch: usize, lr: f64, train_loss: f64, link: Option<LinkMetrics>) -> Self {
        Self { epoch, lr, train_loss, link }
    }

    /// Returns true if this epoch's AUPRC beats the best so far
    pub fn is_improvement(&self, best_auprc: f64) -> bool {
        self.link.is_some_and(|m| m.auprc > best_auprc)
    }

    fn csv_row(&self) -> String {
        let eval = match self.link {
            Some(m) => format!("{:.6},{:.6},{:.6}", m.auroc, m.auprc, m.ap50),
            None => ",,".to_string(),
        };
        format!("{},{:.6},{:.6},{}", self.epoch, self.lr, self.train_loss, eval)
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,lr,train_loss,auroc,auprc,ap50")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", m.csv_row())?;

        tracing::debug!("Logged epoch {} metrics: train_loss={:.4}", m.epoch, m.train_loss);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
