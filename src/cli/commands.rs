// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `summary`, `train`, `evaluate` and `export` and
// all their configurable flags.
//
// Hyperparameters are not flags of their own: they live in the
// run config, set from a JSON file and/or `--opts` overrides:
//
//   gripnet-pose train --config run.json --opts SOLVER.MAX_EPOCHS=20
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::application::config::{get_cfg_defaults, Config};
use crate::data::loader::BundleSource;
use crate::data::synthetic::{SyntheticSource, SyntheticSpec};
use crate::domain::traits::GraphSource;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the GripNet model on PoSE and print its structure
    Summary(RunArgs),

    /// Train GripNet link prediction and write metrics/checkpoints
    Train(TrainArgs),

    /// Score the test split with the latest checkpoint of a run
    Evaluate(EvaluateArgs),

    /// Write a synthetic PoSE-shaped dataset bundle
    Export(ExportArgs),
}

/// Config and data-source flags shared by `summary` and `train`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// JSON run config; keys missing from the file keep their defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Use a generated graph instead of downloading the dataset
    #[arg(long)]
    pub synthetic: bool,

    /// Config overrides, e.g. SOLVER.BASE_LR=0.005 DATASET.ROOT=/tmp/data
    #[arg(long, value_name = "KEY=VALUE", num_args = 1..)]
    pub opts: Vec<String>,
}

impl RunArgs {
    /// defaults → file → overrides → validation.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Cannot load config '{}'", path.display()))?,
            None => get_cfg_defaults(),
        };
        cfg.merge_from_list(&self.opts).context("Cannot apply --opts")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn source(&self, cfg: &Config) -> Box<dyn GraphSource> {
        graph_source(self.synthetic, cfg)
    }
}

/// The same seed and spec as training, so `--synthetic` regenerates the run's graph.
fn graph_source(synthetic: bool, cfg: &Config) -> Box<dyn GraphSource> {
    if synthetic {
        Box::new(SyntheticSource::new(SyntheticSpec::default(), cfg.solver.seed))
    } else {
        Box::new(BundleSource::new(cfg.dataset.clone()))
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Directory for checkpoints, config.json and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub output_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Output directory of a `train` run
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// The run was trained on a generated graph
    #[arg(long)]
    pub synthetic: bool,
}

impl EvaluateArgs {
    /// Data source described by the run's own config.
    pub fn source(&self, cfg: &Config) -> Box<dyn GraphSource> {
        graph_source(self.synthetic, cfg)
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Where to write the bundle
    #[arg(long, default_value = "data/pose.safetensors")]
    pub output: PathBuf,

    /// Seed of the generated graph
    #[arg(long, default_value_t = 2020)]
    pub seed: u64,

    #[arg(long, default_value_t = 60)]
    pub num_genes: usize,

    #[arg(long, default_value_t = 30)]
    pub num_drugs: usize,

    #[arg(long, default_value_t = 4)]
    pub num_side_effects: usize,
}

/// Only the node and relation counts are exposed; edge counts scale with them.
impl From<&ExportArgs> for SyntheticSpec {
    fn from(a: &ExportArgs) -> Self {
        SyntheticSpec {
            num_genes:        a.num_genes,
            num_drugs:        a.num_drugs,
            num_side_effects: a.num_side_effects,
            gene_edges:       a.num_genes * 4,
            gene_drug_edges:  a.num_drugs * 3,
            train_edges:      a.num_side_effects * 50,
            test_edges:       a.num_side_effects * 10,
            feat_dim:         None,
        }
    }
}
