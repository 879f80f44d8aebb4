// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Four commands are supported:
//   1. `summary`   builds the model and prints its structure
//   2. `train`     trains link prediction on the PoSE graph
//   3. `evaluate`  scores the test split with a saved run
//   4. `export`    writes a synthetic dataset bundle
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, ExportArgs, RunArgs, TrainArgs};

use crate::data::synthetic::export_bundle;

#[derive(Parser, Debug)]
#[command(
    name = "gripnet-pose",
    version,
    about = "GripNet polypharmacy side-effect prediction on the PoSE supergraph."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Summary(args)  => run_summary(args),
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Export(args)   => run_export(args),
        }
    }
}

fn run_summary(args: RunArgs) -> Result<()> {
    use crate::application::summary_use_case::SummaryUseCase;

    let cfg = args.resolve_config()?;
    let source = args.source(&cfg);
    let report = SummaryUseCase::new(cfg, source).execute()?;
    println!("{report}");
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let cfg = args.run.resolve_config()?;
    let source = args.run.source(&cfg);
    tracing::info!("Training for {} epochs, writing to '{}'", cfg.solver.max_epochs, args.output_dir.display());

    let history = TrainUseCase::new(cfg, source, &args.output_dir).execute()?;
    let best = history
        .iter()
        .filter_map(|m| m.link.map(|l| (m.epoch, l)))
        .max_by(|a, b| a.1.auprc.total_cmp(&b.1.auprc));
    match best {
        Some((epoch, m)) => println!(
            "Training complete. Best test AUPRC {:.4} (AUROC {:.4}, AP@50 {:.4}) at epoch {}.",
            m.auprc, m.auroc, m.ap50, epoch
        ),
        None => println!("Training complete. Checkpoints saved to '{}'.", args.output_dir.display()),
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let use_case = EvaluateUseCase::open(&args.checkpoint_dir)?;
    let source = args.source(use_case.config());
    let report = use_case.execute(source.as_ref())?;
    println!("{report}");
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<()> {
    let dataset = export_bundle(&(&args).into(), args.seed, &args.output)?;
    println!(
        "Wrote {} ({} genes, {} drugs, {} side effects)",
        args.output.display(),
        dataset.num_genes(),
        dataset.num_drugs(),
        dataset.num_side_effects()
    );
    Ok(())
}
