// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full-graph training: the whole supergraph is encoded once per
// epoch and every training drug pair is scored against a freshly
// sampled negative of the same side effect, followed by one Adam
// step.
//
//   TrainBackend (Autodiff<_>)   forward, loss, backward, step
//   model.valid() (inner)        test-split scores, no autodiff
//
// Test negatives are drawn once so metrics are comparable
// across epochs.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{anyhow, ensure, Result};
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::rngs::StdRng;

use crate::application::config::SolverConfig;
use crate::data::sampler::negative_sampling;
use crate::domain::dataset::PoseDataset;
use crate::domain::supergraph::SuperGraph;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::backend::{default_device, TrainBackend};
use crate::ml::evaluation::LinkMetrics;
use crate::ml::inputs::{EdgeBatch, SupergraphInputs};
use crate::ml::link_prediction::GripNetLinkPrediction;
use crate::ml::scheduler::MultiStepLr;

/// What the loop needs besides the graph itself.
pub struct TrainContext<'a> {
    pub solver:     &'a SolverConfig,
    pub checkpoint: &'a CheckpointManager,
    pub metrics:    &'a MetricsLogger,
}

pub fn run_training(
    ctx:        &TrainContext<'_>,
    supergraph: &SuperGraph,
    dataset:    &PoseDataset,
    rng:        &mut StdRng,
) -> Result<Vec<EpochMetrics>> {
    let device = default_device();
    train_loop::<TrainBackend>(ctx, supergraph, dataset, rng, &device)
}

pub(crate) fn train_loop<B: AutodiffBackend>(
    ctx:        &TrainContext<'_>,
    supergraph: &SuperGraph,
    dataset:    &PoseDataset,
    rng:        &mut StdRng,
    device:     &B::Device,
) -> Result<Vec<EpochMetrics>> {
    let num_drugs = dataset.num_drugs();

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model = GripNetLinkPrediction::<B>::new(supergraph, device)?;
    let inputs = SupergraphInputs::<B>::new(supergraph, device);
    let positive = EdgeBatch::<B>::new(&dataset.train, device);
    tracing::info!(
        "Model ready: out_channels={}, {} side effects, {} training pairs",
        model.encoder().out_channels(),
        model.decoder().num_edge_type(),
        positive.len
    );

    // ── Fixed test split, InnerBackend without autodiff ─────────────────────────
    let test = match &dataset.test {
        Some(test) => {
            let negatives = negative_sampling(test, num_drugs, rng)?;
            Some((
                SupergraphInputs::<B::InnerBackend>::new(supergraph, device),
                EdgeBatch::<B::InnerBackend>::new(test, device),
                EdgeBatch::<B::InnerBackend>::new(&negatives, device),
            ))
        }
        None => {
            tracing::warn!("Dataset has no test split, skipping evaluation");
            None
        }
    };

    let mut optim = AdamConfig::new().init();
    let schedule = MultiStepLr::from(ctx.solver);
    let max_epochs = ctx.solver.max_epochs;
    let mut history = Vec::with_capacity(max_epochs);
    let mut best_auprc = f64::NEG_INFINITY;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..max_epochs {
        let lr = schedule.lr(epoch);

        let negatives = negative_sampling(&dataset.train, num_drugs, rng)?;
        let loss = model.forward_loss(&inputs, &positive, &EdgeBatch::new(&negatives, device));
        let train_loss = loss.clone().into_scalar().elem::<f64>();
        ensure!(train_loss.is_finite(), "Training diverged at epoch {}: loss = {train_loss}", epoch + 1);

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(lr, model, grads);

        let link = match &test {
            Some((inputs, pos, neg)) => evaluate(&model.valid(), inputs, pos, neg)?,
            None => None,
        };
        let metrics = EpochMetrics::new(epoch + 1, lr, train_loss, link);

        match link {
            Some(m) => println!(
                "Epoch {:>3}/{} | lr={:.2e} | train_loss={:.4} | auroc={:.4} | auprc={:.4} | ap@50={:.4}",
                epoch + 1, max_epochs, lr, train_loss, m.auroc, m.auprc, m.ap50,
            ),
            None => println!(
                "Epoch {:>3}/{} | lr={:.2e} | train_loss={:.4}",
                epoch + 1, max_epochs, lr, train_loss,
            ),
        }

        if metrics.is_improvement(best_auprc) {
            best_auprc = metrics.link.map_or(best_auprc, |m| m.auprc);
            tracing::info!("New best test AUPRC {:.4} at epoch {}", best_auprc, epoch + 1);
        }

        ctx.metrics.log(&metrics)?;
        ctx.checkpoint.save_model(&model, epoch + 1)?;
        history.push(metrics);
    }

    tracing::info!("Training complete!");
    Ok(history)
}

/// AUROC / AUPRC / AP@50 of the given positives against negatives.
pub fn evaluate<B: Backend>(
    model:    &GripNetLinkPrediction<B>,
    inputs:   &SupergraphInputs<B>,
    positive: &EdgeBatch<B>,
    negative: &EdgeBatch<B>,
) -> Result<Option<LinkMetrics>> {
    let (pos, neg) = model.score_pairs(inputs, positive, negative);
    Ok(LinkMetrics::compute(&to_host(pos)?, &to_host(neg)?))
}

fn to_host<B: Backend>(scores: Tensor<B, 1>) -> Result<Vec<f32>> {
    scores
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read scores back from the device: {e:?}"))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pose_graph::build_pose_supergraph;
    use crate::data::synthetic::{generate, SyntheticSpec};
    use burn::backend::{Autodiff, NdArray};
    use rand::SeedableRng;
    use tempfile::tempdir;

    #[test]
    fn test_few_epochs_on_synthetic_graph() {
        let dir = tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(2020);
        let dataset = generate(&SyntheticSpec::default(), &mut rng).unwrap();
        let supergraph = build_pose_supergraph(&dataset).unwrap();

        let solver = SolverConfig { max_epochs: 3, ..SolverConfig::default() };
        let checkpoint = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let ctx = TrainContext { solver: &solver, checkpoint: &checkpoint, metrics: &metrics };

        let history = train_loop::<Autodiff<NdArray>>(&ctx, &supergraph, &dataset, &mut rng, &Default::default())
            .unwrap();

        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|m| m.train_loss.is_finite()));
        let link = history[2].link.unwrap();
        assert!((0.0..=1.0).contains(&link.auroc));
        assert!((0.0..=1.0).contains(&link.auprc));
        assert_eq!(checkpoint.latest_epoch().unwrap(), 3);
        assert_eq!(std::fs::read_to_string(metrics.csv_path()).unwrap().lines().count(), 4);
    }
}
