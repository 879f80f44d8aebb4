// ============================================================
// Layer 5 — GripNet Link Prediction
// ============================================================
// Encoder + decoder. The loss pushes scores of observed drug
// pairs towards 1 and of sampled negatives towards 0:
//
//   loss = -mean(log(σ(pos) + ε)) - mean(log(1 - σ(neg) + ε))

use std::fmt;

use burn::{prelude::*, tensor::backend::AutodiffBackend};

use crate::domain::error::SupergraphError;
use crate::domain::supergraph::SuperGraph;
use crate::ml::decoder::MultiRelaInnerProductDecoder;
use crate::ml::gripnet::{GripNet, GripNetSummary};
use crate::ml::inputs::{EdgeBatch, SupergraphInputs};

const EPS: f64 = 1e-13;

#[derive(Module, Debug)]
pub struct GripNetLinkPrediction<B: Backend> {
    encoder: GripNet<B>,
    decoder: MultiRelaInnerProductDecoder<B>,
}

impl<B: Backend> GripNetLinkPrediction<B> {
    /// Decoder width follows the encoder, relations follow the task supervertex.
    pub fn new(supergraph: &SuperGraph, device: &B::Device) -> Result<Self, SupergraphError> {
        let encoder = GripNet::new(supergraph, device)?;
        let num_edge_type = supergraph.task_supervertex().num_edge_type();
        let decoder = MultiRelaInnerProductDecoder::new(encoder.out_channels(), num_edge_type, device);
        Ok(Self { encoder, decoder })
    }

    pub fn encoder(&self) -> &GripNet<B> {
        &self.encoder
    }

    pub fn decoder(&self) -> &MultiRelaInnerProductDecoder<B> {
        &self.decoder
    }

    pub fn forward(&self, inputs: &SupergraphInputs<B>, edges: &EdgeBatch<B>, sigmoid: bool) -> Tensor<B, 1> {
        let z = self.encoder.forward(inputs);
        self.decoder.forward(z, edges, sigmoid)
    }

    /// Sigmoid scores of positive and negative edges from one encoder pass.
    pub fn score_pairs(
        &self,
        inputs:   &SupergraphInputs<B>,
        positive: &EdgeBatch<B>,
        negative: &EdgeBatch<B>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let z = self.encoder.forward(inputs);
        let pos = self.decoder.forward(z.clone(), positive, true);
        let neg = self.decoder.forward(z, negative, true);
        (pos, neg)
    }

    pub fn summary<'a>(&'a self, supergraph: &'a SuperGraph) -> LinkPredictionSummary<'a, B> {
        LinkPredictionSummary { encoder: self.encoder.summary(supergraph), decoder: &self.decoder }
    }
}

impl<B: AutodiffBackend> GripNetLinkPrediction<B> {
    pub fn forward_loss(
        &self,
        inputs:   &SupergraphInputs<B>,
        positive: &EdgeBatch<B>,
        negative: &EdgeBatch<B>,
    ) -> Tensor<B, 1> {
        let (pos, neg) = self.score_pairs(inputs, positive, negative);
        link_loss(pos, neg)
    }
}

pub fn link_loss<B: Backend>(pos: Tensor<B, 1>, neg: Tensor<B, 1>) -> Tensor<B, 1> {
    let pos_loss = pos.add_scalar(EPS).log().mean().neg();
    let neg_loss = neg.neg().add_scalar(1.0 + EPS).log().mean().neg();
    pos_loss + neg_loss
}

pub struct LinkPredictionSummary<'a, B: Backend> {
    encoder: GripNetSummary<'a, B>,
    decoder: &'a MultiRelaInnerProductDecoder<B>,
}

impl<B: Backend> fmt::Display for LinkPredictionSummary<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GripNetLinkPrediction: \nEncoder: {}\n Decoder: {}",
            self.encoder,
            self.decoder.describe()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::LabeledEdges;
    use crate::domain::graph::EdgeIndex;
    use crate::ml::gripnet::tests::pose_like_supergraph;
    use burn::backend::{Autodiff, NdArray};

    type B = NdArray;

    #[test]
    fn test_decoder_sized_from_encoder() {
        let sg = pose_like_supergraph();
        let model = GripNetLinkPrediction::<B>::new(&sg, &Default::default()).unwrap();
        assert!(model.decoder().describe().contains("in_channels=19,"));
        assert_eq!(model.decoder().num_edge_type(), 3);
    }

    #[test]
    fn test_forward_scores_every_edge() {
        let device = Default::default();
        let sg = pose_like_supergraph();
        let model = GripNetLinkPrediction::<B>::new(&sg, &device).unwrap();
        let inputs = SupergraphInputs::new(&sg, &device);
        let edges = LabeledEdges::new("e", EdgeIndex::from_pairs([(0, 1), (2, 3), (3, 1), (1, 0)]), vec![0, 1, 2, 2]).unwrap();

        let scores = model.forward(&inputs, &EdgeBatch::new(&edges, &device), true);
        assert_eq!(scores.dims(), [4]);
    }

    #[test]
    fn test_loss_is_finite_and_differentiable() {
        let device = Default::default();
        let sg = pose_like_supergraph();
        let model = GripNetLinkPrediction::<Autodiff<B>>::new(&sg, &device).unwrap();
        let inputs = SupergraphInputs::new(&sg, &device);
        let pos = LabeledEdges::new("p", EdgeIndex::from_pairs([(0, 1), (1, 2)]), vec![0, 1]).unwrap();
        let neg = LabeledEdges::new("n", EdgeIndex::from_pairs([(3, 1), (2, 0)]), vec![0, 1]).unwrap();

        let loss = model.forward_loss(&inputs, &EdgeBatch::new(&pos, &device), &EdgeBatch::new(&neg, &device));
        let value = loss.clone().into_scalar().elem::<f64>();
        assert!(value.is_finite() && value > 0.0);
        let _grads = loss.backward();
    }

    #[test]
    fn test_loss_prefers_correct_ranking() {
        let device = Default::default();
        let good = link_loss::<B>(
            Tensor::from_floats([0.9, 0.8], &device),
            Tensor::from_floats([0.1, 0.2], &device),
        );
        let bad = link_loss::<B>(
            Tensor::from_floats([0.1, 0.2], &device),
            Tensor::from_floats([0.9, 0.8], &device),
        );
        assert!(good.into_scalar().elem::<f64>() < bad.into_scalar().elem::<f64>());
    }

    #[test]
    fn test_summary_format() {
        let sg = pose_like_supergraph();
        let model = GripNetLinkPrediction::<B>::new(&sg, &Default::default()).unwrap();
        let text = model.summary(&sg).to_string();
        assert!(text.starts_with("GripNetLinkPrediction: \nEncoder: GripNet ModuleDict(\n"));
        assert!(text.ends_with(" Decoder: MultiRelaInnerProductDecoder: DistMultLayer(in_channels=19, num_relations=3)"));
    }
}
