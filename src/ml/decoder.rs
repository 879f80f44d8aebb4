// ============================================================
// Layer 5 — DistMult Decoder
// ============================================================
// Scores a typed node pair (i, r, j) as the trilinear product
//
//   score = Σ_d  x[i, d] · W[r, d] · x[j, d]
//
// with one learnable diagonal per relation.
//
// Reference: Yang et al. (2015) Embedding Entities and Relations
//            for Learning and Inference in Knowledge Bases

use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::ml::inputs::EdgeBatch;

#[derive(Module, Debug)]
pub struct MultiRelaInnerProductDecoder<B: Backend> {
    /// `[num_edge_type, in_channels]`
    weight:        Param<Tensor<B, 2>>,
    in_channels:   usize,
    num_edge_type: usize,
}

impl<B: Backend> MultiRelaInnerProductDecoder<B> {
    pub fn new(in_channels: usize, num_edge_type: usize, device: &B::Device) -> Self {
        let std = 1.0 / (in_channels as f64).sqrt();
        let weight = Initializer::Normal { mean: 0.0, std }.init([num_edge_type, in_channels], device);
        Self { weight, in_channels, num_edge_type }
    }

    /// One score per edge of `edges`, squashed into (0, 1) when `sigmoid` is set.
    pub fn forward(&self, x: Tensor<B, 2>, edges: &EdgeBatch<B>, apply_sigmoid: bool) -> Tensor<B, 1> {
        let src = x.clone().select(0, edges.src.clone());
        let dst = x.select(0, edges.dst.clone());
        let rel = self.weight.val().select(0, edges.edge_type.clone());

        let score = (src * dst * rel).sum_dim(1).squeeze::<1>(1);
        if apply_sigmoid {
            sigmoid(score)
        } else {
            score
        }
    }

    pub fn num_edge_type(&self) -> usize {
        self.num_edge_type
    }

    pub fn describe(&self) -> String {
        format!(
            "MultiRelaInnerProductDecoder: DistMultLayer(in_channels={}, num_relations={})",
            self.in_channels, self.num_edge_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::LabeledEdges;
    use crate::domain::graph::EdgeIndex;
    use burn::backend::NdArray;

    type B = NdArray;

    fn decoder(weights: [f32; 4]) -> MultiRelaInnerProductDecoder<B> {
        let w = Tensor::<B, 1>::from_floats(weights, &Default::default()).reshape([2, 2]);
        MultiRelaInnerProductDecoder { weight: Param::from_tensor(w), in_channels: 2, num_edge_type: 2 }
    }

    #[test]
    fn test_trilinear_score() {
        let device = Default::default();
        let x = Tensor::<B, 1>::from_floats([1.0, 2.0, 3.0, -1.0, 0.5, 0.5], &device).reshape([3, 2]);
        let edges = LabeledEdges::new("e", EdgeIndex::from_pairs([(0, 1), (1, 2)]), vec![1, 0]).unwrap();
        let batch = EdgeBatch::new(&edges, &device);
        let dec = decoder([1.0, 1.0, 2.0, -1.0]);

        let scores: Vec<f32> = dec.forward(x, &batch, false).into_data().convert::<f32>().to_vec().unwrap();
        // (1·3·2) + (2·-1·-1) = 8 ; (3·0.5·1) + (-1·0.5·1) = 1
        assert!((scores[0] - 8.0).abs() < 1e-5);
        assert!((scores[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_sigmoid_in_unit_interval() {
        let device = Default::default();
        let dec = MultiRelaInnerProductDecoder::<B>::new(4, 3, &device);
        let x = Tensor::<B, 2>::random([5, 4], burn::tensor::Distribution::Normal(0.0, 3.0), &device);
        let edges = LabeledEdges::new("e", EdgeIndex::from_pairs([(0, 1), (2, 3), (4, 0)]), vec![0, 1, 2]).unwrap();

        let scores: Vec<f32> = dec
            .forward(x, &EdgeBatch::new(&edges, &device), true)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn test_describe() {
        let dec = MultiRelaInnerProductDecoder::<B>::new(19, 963, &Default::default());
        assert_eq!(
            dec.describe(),
            "MultiRelaInnerProductDecoder: DistMultLayer(in_channels=19, num_relations=963)"
        );
    }
}
