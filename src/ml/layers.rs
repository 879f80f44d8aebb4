// ============================================================
// Layer 5 — Graph Convolution Layers
// ============================================================
// Two message-passing layers, both of the form
//
//   out[dst] = Σ_edges  norm_e · message(x[src])
//
// computed as select(src) → scale → select_assign(dst), where
// select_assign sums rows that share an index.
//
//   GcnLayer    message = x·W,  symmetric norm, self loops, bias
//   RgcnLayer   message = x·W_r with W_r = Σ_b att[r, b]·basis_b,
//               mean over incoming edges, then (aggr + x·root) / 2
//
// Reference: Kipf & Welling (2017), Schlichtkrull et al. (2018)

use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
};

use crate::ml::inputs::GraphTensors;

/// Shared interface of the internal aggregation layers.
pub(crate) trait Propagate<B: Backend> {
    fn propagate(&self, x: Tensor<B, 2>, graph: &GraphTensors<B>) -> Tensor<B, 2>;
    fn describe(&self) -> String;
}

fn scatter_sum<B: Backend>(messages: Tensor<B, 2>, graph: &GraphTensors<B>, channels: usize) -> Tensor<B, 2> {
    let device = messages.device();
    Tensor::zeros([graph.num_nodes, channels], &device).select_assign(0, graph.dst.clone(), messages)
}

// ─── GCN ──────────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct GcnLayer<B: Backend> {
    weight:       Param<Tensor<B, 2>>,
    bias:         Param<Tensor<B, 1>>,
    in_channels:  usize,
    out_channels: usize,
}

impl<B: Backend> GcnLayer<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let weight = Initializer::XavierUniform { gain: 1.0 }.init_with(
            [in_channels, out_channels],
            Some(in_channels),
            Some(out_channels),
            device,
        );
        let bias = Initializer::Zeros.init([out_channels], device);
        Self { weight, bias, in_channels, out_channels }
    }

    pub fn forward(&self, x: Tensor<B, 2>, graph: &GraphTensors<B>) -> Tensor<B, 2> {
        let h = x.matmul(self.weight.val());
        let messages = h.select(0, graph.src.clone()) * graph.norm.clone();
        scatter_sum(messages, graph, self.out_channels) + self.bias.val().unsqueeze::<2>()
    }
}

impl<B: Backend> Propagate<B> for GcnLayer<B> {
    fn propagate(&self, x: Tensor<B, 2>, graph: &GraphTensors<B>) -> Tensor<B, 2> {
        self.forward(x, graph)
    }

    fn describe(&self) -> String {
        format!("GCNEncoderLayer({}, {})", self.in_channels, self.out_channels)
    }
}

// ─── RGCN ─────────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct RgcnLayer<B: Backend> {
    /// `[num_bases, in · out]`, one flattened `[in, out]` matrix per basis.
    basis:         Param<Tensor<B, 2>>,
    /// `[num_relations, num_bases]`
    att:           Param<Tensor<B, 2>>,
    root:          Param<Tensor<B, 2>>,
    in_channels:   usize,
    out_channels:  usize,
    num_relations: usize,
    num_bases:     usize,
}

impl<B: Backend> RgcnLayer<B> {
    /// `after_relu` selects the initialisation scale for inputs that went
    /// through a ReLU. At most `num_relations` bases are used.
    pub fn new(
        in_channels:   usize,
        out_channels:  usize,
        num_relations: usize,
        num_bases:     usize,
        after_relu:    bool,
        device:        &B::Device,
    ) -> Self {
        let num_bases = num_bases.min(num_relations).max(1);
        let std = if after_relu {
            2.0 / in_channels as f64
        } else {
            1.0 / (in_channels as f64).sqrt()
        };

        let basis = Initializer::Normal { mean: 0.0, std }.init([num_bases, in_channels * out_channels], device);
        let root = Initializer::Normal { mean: 0.0, std }.init([in_channels, out_channels], device);
        let att = Initializer::Normal { mean: 0.0, std: 1.0 / (num_bases as f64).sqrt() }
            .init([num_relations, num_bases], device);

        Self { basis, att, root, in_channels, out_channels, num_relations, num_bases }
    }

    pub fn forward(&self, x: Tensor<B, 2>, graph: &GraphTensors<B>) -> Tensor<B, 2> {
        let (n_in, n_out) = (self.in_channels, self.out_channels);
        let weights = self.att.val().matmul(self.basis.val());

        // Edges are grouped by relation, so the per-relation products
        // concatenate back into edge order.
        let per_relation: Vec<Tensor<B, 2>> = graph
            .type_ranges
            .iter()
            .enumerate()
            .filter(|(_, range)| !range.is_empty())
            .map(|(r, range)| {
                let w_r = weights.clone().slice([r..r + 1]).reshape([n_in, n_out]);
                let src = graph.src.clone().slice([range.clone()]);
                x.clone().select(0, src).matmul(w_r)
            })
            .collect();

        let messages = Tensor::cat(per_relation, 0) * graph.norm.clone();
        let aggr = scatter_sum(messages, graph, n_out);
        (aggr + x.matmul(self.root.val())).div_scalar(2.0)
    }
}

impl<B: Backend> Propagate<B> for RgcnLayer<B> {
    fn propagate(&self, x: Tensor<B, 2>, graph: &GraphTensors<B>) -> Tensor<B, 2> {
        self.forward(x, graph)
    }

    fn describe(&self) -> String {
        format!(
            "RGCNEncoderLayer({}, {}, num_relations={}, num_bases={})",
            self.in_channels, self.out_channels, self.num_relations, self.num_bases
        )
    }
}
