// ============================================================
// Layer 5 — GripNet Encoder
// ============================================================
// Walks the supergraph in topological order:
//
//   start vertex   x = features · embedding
//   other vertex   x = combine(external(parent_out) for each parent)
//   every vertex   out = internal aggregation layers over x
//
// The output of the task supervertex (the sink) is the node
// embedding handed to the decoder.
//
// Reference: Xu et al. (2020) GripNet: Graph Information
//            Propagation on Supergraph for Heterogeneous Graphs

use std::fmt;

use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::error::SupergraphError;
use crate::domain::setting::{AggregationMode, SuperVertexParaSetting};
use crate::domain::supergraph::{SuperGraph, SuperVertex};
use crate::ml::inputs::{float_matrix, GraphTensors, InputFeatures, VertexInputs, SupergraphInputs};
use crate::ml::layers::{GcnLayer, Propagate, RgcnLayer};

// ─── Internal module ──────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct GripNetInternalModule<B: Backend> {
    /// `[num_node_feat, inter_feat_channels]`, present on start supervertices.
    embedding:     Option<Param<Tensor<B, 2>>>,
    gcn_layers:    Vec<GcnLayer<B>>,
    rgcn_layers:   Vec<RgcnLayer<B>>,
    relu_last:     bool,
    concat_output: bool,
    add_parents:   bool,
    out_channels:  usize,
}

impl<B: Backend> GripNetInternalModule<B> {
    pub fn new(
        vertex:     &SuperVertex,
        setting:    &SuperVertexParaSetting,
        start:      bool,
        task:       bool,
        device:     &B::Device,
    ) -> Self {
        let embedding = start.then(|| {
            Initializer::Normal { mean: 0.0, std: 1.0 }
                .init([vertex.num_node_feat(), setting.inter_feat_channels], device)
        });

        let dims: Vec<usize> = std::iter::once(setting.inter_feat_channels)
            .chain(setting.inter_agg_channels_list.iter().copied())
            .collect();

        let (mut gcn_layers, mut rgcn_layers) = (Vec::new(), Vec::new());
        for (i, pair) in dims.windows(2).enumerate() {
            if vertex.is_multi_relational() {
                rgcn_layers.push(RgcnLayer::new(
                    pair[0],
                    pair[1],
                    vertex.num_edge_type(),
                    setting.num_bases,
                    i > 0,
                    device,
                ));
            } else {
                gcn_layers.push(GcnLayer::new(pair[0], pair[1], device));
            }
        }

        Self {
            embedding,
            gcn_layers,
            rgcn_layers,
            relu_last: !task,
            concat_output: setting.concat_output,
            add_parents: setting.resolved_mode() == Some(AggregationMode::Add),
            out_channels: setting.out_channels(),
        }
    }

    fn layers(&self) -> Vec<&dyn Propagate<B>> {
        self.gcn_layers
            .iter()
            .map(|l| l as &dyn Propagate<B>)
            .chain(self.rgcn_layers.iter().map(|l| l as &dyn Propagate<B>))
            .collect()
    }

    /// Input features of a start supervertex projected to `inter_feat_channels`.
    pub fn project(&self, features: &InputFeatures<B>, device: &B::Device) -> Tensor<B, 2> {
        match (&self.embedding, features) {
            (Some(e), InputFeatures::Identity(_)) => e.val(),
            (Some(e), InputFeatures::Dense(x)) => x.clone().matmul(e.val()),
            (None, InputFeatures::Dense(x)) => x.clone(),
            (None, InputFeatures::Identity(n)) => {
                let eye: Vec<f32> = (0..n * n).map(|i| if i % (n + 1) == 0 { 1.0 } else { 0.0 }).collect();
                float_matrix(&eye, *n, *n, device)
            }
        }
    }

    /// Merge the external messages of all parents.
    pub fn combine(&self, messages: Vec<Tensor<B, 2>>) -> Tensor<B, 2> {
        if self.add_parents {
            Tensor::stack::<3>(messages, 0).sum_dim(0).squeeze::<2>(0)
        } else {
            Tensor::cat(messages, 1)
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>, graph: &GraphTensors<B>) -> Tensor<B, 2> {
        let layers = self.layers();
        let last = layers.len().saturating_sub(1);

        let mut outputs = Vec::with_capacity(layers.len() + 1);
        let mut x = x;
        for (i, layer) in layers.into_iter().enumerate() {
            if self.concat_output {
                outputs.push(x.clone());
            }
            x = layer.propagate(x, graph);
            if i < last || self.relu_last {
                x = relu(x);
            }
        }

        if self.concat_output {
            outputs.push(x);
            Tensor::cat(outputs, 1)
        } else {
            x
        }
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn describe(&self) -> String {
        let layers: Vec<String> = self.layers().iter().map(|l| l.describe()).collect();
        let embedding = match &self.embedding {
            Some(e) => format!("embedding={:?}, ", e.val().dims()),
            None => String::new(),
        };
        format!(
            "GripNetInternalModule({embedding}layers=[{}], concat_output={}, out_channels={})",
            layers.join(", "),
            self.concat_output,
            self.out_channels
        )
    }
}

// ─── External module ──────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct GripNetExternalModule<B: Backend> {
    layer:        GcnLayer<B>,
    num_out_node: usize,
}

impl<B: Backend> GripNetExternalModule<B> {
    pub fn new(in_channels: usize, out_channels: usize, num_out_node: usize, device: &B::Device) -> Self {
        Self { layer: GcnLayer::new(in_channels, out_channels, device), num_out_node }
    }

    /// Source embeddings `[num_src, in]` → target messages `[num_out_node, out]`.
    pub fn forward(&self, x: Tensor<B, 2>, graph: &GraphTensors<B>) -> Tensor<B, 2> {
        let [num_src, channels] = x.dims();
        let padding = Tensor::zeros([self.num_out_node, channels], &x.device());
        let stacked = Tensor::cat(vec![x, padding], 0);
        let out = self.layer.forward(stacked, graph);
        relu(out.slice([num_src..num_src + self.num_out_node]))
    }

    pub fn describe(&self) -> String {
        format!(
            "GripNetExternalModule({}, num_out_node={})",
            Propagate::describe(&self.layer),
            self.num_out_node
        )
    }
}

// ─── GripNet ──────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct GripNet<B: Backend> {
    /// Non-task supervertices, topological order.
    upstream:     Vec<GripNetInternalModule<B>>,
    task:         GripNetInternalModule<B>,
    /// One per superedge, in superedge order.
    external:     Vec<GripNetExternalModule<B>>,
    out_channels: usize,
}

impl<B: Backend> GripNet<B> {
    pub fn new(supergraph: &SuperGraph, device: &B::Device) -> Result<Self, SupergraphError> {
        fn setting(vertex: &SuperVertex) -> Result<&SuperVertexParaSetting, SupergraphError> {
            vertex
                .para_setting()
                .ok_or_else(|| SupergraphError::MissingSetting(vertex.name().to_string()))
        }
        if let Some(name) = supergraph.missing_settings().first() {
            return Err(SupergraphError::MissingSetting(name.to_string()));
        }
        let internal = |vertex: &SuperVertex, task: bool| -> Result<_, SupergraphError> {
            let start = supergraph.parents(vertex.name()).is_empty();
            Ok(GripNetInternalModule::new(vertex, setting(vertex)?, start, task, device))
        };

        let upstream = supergraph
            .upstream()
            .map(|v| internal(v, false))
            .collect::<Result<Vec<_>, _>>()?;
        let task_vertex = supergraph.task_supervertex();
        let task = internal(task_vertex, true)?;

        let external = supergraph
            .superedges()
            .iter()
            .map(|e| {
                let source = supergraph
                    .supervertex(&e.source)
                    .ok_or_else(|| SupergraphError::UnknownSupervertex(e.source.clone()))?;
                let target = supergraph
                    .supervertex(&e.target)
                    .ok_or_else(|| SupergraphError::UnknownSupervertex(e.target.clone()))?;
                let out_channels = setting(target)?
                    .exter_agg_channels_dict
                    .get(&e.source)
                    .copied()
                    .ok_or_else(|| SupergraphError::InvalidSetting {
                        name:   e.target.clone(),
                        reason: format!("no external channels for parent '{}'", e.source),
                    })?;
                Ok(GripNetExternalModule::new(
                    setting(source)?.out_channels(),
                    out_channels,
                    target.num_node(),
                    device,
                ))
            })
            .collect::<Result<Vec<_>, SupergraphError>>()?;

        let out_channels = task.out_channels();
        tracing::debug!(
            "GripNet: {} internal modules, {} external modules, out_channels={}",
            upstream.len() + 1,
            external.len(),
            out_channels
        );
        Ok(Self { upstream, task, external, out_channels })
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Embeddings of the task supervertex, `[num_node, out_channels]`.
    pub fn forward(&self, inputs: &SupergraphInputs<B>) -> Tensor<B, 2> {
        let mut outputs: Vec<Tensor<B, 2>> = Vec::with_capacity(self.upstream.len());
        for (module, vertex) in self.upstream.iter().zip(&inputs.upstream) {
            let x = self.vertex_input(module, vertex, &outputs);
            outputs.push(module.forward(x, &vertex.graph));
        }
        let x = self.vertex_input(&self.task, &inputs.task, &outputs);
        self.task.forward(x, &inputs.task.graph)
    }

    fn vertex_input(
        &self,
        module:  &GripNetInternalModule<B>,
        vertex:  &VertexInputs<B>,
        outputs: &[Tensor<B, 2>],
    ) -> Tensor<B, 2> {
        if vertex.parents.is_empty() {
            return module.project(&vertex.features, &vertex.graph.src.device());
        }
        let messages = vertex
            .parents
            .iter()
            .map(|link| self.external[link.superedge].forward(outputs[link.parent].clone(), &link.graph))
            .collect();
        module.combine(messages)
    }

    /// Printable ModuleDict-style view, named after the supergraph.
    pub fn summary<'a>(&'a self, supergraph: &'a SuperGraph) -> GripNetSummary<'a, B> {
        GripNetSummary { net: self, supergraph }
    }
}

pub struct GripNetSummary<'a, B: Backend> {
    net:        &'a GripNet<B>,
    supergraph: &'a SuperGraph,
}

impl<B: Backend> fmt::Display for GripNetSummary<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let internal = self
            .supergraph
            .upstream()
            .zip(&self.net.upstream)
            .chain(std::iter::once((self.supergraph.task_supervertex(), &self.net.task)));

        writeln!(f, "GripNet ModuleDict(")?;
        for (vertex, module) in internal {
            for (e, external) in self.supergraph.superedges().iter().zip(&self.net.external) {
                if e.target == vertex.name() {
                    writeln!(f, "  ({}__{}): {}", e.source, e.target, external.describe())?;
                }
            }
            writeln!(f, "  ({}): {}", vertex.name(), module.describe())?;
        }
        write!(f, ")")
    }
}
