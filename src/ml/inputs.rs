// ============================================================
// Layer 5 — Device-Resident Graph Inputs
// ============================================================
// Turns the host-side supergraph into tensors once, before the
// first forward pass:
//
//   GraphTensors      src / dst index tensors plus a per-edge
//                     coefficient [E, 1], computed on the host
//   VertexInputs      features of one supervertex, its internal
//                     graph and the bipartite graphs from parents
//   SupergraphInputs  all vertices in topological order
//   EdgeBatch         typed edges to be scored by the decoder
//
// Messages always flow src → dst and are summed at dst after
// being scaled by the coefficient, so GCN and mean-RGCN
// normalisation differ only in how `norm` is computed.

use std::ops::Range;

use burn::prelude::*;

use crate::domain::dataset::LabeledEdges;
use crate::domain::graph::{EdgeIndex, NodeFeatures};
use crate::domain::supergraph::{SuperGraph, SuperVertex};

// ─── Host-side normalisation ──────────────────────────────────────────────────

/// Edges with a self loop appended for every node lacking one, and the
/// symmetric coefficient `deg(src)^-1/2 · deg(dst)^-1/2`, where the degree
/// counts outgoing edges including the self loop.
pub fn gcn_norm(edges: &EdgeIndex, num_nodes: usize) -> (Vec<usize>, Vec<usize>, Vec<f32>) {
    let mut has_loop = vec![false; num_nodes];
    for (s, d) in edges.iter() {
        if s == d {
            has_loop[s] = true;
        }
    }

    let mut src = edges.src.clone();
    let mut dst = edges.dst.clone();
    for node in (0..num_nodes).filter(|&n| !has_loop[n]) {
        src.push(node);
        dst.push(node);
    }

    let mut deg = vec![0.0f32; num_nodes];
    for &s in &src {
        deg[s] += 1.0;
    }
    let inv_sqrt: Vec<f32> = deg
        .iter()
        .map(|&d| if d > 0.0 { d.powf(-0.5) } else { 0.0 })
        .collect();
    let norm = src.iter().zip(&dst).map(|(&s, &d)| inv_sqrt[s] * inv_sqrt[d]).collect();

    (src, dst, norm)
}

/// `1 / in-degree(dst)` per edge: summing scaled messages is a mean.
pub fn mean_norm(edges: &EdgeIndex, num_nodes: usize) -> Vec<f32> {
    let mut in_deg = vec![0.0f32; num_nodes];
    for &d in &edges.dst {
        in_deg[d] += 1.0;
    }
    edges.dst.iter().map(|&d| 1.0 / in_deg[d]).collect()
}

pub(crate) fn index_tensor<B: Backend>(values: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let ints: Vec<i32> = values.iter().map(|&v| v as i32).collect();
    Tensor::<B, 1, Int>::from_ints(ints.as_slice(), device)
}

pub(crate) fn float_matrix<B: Backend>(values: &[f32], rows: usize, cols: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 1>::from_floats(values, device).reshape([rows, cols])
}

// ─── GraphTensors ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GraphTensors<B: Backend> {
    pub src:         Tensor<B, 1, Int>,
    pub dst:         Tensor<B, 1, Int>,
    pub norm:        Tensor<B, 2>,
    /// Contiguous edge range of every relation, in relation order.
    pub type_ranges: Vec<Range<usize>>,
    pub num_nodes:   usize,
}

impl<B: Backend> GraphTensors<B> {
    fn from_host(src: &[usize], dst: &[usize], norm: &[f32], type_ranges: Vec<Range<usize>>, num_nodes: usize, device: &B::Device) -> Self {
        Self {
            src: index_tensor(src, device),
            dst: index_tensor(dst, device),
            norm: float_matrix(norm, norm.len(), 1, device),
            type_ranges,
            num_nodes,
        }
    }

    /// Homogeneous graph with GCN normalisation and self loops.
    pub fn gcn(edges: &EdgeIndex, num_nodes: usize, device: &B::Device) -> Self {
        let (src, dst, norm) = gcn_norm(edges, num_nodes);
        let all = 0..src.len();
        Self::from_host(&src, &dst, &norm, vec![all], num_nodes, device)
    }

    /// Typed graph; `edges` must already be grouped by type as `type_ranges` says.
    pub fn relational(edges: &EdgeIndex, type_ranges: &[Range<usize>], num_nodes: usize, device: &B::Device) -> Self {
        let norm = mean_norm(edges, num_nodes);
        Self::from_host(&edges.src, &edges.dst, &norm, type_ranges.to_vec(), num_nodes, device)
    }

    /// Source → target edges over the stacked node set
    /// `[source nodes; target nodes]`, targets shifted by `num_src`.
    pub fn bipartite(edges: &EdgeIndex, num_src: usize, num_dst: usize, device: &B::Device) -> Self {
        let shifted = EdgeIndex {
            src: edges.src.clone(),
            dst: edges.dst.iter().map(|&d| d + num_src).collect(),
        };
        Self::gcn(&shifted, num_src + num_dst, device)
    }

    /// Internal graph of a supervertex: relational when it has several edge types.
    pub fn for_supervertex(vertex: &SuperVertex, device: &B::Device) -> Self {
        if vertex.is_multi_relational() {
            Self::relational(vertex.edge_index(), vertex.edge_type_ranges(), vertex.num_node(), device)
        } else {
            Self::gcn(vertex.edge_index(), vertex.num_node(), device)
        }
    }
}

// ─── Supergraph inputs ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum InputFeatures<B: Backend> {
    Dense(Tensor<B, 2>),
    Identity(usize),
}

impl<B: Backend> InputFeatures<B> {
    pub fn new(features: &NodeFeatures, device: &B::Device) -> Self {
        match features {
            NodeFeatures::Dense { values, rows, cols } => Self::Dense(float_matrix(values, *rows, *cols, device)),
            NodeFeatures::Identity(n) => Self::Identity(*n),
        }
    }
}

/// Edges from an already-encoded parent into this supervertex.
#[derive(Debug, Clone)]
pub struct ParentLink<B: Backend> {
    /// Position of the parent in `SupergraphInputs::upstream`.
    pub parent:   usize,
    /// Index of the superedge, which is also the external module index.
    pub superedge: usize,
    pub graph:    GraphTensors<B>,
}

#[derive(Debug, Clone)]
pub struct VertexInputs<B: Backend> {
    pub features: InputFeatures<B>,
    pub graph:    GraphTensors<B>,
    pub parents:  Vec<ParentLink<B>>,
}

#[derive(Debug, Clone)]
pub struct SupergraphInputs<B: Backend> {
    /// Non-task supervertices in topological order.
    pub upstream: Vec<VertexInputs<B>>,
    pub task:     VertexInputs<B>,
}

impl<B: Backend> SupergraphInputs<B> {
    pub fn new(supergraph: &SuperGraph, device: &B::Device) -> Self {
        let upstream_names: Vec<&str> = supergraph.upstream().map(SuperVertex::name).collect();

        let vertex_inputs = |vertex: &SuperVertex| {
            let parents = supergraph
                .superedges()
                .iter()
                .enumerate()
                .filter(|(_, e)| e.target == vertex.name())
                .filter_map(|(superedge, e)| {
                    let parent = upstream_names.iter().position(|&n| n == e.source)?;
                    let source = supergraph.supervertex(&e.source)?;
                    let graph = GraphTensors::bipartite(&e.edge_index, source.num_node(), vertex.num_node(), device);
                    Some(ParentLink { parent, superedge, graph })
                })
                .collect();
            VertexInputs {
                features: InputFeatures::new(vertex.node_feat(), device),
                graph: GraphTensors::for_supervertex(vertex, device),
                parents,
            }
        };

        Self {
            upstream: supergraph.upstream().map(vertex_inputs).collect(),
            task: vertex_inputs(supergraph.task_supervertex()),
        }
    }
}

// ─── EdgeBatch ────────────────────────────────────────────────────────────────

/// Typed node pairs to score.
#[derive(Debug, Clone)]
pub struct EdgeBatch<B: Backend> {
    pub src:       Tensor<B, 1, Int>,
    pub dst:       Tensor<B, 1, Int>,
    pub edge_type: Tensor<B, 1, Int>,
    pub len:       usize,
}

impl<B: Backend> EdgeBatch<B> {
    pub fn new(edges: &LabeledEdges, device: &B::Device) -> Self {
        Self {
            src:       index_tensor(&edges.edge_index.src, device),
            dst:       index_tensor(&edges.edge_index.dst, device),
            edge_type: index_tensor(&edges.edge_type, device),
            len:       edges.num_edges(),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_gcn_norm_adds_missing_self_loops() {
        // 0 → 1, 1 → 1 (already a loop)
        let edges = EdgeIndex::from_pairs([(0, 1), (1, 1)]);
        let (src, dst, norm) = gcn_norm(&edges, 2);

        assert_eq!(src, vec![0, 1, 0]);
        assert_eq!(dst, vec![1, 1, 0]);
        // out-degrees including loops: node 0 → 2, node 1 → 1
        let expected = [0.5f32.sqrt(), 1.0, 0.5];
        for (n, e) in norm.iter().zip(expected) {
            assert!((n - e).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mean_norm() {
        let edges = EdgeIndex::from_pairs([(0, 2), (1, 2), (2, 0)]);
        assert_eq!(mean_norm(&edges, 3), vec![0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_bipartite_shifts_targets() {
        let device = Default::default();
        let g = GraphTensors::<B>::bipartite(&EdgeIndex::from_pairs([(0, 1), (2, 0)]), 3, 2, &device);

        assert_eq!(g.num_nodes, 5);
        // two edges plus one self loop per node
        assert_eq!(g.src.dims(), [7]);
        let dst: Vec<i32> = g.dst.into_data().convert::<i32>().to_vec().unwrap();
        assert_eq!(&dst[..2], &[4, 3]);
    }

    #[test]
    fn test_supergraph_inputs_link_parents() {
        use crate::domain::supergraph::SuperEdge;

        let gene = SuperVertex::new(
            "gene",
            NodeFeatures::Identity(3),
            EdgeIndex::from_pairs([(0, 1), (1, 2)]),
            None,
        )
        .unwrap();
        let drug = SuperVertex::new(
            "drug",
            NodeFeatures::Identity(2),
            EdgeIndex::from_pairs([(0, 1), (1, 0)]),
            Some(vec![1, 0]),
        )
        .unwrap();
        let sg = SuperGraph::new(
            vec![drug, gene],
            vec![SuperEdge::new("gene", "drug", EdgeIndex::from_pairs([(2, 0)]))],
        )
        .unwrap();

        let inputs = SupergraphInputs::<B>::new(&sg, &Default::default());
        assert_eq!(inputs.upstream.len(), 1);
        assert!(inputs.upstream[0].parents.is_empty());
        assert_eq!(inputs.task.parents.len(), 1);
        assert_eq!(inputs.task.parents[0].parent, 0);
        assert_eq!(inputs.task.graph.type_ranges.len(), 2);
    }
}
