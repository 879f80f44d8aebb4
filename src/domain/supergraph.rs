// ============================================================
// Layer 3 — Supervertices, Superedges and the Supergraph
// ============================================================
// A supergraph is a small DAG whose nodes are whole graphs:
//
//   gene ──(gene→drug edges)──▶ drug
//
// Each supervertex carries its node features and internal edges
// (optionally typed). Each superedge carries the edges from the
// nodes of one supervertex to the nodes of another. The unique
// sink of the DAG is the task supervertex whose embeddings are
// decoded into link predictions.
//
// petgraph does the DAG bookkeeping (cycle check, topological
// order); the node weight is the position in `supervertices`.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::domain::error::SupergraphError;
use crate::domain::graph::{EdgeIndex, NodeFeatures};
use crate::domain::setting::SuperVertexParaSetting;

// ─── SuperVertex ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SuperVertex {
    name:             String,
    node_feat:        NodeFeatures,
    edge_index:       EdgeIndex,
    num_edge_type:    usize,
    edge_type_ranges: Vec<Range<usize>>,
    para_setting:     Option<SuperVertexParaSetting>,
}

impl SuperVertex {
    /// Build a supervertex. Typed edges are stably sorted by type so that
    /// every edge type occupies one contiguous range.
    pub fn new(
        name:       impl Into<String>,
        node_feat:  NodeFeatures,
        edge_index: EdgeIndex,
        edge_type:  Option<Vec<usize>>,
    ) -> Result<Self, SupergraphError> {
        let name = name.into();
        let num_node = node_feat.num_nodes();

        if edge_index.is_empty() {
            return Err(SupergraphError::EmptyEdges(name));
        }
        if let Some(index) = edge_index
            .src
            .iter()
            .chain(edge_index.dst.iter())
            .copied()
            .find(|&i| i >= num_node)
        {
            return Err(SupergraphError::NodeIndexOutOfRange { name, index, num_node });
        }

        let (edge_index, num_edge_type, edge_type_ranges) = match edge_type {
            None => {
                let n = edge_index.num_edges();
                (edge_index, 1, vec![0..n])
            }
            Some(types) => {
                if types.len() != edge_index.num_edges() {
                    return Err(SupergraphError::EdgeTypeLengthMismatch {
                        name,
                        edges: edge_index.num_edges(),
                        types: types.len(),
                    });
                }
                let mut order: Vec<usize> = (0..types.len()).collect();
                order.sort_by_key(|&i| types[i]);
                let sorted_types: Vec<usize> = order.iter().map(|&i| types[i]).collect();
                let num_edge_type = sorted_types.last().map_or(1, |&t| t + 1);
                let ranges = (0..num_edge_type)
                    .map(|t| {
                        let start = sorted_types.partition_point(|&x| x < t);
                        let end = sorted_types.partition_point(|&x| x <= t);
                        start..end
                    })
                    .collect();
                (edge_index.permuted(&order), num_edge_type, ranges)
            }
        };

        Ok(Self {
            name,
            node_feat,
            edge_index,
            num_edge_type,
            edge_type_ranges,
            para_setting: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_feat(&self) -> &NodeFeatures {
        &self.node_feat
    }

    pub fn edge_index(&self) -> &EdgeIndex {
        &self.edge_index
    }

    pub fn num_edge_type(&self) -> usize {
        self.num_edge_type
    }

    /// More than one edge type means relational (RGCN) aggregation.
    pub fn is_multi_relational(&self) -> bool {
        self.num_edge_type > 1
    }

    /// `[start, end)` range of every edge type inside `edge_index`.
    pub fn edge_type_ranges(&self) -> &[Range<usize>] {
        &self.edge_type_ranges
    }

    pub fn num_node(&self) -> usize {
        self.node_feat.num_nodes()
    }

    pub fn num_node_feat(&self) -> usize {
        self.node_feat.num_features()
    }

    pub fn num_edges(&self) -> usize {
        self.edge_index.num_edges()
    }

    pub fn para_setting(&self) -> Option<&SuperVertexParaSetting> {
        self.para_setting.as_ref()
    }
}

// ─── SuperEdge ────────────────────────────────────────────────────────────────

/// Directed edges from the nodes of `source` to the nodes of `target`.
#[derive(Debug, Clone)]
pub struct SuperEdge {
    pub source:     String,
    pub target:     String,
    pub edge_index: EdgeIndex,
}

impl SuperEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, edge_index: EdgeIndex) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            edge_index,
        }
    }
}

// ─── SuperGraph ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SuperGraph {
    supervertices:     Vec<SuperVertex>,
    superedges:        Vec<SuperEdge>,
    positions:         HashMap<String, usize>,
    dag:               DiGraph<usize, usize>,
    topological_order: Vec<usize>,
    task:              usize,
}

impl SuperGraph {
    pub fn new(
        supervertices: Vec<SuperVertex>,
        superedges:    Vec<SuperEdge>,
    ) -> Result<Self, SupergraphError> {
        let mut positions = HashMap::with_capacity(supervertices.len());
        let mut dag = DiGraph::with_capacity(supervertices.len(), superedges.len());

        for (pos, vertex) in supervertices.iter().enumerate() {
            if positions.insert(vertex.name.clone(), pos).is_some() {
                return Err(SupergraphError::DuplicateSupervertex(vertex.name.clone()));
            }
            dag.add_node(pos);
        }

        for (i, superedge) in superedges.iter().enumerate() {
            let source = *positions
                .get(&superedge.source)
                .ok_or_else(|| SupergraphError::UnknownSupervertex(superedge.source.clone()))?;
            let target = *positions
                .get(&superedge.target)
                .ok_or_else(|| SupergraphError::UnknownSupervertex(superedge.target.clone()))?;

            let (s, t) = (NodeIndex::new(source), NodeIndex::new(target));
            if dag.find_edge(s, t).is_some() {
                return Err(SupergraphError::DuplicateSuperedge {
                    from: superedge.source.clone(),
                    to:   superedge.target.clone(),
                });
            }
            check_superedge_bounds(superedge, &supervertices[source], &supervertices[target])?;
            dag.add_edge(s, t, i);
        }

        let topological_order: Vec<usize> = toposort(&dag, None)
            .map_err(|cycle| {
                SupergraphError::Cycle(supervertices[dag[cycle.node_id()]].name.clone())
            })?
            .into_iter()
            .map(|n| dag[n])
            .collect();

        let sinks: Vec<usize> = dag
            .node_indices()
            .filter(|&n| dag.neighbors_directed(n, Direction::Outgoing).next().is_none())
            .map(|n| dag[n])
            .collect();
        let task = match sinks.as_slice() {
            [task] => *task,
            other => return Err(SupergraphError::TaskSupervertexCount(other.len())),
        };

        tracing::debug!(
            "Supergraph: {} supervertices, {} superedges, task '{}'",
            supervertices.len(),
            superedges.len(),
            supervertices[task].name
        );

        Ok(Self {
            supervertices,
            superedges,
            positions,
            dag,
            topological_order,
            task,
        })
    }

    /// Attach per-vertex settings. External channels must name exactly
    /// the parents of the vertex.
    pub fn set_supergraph_para_setting(
        &mut self,
        settings: Vec<SuperVertexParaSetting>,
    ) -> Result<(), SupergraphError> {
        for setting in settings {
            setting.validate()?;
            let pos = self.position(&setting.supervertex_name)?;

            let mut expected: Vec<&str> = self.parents_of(pos).map(|p| self.supervertices[p].name()).collect();
            expected.sort_unstable();
            let given: Vec<&str> = setting.exter_agg_channels_dict.keys().map(String::as_str).collect();
            if expected != given {
                return Err(SupergraphError::InvalidSetting {
                    name:   setting.supervertex_name.clone(),
                    reason: format!("external channels given for {given:?}, parents are {expected:?}"),
                });
            }

            self.supervertices[pos].para_setting = Some(setting);
        }
        Ok(())
    }

    /// Names of supervertices whose settings are still missing.
    pub fn missing_settings(&self) -> Vec<&str> {
        self.supervertices
            .iter()
            .filter(|v| v.para_setting.is_none())
            .map(|v| v.name())
            .collect()
    }

    pub fn topological_order(&self) -> Vec<&str> {
        self.topological_order
            .iter()
            .map(|&p| self.supervertices[p].name())
            .collect()
    }

    /// Supervertices in topological order, task supervertex excluded.
    pub fn upstream(&self) -> impl Iterator<Item = &SuperVertex> + '_ {
        self.topological_order
            .iter()
            .filter(move |&&p| p != self.task)
            .map(move |&p| &self.supervertices[p])
    }

    pub fn task_supervertex(&self) -> &SuperVertex {
        &self.supervertices[self.task]
    }

    pub fn supervertex(&self, name: &str) -> Option<&SuperVertex> {
        self.positions.get(name).map(|&p| &self.supervertices[p])
    }

    pub fn superedges(&self) -> &[SuperEdge] {
        &self.superedges
    }

    /// Parents of `name` in topological order.
    pub fn parents(&self, name: &str) -> Vec<&SuperVertex> {
        match self.positions.get(name) {
            Some(&pos) => self.parents_of(pos).map(|p| &self.supervertices[p]).collect(),
            None => Vec::new(),
        }
    }

    fn parents_of(&self, pos: usize) -> impl Iterator<Item = usize> + '_ {
        let mut parents: Vec<usize> = self
            .dag
            .neighbors_directed(NodeIndex::new(pos), Direction::Incoming)
            .map(|n| self.dag[n])
            .collect();
        parents.sort_by_key(|p| self.topological_order.iter().position(|q| q == p));
        parents.into_iter()
    }

    fn position(&self, name: &str) -> Result<usize, SupergraphError> {
        self.positions
            .get(name)
            .copied()
            .ok_or_else(|| SupergraphError::UnknownSupervertex(name.to_string()))
    }
}

fn check_superedge_bounds(
    superedge: &SuperEdge,
    source:    &SuperVertex,
    target:    &SuperVertex,
) -> Result<(), SupergraphError> {
    let name = format!("{} -> {}", superedge.source, superedge.target);
    if superedge.edge_index.is_empty() {
        return Err(SupergraphError::EmptyEdges(name));
    }
    if let Some(index) = superedge.edge_index.src.iter().copied().find(|&i| i >= source.num_node()) {
        return Err(SupergraphError::NodeIndexOutOfRange { name, index, num_node: source.num_node() });
    }
    if let Some(index) = superedge.edge_index.dst.iter().copied().find(|&i| i >= target.num_node()) {
        return Err(SupergraphError::NodeIndexOutOfRange { name, index, num_node: target.num_node() });
    }
    Ok(())
}

impl fmt::Display for SuperGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SuperGraph(")?;
        writeln!(f, "  supervertices: [")?;
        for &pos in &self.topological_order {
            let v = &self.supervertices[pos];
            writeln!(
                f,
                "    {}(num_node={}, num_node_feat={}, num_edge={}, num_edge_type={}),",
                v.name,
                v.num_node(),
                v.num_node_feat(),
                v.num_edges(),
                v.num_edge_type
            )?;
        }
        writeln!(f, "  ],")?;
        writeln!(f, "  superedges: [")?;
        for e in &self.superedges {
            writeln!(f, "    {} -> {}(num_edge={}),", e.source, e.target, e.edge_index.num_edges())?;
        }
        writeln!(f, "  ],")?;
        writeln!(f, "  topological_order: {:?},", self.topological_order())?;
        write!(f, ")")
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(name: &str, n: usize) -> SuperVertex {
        let edges = EdgeIndex::from_pairs((0..n).map(|i| (i, (i + 1) % n)));
        SuperVertex::new(name, NodeFeatures::Identity(n), edges, None).unwrap()
    }

    fn link(source: &str, target: &str) -> SuperEdge {
        SuperEdge::new(source, target, EdgeIndex::from_pairs([(0, 0), (1, 1)]))
    }

    #[test]
    fn test_typed_edges_sorted_with_ranges() {
        let edges = EdgeIndex::from_pairs([(0, 1), (1, 2), (2, 0), (0, 2)]);
        let v = SuperVertex::new("drug", NodeFeatures::Identity(3), edges, Some(vec![2, 0, 2, 1]))
            .unwrap();

        assert_eq!(v.edge_index().src, vec![1, 0, 0, 2]);
        assert_eq!(v.edge_index().dst, vec![2, 2, 1, 0]);
        assert_eq!(v.num_edge_type(), 3);
        assert_eq!(v.edge_type_ranges(), &[0..1, 1..2, 2..4]);
        assert!(v.is_multi_relational());
    }

    #[test]
    fn test_untyped_vertex_has_one_type() {
        let v = vertex("gene", 4);
        assert_eq!(v.num_edge_type(), 1);
        assert_eq!(v.edge_type_ranges(), &[0..4]);
        assert!(!v.is_multi_relational());
    }

    #[test]
    fn test_vertex_rejects_bad_indices() {
        let edges = EdgeIndex::from_pairs([(0, 5)]);
        let err = SuperVertex::new("gene", NodeFeatures::Identity(3), edges, None).unwrap_err();
        assert!(matches!(err, SupergraphError::NodeIndexOutOfRange { index: 5, .. }));
    }

    #[test]
    fn test_vertex_rejects_type_length_mismatch() {
        let edges = EdgeIndex::from_pairs([(0, 1), (1, 2)]);
        let err = SuperVertex::new("drug", NodeFeatures::Identity(3), edges, Some(vec![0])).unwrap_err();
        assert!(matches!(err, SupergraphError::EdgeTypeLengthMismatch { .. }));
    }

    #[test]
    fn test_topological_order_ends_at_task() {
        let sg = SuperGraph::new(
            vec![vertex("drug", 3), vertex("protein", 3), vertex("gene", 3)],
            vec![link("gene", "protein"), link("protein", "drug"), link("gene", "drug")],
        )
        .unwrap();

        assert_eq!(sg.topological_order(), vec!["gene", "protein", "drug"]);
        assert_eq!(sg.task_supervertex().name(), "drug");
        let parents: Vec<&str> = sg.parents("drug").iter().map(|v| v.name()).collect();
        assert_eq!(parents, vec!["gene", "protein"]);
        let upstream: Vec<&str> = sg.upstream().map(|v| v.name()).collect();
        assert_eq!(upstream, vec!["gene", "protein"]);
        let links: Vec<(&str, &str)> = sg.superedges().iter().map(|e| (e.source.as_str(), e.target.as_str())).collect();
        assert!(links.contains(&("gene", "drug")));
        assert!(!links.contains(&("drug", "gene")));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = SuperGraph::new(
            vec![vertex("a", 2), vertex("b", 2)],
            vec![link("a", "b"), link("b", "a")],
        )
        .unwrap_err();
        assert!(matches!(err, SupergraphError::Cycle(_)));
    }

    #[test]
    fn test_two_sinks_rejected() {
        let err = SuperGraph::new(
            vec![vertex("gene", 2), vertex("drug", 2), vertex("protein", 2)],
            vec![link("gene", "drug"), link("gene", "protein")],
        )
        .unwrap_err();
        assert_eq!(err, SupergraphError::TaskSupervertexCount(2));
    }

    #[test]
    fn test_unknown_endpoint_rejected() {
        let err = SuperGraph::new(vec![vertex("drug", 2)], vec![link("gene", "drug")]).unwrap_err();
        assert_eq!(err, SupergraphError::UnknownSupervertex("gene".into()));
    }

    #[test]
    fn test_superedge_bounds_checked() {
        let bad = SuperEdge::new("gene", "drug", EdgeIndex::from_pairs([(0, 9)]));
        let err = SuperGraph::new(vec![vertex("gene", 2), vertex("drug", 2)], vec![bad]).unwrap_err();
        assert!(matches!(err, SupergraphError::NodeIndexOutOfRange { index: 9, .. }));
    }

    #[test]
    fn test_settings_must_match_parents() {
        let mut sg = SuperGraph::new(
            vec![vertex("gene", 2), vertex("drug", 2)],
            vec![link("gene", "drug")],
        )
        .unwrap();
        assert_eq!(sg.missing_settings(), vec!["gene", "drug"]);

        let wrong = SuperVertexParaSetting::new("drug", 7, vec![6])
            .with_exter_agg_channels([("protein", 7)]);
        assert!(sg.set_supergraph_para_setting(vec![wrong]).is_err());

        sg.set_supergraph_para_setting(vec![
            SuperVertexParaSetting::new("gene", 5, vec![4, 4]),
            SuperVertexParaSetting::new("drug", 7, vec![6, 6]).with_exter_agg_channels([("gene", 7)]),
        ])
        .unwrap();
        assert!(sg.missing_settings().is_empty());
        assert_eq!(sg.supervertex("drug").unwrap().para_setting().unwrap().inter_feat_channels, 7);
    }

    #[test]
    fn test_display_lists_order() {
        let sg = SuperGraph::new(
            vec![vertex("gene", 2), vertex("drug", 2)],
            vec![link("gene", "drug")],
        )
        .unwrap();
        let text = sg.to_string();
        assert!(text.contains("gene -> drug(num_edge=2)"));
        assert!(text.contains("[\"gene\", \"drug\"]"));
    }
}
