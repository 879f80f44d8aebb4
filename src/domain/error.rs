// ============================================================
// Layer 3 — Domain Errors
// ============================================================
// Everything that can be wrong with a supergraph before a single
// tensor is allocated: bad indices, dangling superedges, cycles,
// inconsistent per-vertex settings.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SupergraphError {
    #[error("'{name}': {edges} edges but {types} edge types")]
    EdgeTypeLengthMismatch { name: String, edges: usize, types: usize },

    #[error("'{name}': node index {index} out of range for {num_node} nodes")]
    NodeIndexOutOfRange { name: String, index: usize, num_node: usize },

    #[error("'{name}': edge type {edge_type} out of range for {num_edge_type} edge types")]
    EdgeTypeOutOfRange { name: String, edge_type: usize, num_edge_type: usize },

    #[error("'{0}' has no edges")]
    EmptyEdges(String),

    #[error("feature matrix of {len} values does not have shape [{rows}, {cols}]")]
    FeatureShape { rows: usize, cols: usize, len: usize },

    #[error("supervertex '{0}' is defined twice")]
    DuplicateSupervertex(String),

    #[error("unknown supervertex '{0}'")]
    UnknownSupervertex(String),

    #[error("superedge {from} -> {to} is defined twice")]
    DuplicateSuperedge { from: String, to: String },

    #[error("supergraph has a cycle through '{0}'")]
    Cycle(String),

    #[error("supergraph needs exactly one task supervertex, found {0}")]
    TaskSupervertexCount(usize),

    #[error("invalid setting for '{name}': {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("no parameter setting for supervertex '{0}'")]
    MissingSetting(String),
}
