// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing supergraphs:
//
//   graph.rs         COO edge lists and node features
//   supergraph.rs    supervertices, superedges, the DAG itself
//   setting.rs       per-supervertex channel settings
//   dataset.rs       the PoSE graph in host memory
//   error.rs         everything that can be wrong with the above
//   traits.rs        where a dataset comes from
//
// No Burn types, no file or network I/O in this layer. Only
// petgraph is used, for the DAG bookkeeping.

pub mod dataset;
pub mod error;
pub mod graph;
pub mod setting;
pub mod supergraph;
pub mod traits;
