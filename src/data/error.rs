// ============================================================
// Layer 4 — Data Errors
// ============================================================

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::error::SupergraphError;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot read '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        err:  std::io::Error,
    },

    #[error(
        "'{0}' is a framework-specific pickled checkpoint; convert it to a safetensors \
         bundle (g_feat, gg_edge_index, d_feat, train_idx, train_et, test_idx, test_et, \
         gd_edge_index), write one with `gripnet-pose export`, or run with --synthetic"
    )]
    UnsupportedFormat(PathBuf),

    #[error("malformed tensor bundle: {0}")]
    Malformed(String),

    #[error("tensor '{0}' not found in bundle")]
    MissingTensor(String),

    #[error("tensor '{name}' has shape {shape:?}, expected {expected}")]
    Shape { name: String, shape: Vec<usize>, expected: &'static str },

    #[error("tensor '{name}' has unsupported dtype {dtype}")]
    Dtype { name: String, dtype: String },

    #[error("tensor '{name}' holds negative index {value}")]
    NegativeIndex { name: String, value: i64 },

    #[error(transparent)]
    Graph(#[from] SupergraphError),
}
