// ============================================================
// Layer 3 — Graph Building Blocks
// ============================================================
// COO edge lists and node feature matrices, kept as plain host
// vectors. Nothing here knows about tensors or devices.

use serde::{Deserialize, Serialize};

use crate::domain::error::SupergraphError;

/// Edge list in COO format: `src[i] -> dst[i]`, i.e. a `[2, E]` index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeIndex {
    pub src: Vec<usize>,
    pub dst: Vec<usize>,
}

impl EdgeIndex {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let (src, dst) = pairs.into_iter().unzip();
        Self { src, dst }
    }

    pub fn num_edges(&self) -> usize {
        self.src.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.src.iter().copied().zip(self.dst.iter().copied())
    }

    pub fn max_src(&self) -> Option<usize> {
        self.src.iter().copied().max()
    }

    pub fn max_dst(&self) -> Option<usize> {
        self.dst.iter().copied().max()
    }

    /// Reorder edges so that edge `i` of the result is edge `order[i]` of `self`.
    pub fn permuted(&self, order: &[usize]) -> Self {
        Self {
            src: order.iter().map(|&i| self.src[i]).collect(),
            dst: order.iter().map(|&i| self.dst[i]).collect(),
        }
    }
}

/// Node features of a supervertex.
///
/// `Identity` stands for a one-hot feature per node without
/// materialising the `[n, n]` matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeFeatures {
    Dense { values: Vec<f32>, rows: usize, cols: usize },
    Identity(usize),
}

impl NodeFeatures {
    pub fn dense(values: Vec<f32>, rows: usize, cols: usize) -> Result<Self, SupergraphError> {
        if values.len() != rows * cols {
            return Err(SupergraphError::FeatureShape { rows, cols, len: values.len() });
        }
        Ok(Self::Dense { values, rows, cols })
    }

    pub fn num_nodes(&self) -> usize {
        match self {
            Self::Dense { rows, .. } => *rows,
            Self::Identity(n) => *n,
        }
    }

    pub fn num_features(&self) -> usize {
        match self {
            Self::Dense { cols, .. } => *cols,
            Self::Identity(n) => *n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permuted_reorders_both_rows() {
        let edges = EdgeIndex::from_pairs([(0, 1), (2, 3), (4, 5)]);
        let p = edges.permuted(&[2, 0, 1]);
        assert_eq!(p.src, vec![4, 0, 2]);
        assert_eq!(p.dst, vec![5, 1, 3]);
    }

    #[test]
    fn test_dense_shape_checked() {
        assert!(NodeFeatures::dense(vec![0.0; 6], 2, 3).is_ok());
        assert!(NodeFeatures::dense(vec![0.0; 5], 2, 3).is_err());
    }

    #[test]
    fn test_identity_dimensions() {
        let f = NodeFeatures::Identity(7);
        assert_eq!(f.num_nodes(), 7);
        assert_eq!(f.num_features(), 7);
    }
}
