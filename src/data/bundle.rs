// ============================================================
// Layer 4 — Tensor Bundle
// ============================================================
// A dataset on disk is a safetensors file: an 8-byte header
// length, a JSON header naming every tensor with its dtype and
// shape, then the raw little-endian bytes.
//
// The bundle is read fully into owned buffers; the PoSE graph is
// a few megabytes, so there is no need to keep the file mapped.
// Floats may be stored as f32 or f64, indices as i64 or i32.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};

use crate::data::error::DatasetError;
use crate::domain::graph::EdgeIndex;

/// Leading bytes of a zip archive, which is how pickled framework
/// checkpoints are stored.
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
/// Protocol-2+ pickle opcode.
const PICKLE_MAGIC: u8 = 0x80;

#[derive(Debug, Clone)]
struct RawTensor {
    dtype: Dtype,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct TensorBundle {
    tensors: BTreeMap<String, RawTensor>,
}

impl TensorBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let bytes = fs::read(path).map_err(|err| DatasetError::Io { path: path.to_path_buf(), err })?;
        if bytes.starts_with(&ZIP_MAGIC) || bytes.first() == Some(&PICKLE_MAGIC) {
            return Err(DatasetError::UnsupportedFormat(path.to_path_buf()));
        }
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DatasetError> {
        let st = SafeTensors::deserialize(bytes).map_err(|e| DatasetError::Malformed(e.to_string()))?;
        let tensors = st
            .tensors()
            .into_iter()
            .map(|(name, view)| {
                let raw = RawTensor {
                    dtype: view.dtype(),
                    shape: view.shape().to_vec(),
                    bytes: view.data().to_vec(),
                };
                (name, raw)
            })
            .collect();
        Ok(Self { tensors })
    }

    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        let views = self
            .tensors
            .iter()
            .map(|(name, t)| {
                TensorView::new(t.dtype, t.shape.clone(), &t.bytes)
                    .map(|view| (name.as_str(), view))
                    .map_err(|e| DatasetError::Malformed(format!("{name}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let bytes = safetensors::serialize(views, &None).map_err(|e| DatasetError::Malformed(e.to_string()))?;
        fs::write(path, bytes).map_err(|err| DatasetError::Io { path: path.to_path_buf(), err })
    }

    pub fn insert_f32(&mut self, name: impl Into<String>, shape: Vec<usize>, values: &[f32]) {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.tensors.insert(name.into(), RawTensor { dtype: Dtype::F32, shape, bytes });
    }

    pub fn insert_i64(&mut self, name: impl Into<String>, shape: Vec<usize>, values: &[i64]) {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.tensors.insert(name.into(), RawTensor { dtype: Dtype::I64, shape, bytes });
    }

    /// Store an edge list as a `[2, E]` int64 tensor.
    pub fn insert_edge_index(&mut self, name: impl Into<String>, edges: &EdgeIndex) {
        let values: Vec<i64> = edges
            .src
            .iter()
            .chain(edges.dst.iter())
            .map(|&i| i as i64)
            .collect();
        self.insert_i64(name, vec![2, edges.num_edges()], &values);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    /// 2-D float tensor as `(row-major values, rows, cols)`.
    pub fn matrix_f32(&self, name: &str) -> Result<(Vec<f32>, usize, usize), DatasetError> {
        let t = self.get(name)?;
        let &[rows, cols] = t.shape.as_slice() else {
            return Err(shape_error(name, &t.shape, "[rows, cols]"));
        };
        let values = match t.dtype {
            Dtype::F32 => t.bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect(),
            Dtype::F64 => t
                .bytes
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
                .collect(),
            other => return Err(DatasetError::Dtype { name: name.to_string(), dtype: format!("{other:?}") }),
        };
        Ok((values, rows, cols))
    }

    /// `[2, E]` integer tensor as an edge list.
    pub fn edge_index(&self, name: &str) -> Result<EdgeIndex, DatasetError> {
        let t = self.get(name)?;
        let &[2, num_edges] = t.shape.as_slice() else {
            return Err(shape_error(name, &t.shape, "[2, num_edges]"));
        };
        let indices = to_indices(name, self.ints(name)?)?;
        let (src, dst) = indices.split_at(num_edges);
        Ok(EdgeIndex { src: src.to_vec(), dst: dst.to_vec() })
    }

    /// 1-D (or scalar) integer tensor.
    pub fn vector_i64(&self, name: &str) -> Result<Vec<i64>, DatasetError> {
        let t = self.get(name)?;
        if t.shape.len() > 1 {
            return Err(shape_error(name, &t.shape, "[n]"));
        }
        self.ints(name)
    }

    /// 1-D integer tensor of non-negative labels or indices.
    pub fn vector_usize(&self, name: &str) -> Result<Vec<usize>, DatasetError> {
        to_indices(name, self.vector_i64(name)?)
    }

    /// Single non-negative integer stored as a scalar or one-element tensor.
    pub fn scalar_usize(&self, name: &str) -> Result<usize, DatasetError> {
        match self.vector_usize(name)?.as_slice() {
            [n] => Ok(*n),
            _ => Err(shape_error(name, &self.get(name)?.shape, "a scalar")),
        }
    }

    fn get(&self, name: &str) -> Result<&RawTensor, DatasetError> {
        self.tensors
            .get(name)
            .ok_or_else(|| DatasetError::MissingTensor(name.to_string()))
    }

    fn ints(&self, name: &str) -> Result<Vec<i64>, DatasetError> {
        let t = self.get(name)?;
        match t.dtype {
            Dtype::I64 => Ok(t
                .bytes
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect()),
            Dtype::I32 => Ok(t
                .bytes
                .chunks_exact(4)
                .map(|c| i64::from(i32::from_le_bytes([c[0], c[1], c[2], c[3]])))
                .collect()),
            other => Err(DatasetError::Dtype { name: name.to_string(), dtype: format!("{other:?}") }),
        }
    }
}

fn shape_error(name: &str, shape: &[usize], expected: &'static str) -> DatasetError {
    DatasetError::Shape { name: name.to_string(), shape: shape.to_vec(), expected }
}

fn to_indices(name: &str, values: Vec<i64>) -> Result<Vec<usize>, DatasetError> {
    values
        .into_iter()
        .map(|v| usize::try_from(v).map_err(|_| DatasetError::NegativeIndex { name: name.to_string(), value: v }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_bundle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.safetensors");

        let mut bundle = TensorBundle::new();
        bundle.insert_f32("g_feat", vec![2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        bundle.insert_edge_index("gg_edge_index", &EdgeIndex::from_pairs([(0, 1), (1, 0), (1, 1)]));
        bundle.insert_i64("train_et", vec![3], &[0, 4, 2]);
        bundle.insert_i64("g_num_nodes", vec![], &[2]);
        bundle.save(&path).unwrap();

        let loaded = TensorBundle::load(&path).unwrap();
        let (values, rows, cols) = loaded.matrix_f32("g_feat").unwrap();
        assert_eq!((rows, cols), (2, 3));
        assert_eq!(values[5], 6.0);

        let edges = loaded.edge_index("gg_edge_index").unwrap();
        assert_eq!(edges.src, vec![0, 1, 1]);
        assert_eq!(edges.dst, vec![1, 0, 1]);
        assert_eq!(loaded.vector_usize("train_et").unwrap(), vec![0, 4, 2]);
        assert_eq!(loaded.scalar_usize("g_num_nodes").unwrap(), 2);
        assert!(!loaded.contains("d_feat"));
    }

    #[test]
    fn test_pickled_checkpoint_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pose.pt");
        fs::write(&path, [0x50, 0x4b, 0x03, 0x04, 0, 0, 0, 0]).unwrap();

        let err = TensorBundle::load(&path).unwrap_err();
        assert!(matches!(err, DatasetError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_wrong_shape_and_negative_index() {
        let mut bundle = TensorBundle::new();
        bundle.insert_i64("flat", vec![4], &[0, 1, 2, 3]);
        bundle.insert_i64("neg", vec![2, 1], &[0, -3]);

        assert!(matches!(bundle.edge_index("flat"), Err(DatasetError::Shape { .. })));
        assert!(matches!(bundle.edge_index("neg"), Err(DatasetError::NegativeIndex { value: -3, .. })));
        assert!(matches!(bundle.matrix_f32("missing"), Err(DatasetError::MissingTensor(_))));
    }

    #[test]
    fn test_int_tensor_is_not_a_matrix() {
        let mut bundle = TensorBundle::new();
        bundle.insert_i64("idx", vec![1, 2], &[0, 1]);
        assert!(matches!(bundle.matrix_f32("idx"), Err(DatasetError::Dtype { .. })));
    }
}
