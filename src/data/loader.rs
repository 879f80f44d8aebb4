// ============================================================
// Layer 4 — PoSE Loader
// ============================================================
// Maps the tensors of a bundle onto the PoSE graph:
//
//   g_feat          [genes, F]   optional, identity when absent
//   g_num_nodes     scalar       optional gene count
//   gg_edge_index   [2, E]       gene-gene edges
//   d_feat          [drugs, F]   optional, identity when absent
//   d_num_nodes     scalar       optional drug count
//   train_idx       [2, E]       drug-drug training edges
//   train_et        [E]          their side-effect types
//   test_idx        [2, E]       optional test edges
//   test_et         [E]          optional test types
//   gd_edge_index   [2, E]       gene→drug edges
//
// Without features or an explicit count, the node count is one
// more than the largest index that refers to that node type.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::application::config::DatasetConfig;
use crate::data::bundle::TensorBundle;
use crate::data::error::DatasetError;
use crate::domain::dataset::{LabeledEdges, PoseDataset};
use crate::domain::graph::NodeFeatures;
use crate::domain::traits::GraphSource;
use crate::infra::download::download_file_by_url;

/// Download the dataset into `ROOT` if needed and load it.
pub fn load_data(cfg: &DatasetConfig) -> Result<PoseDataset> {
    let path = download_file_by_url(&cfg.url, Path::new(&cfg.root), &cfg.file_name())?;
    load_bundle_file(&path)
}

pub fn load_bundle_file(path: &Path) -> Result<PoseDataset> {
    let bundle = TensorBundle::load(path)
        .with_context(|| format!("Cannot load dataset '{}'", path.display()))?;
    let dataset = PoseDataset::from_bundle(&bundle)
        .with_context(|| format!("'{}' is not a PoSE bundle", path.display()))?;
    tracing::info!(
        "Loaded PoSE graph: {} genes, {} drugs, {} train edges, {} side effects",
        dataset.num_genes(),
        dataset.num_drugs(),
        dataset.train.num_edges(),
        dataset.num_side_effects()
    );
    Ok(dataset)
}

impl PoseDataset {
    pub fn from_bundle(bundle: &TensorBundle) -> Result<Self, DatasetError> {
        let gene_edges = bundle.edge_index("gg_edge_index")?;
        let gene_drug_edges = bundle.edge_index("gd_edge_index")?;
        let train = LabeledEdges::new("train_idx", bundle.edge_index("train_idx")?, bundle.vector_usize("train_et")?)?;
        let test = if bundle.contains("test_idx") {
            Some(LabeledEdges::new("test_idx", bundle.edge_index("test_idx")?, bundle.vector_usize("test_et")?)?)
        } else {
            None
        };

        let gene_max = [gene_edges.max_src(), gene_edges.max_dst(), gene_drug_edges.max_src()];
        let mut drug_max = vec![
            gene_drug_edges.max_dst(),
            train.edge_index.max_src(),
            train.edge_index.max_dst(),
        ];
        if let Some(t) = &test {
            drug_max.extend([t.edge_index.max_src(), t.edge_index.max_dst()]);
        }

        let gene_feat = node_features(bundle, "g_feat", "g_num_nodes", &gene_max)?;
        let drug_feat = node_features(bundle, "d_feat", "d_num_nodes", &drug_max)?;

        let dataset = Self { gene_feat, gene_edges, drug_feat, train, test, gene_drug_edges };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Inverse of `from_bundle`; node counts are always written.
    pub fn to_bundle(&self) -> TensorBundle {
        let mut bundle = TensorBundle::new();
        for (feat_name, count_name, feat) in [
            ("g_feat", "g_num_nodes", &self.gene_feat),
            ("d_feat", "d_num_nodes", &self.drug_feat),
        ] {
            if let NodeFeatures::Dense { values, rows, cols } = feat {
                bundle.insert_f32(feat_name, vec![*rows, *cols], values);
            }
            bundle.insert_i64(count_name, vec![1], &[feat.num_nodes() as i64]);
        }
        bundle.insert_edge_index("gg_edge_index", &self.gene_edges);
        bundle.insert_edge_index("gd_edge_index", &self.gene_drug_edges);
        bundle.insert_edge_index("train_idx", &self.train.edge_index);
        bundle.insert_i64("train_et", vec![self.train.num_edges()], &to_i64(&self.train.edge_type));
        if let Some(test) = &self.test {
            bundle.insert_edge_index("test_idx", &test.edge_index);
            bundle.insert_i64("test_et", vec![test.num_edges()], &to_i64(&test.edge_type));
        }
        bundle
    }
}

fn node_features(
    bundle:     &TensorBundle,
    feat_name:  &str,
    count_name: &str,
    max_index:  &[Option<usize>],
) -> Result<NodeFeatures, DatasetError> {
    if bundle.contains(feat_name) {
        let (values, rows, cols) = bundle.matrix_f32(feat_name)?;
        return Ok(NodeFeatures::dense(values, rows, cols)?);
    }
    let count = if bundle.contains(count_name) {
        bundle.scalar_usize(count_name)?
    } else {
        max_index.iter().flatten().max().map_or(0, |m| m + 1)
    };
    Ok(NodeFeatures::Identity(count))
}

fn to_i64(values: &[usize]) -> Vec<i64> {
    values.iter().map(|&v| v as i64).collect()
}

// ─── BundleSource ─────────────────────────────────────────────────────────────
/// Dataset from the configured URL, cached under `ROOT`.
pub struct BundleSource {
    cfg: DatasetConfig,
}

impl BundleSource {
    pub fn new(cfg: DatasetConfig) -> Self {
        Self { cfg }
    }

    pub fn path(&self) -> PathBuf {
        self.cfg.data_path()
    }
}

impl GraphSource for BundleSource {
    fn load(&self) -> Result<PoseDataset> {
        load_data(&self.cfg)
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.path().display(), self.cfg.url)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::SupergraphError;
    use crate::domain::graph::EdgeIndex;
    use tempfile::tempdir;

    fn bundle() -> TensorBundle {
        let mut b = TensorBundle::new();
        b.insert_edge_index("gg_edge_index", &EdgeIndex::from_pairs([(0, 1), (1, 3)]));
        b.insert_edge_index("gd_edge_index", &EdgeIndex::from_pairs([(2, 0), (3, 2)]));
        b.insert_edge_index("train_idx", &EdgeIndex::from_pairs([(0, 1), (1, 2)]));
        b.insert_i64("train_et", vec![2], &[0, 1]);
        b
    }

    #[test]
    fn test_identity_counts_inferred_from_indices() {
        let ds = PoseDataset::from_bundle(&bundle()).unwrap();
        assert_eq!(ds.gene_feat, NodeFeatures::Identity(4));
        assert_eq!(ds.drug_feat, NodeFeatures::Identity(3));
        assert!(ds.test.is_none());
        assert_eq!(ds.num_side_effects(), 2);
    }

    #[test]
    fn test_explicit_features_and_counts() {
        let mut b = bundle();
        b.insert_f32("d_feat", vec![3, 2], &[0.0; 6]);
        b.insert_i64("g_num_nodes", vec![1], &[10]);
        let ds = PoseDataset::from_bundle(&b).unwrap();
        assert_eq!(ds.num_genes(), 10);
        assert_eq!(ds.drug_feat.num_features(), 2);
    }

    #[test]
    fn test_feature_rows_must_cover_indices() {
        let mut b = bundle();
        b.insert_f32("d_feat", vec![2, 2], &[0.0; 4]);
        assert!(matches!(PoseDataset::from_bundle(&b), Err(DatasetError::Graph(_))));
    }

    #[test]
    fn test_test_type_beyond_training_types_rejected() {
        let mut b = bundle();
        b.insert_edge_index("train_idx", &EdgeIndex::from_pairs([(0, 1), (1, 2), (2, 0)]));
        b.insert_i64("train_et", vec![3], &[0, 1, 1]);
        b.insert_edge_index("test_idx", &EdgeIndex::from_pairs([(0, 2), (1, 0)]));
        b.insert_i64("test_et", vec![2], &[0, 2]);

        let err = PoseDataset::from_bundle(&b).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Graph(SupergraphError::EdgeTypeOutOfRange { edge_type: 2, num_edge_type: 2, .. })
        ));
    }

    #[test]
    fn test_missing_tensor_reported() {
        let mut b = TensorBundle::new();
        b.insert_edge_index("gg_edge_index", &EdgeIndex::from_pairs([(0, 1)]));
        let err = PoseDataset::from_bundle(&b).unwrap_err();
        assert!(matches!(err, DatasetError::MissingTensor(name) if name == "gd_edge_index"));
    }

    #[test]
    fn test_bundle_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pose.safetensors");
        let mut b = bundle();
        b.insert_edge_index("test_idx", &EdgeIndex::from_pairs([(2, 0)]));
        b.insert_i64("test_et", vec![1], &[1]);
        let ds = PoseDataset::from_bundle(&b).unwrap();
        ds.to_bundle().save(&path).unwrap();

        let loaded = load_bundle_file(&path).unwrap();
        assert_eq!(loaded.num_drugs(), ds.num_drugs());
        assert_eq!(loaded.train, ds.train);
        assert_eq!(loaded.test, ds.test);
    }

    #[test]
    fn test_cached_file_is_used_by_load_data() {
        let dir = tempdir().unwrap();
        let cfg = DatasetConfig {
            root: dir.path().to_string_lossy().into_owned(),
            name: "pose".into(),
            url:  "http://invalid.invalid/pose.safetensors".into(),
        };
        PoseDataset::from_bundle(&bundle()).unwrap().to_bundle().save(&cfg.data_path()).unwrap();

        let ds = BundleSource::new(cfg).load().unwrap();
        assert_eq!(ds.num_genes(), 4);
    }
}
