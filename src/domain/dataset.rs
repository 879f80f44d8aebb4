// ============================================================
// Layer 3 — PoSE Dataset
// ============================================================
// The polypharmacy side-effect graph in plain host memory:
//
//   gene ──gg──▶ gene            protein-protein interactions
//   gene ──gd──▶ drug            drug targets
//   drug ──dd[type]──▶ drug      side effects, one type each
//
// Drug-drug edges come in a training split (used both as the
// drug supervertex's internal edges and as positive labels) and
// an optional test split used for evaluation.

use crate::domain::error::SupergraphError;
use crate::domain::graph::{EdgeIndex, NodeFeatures};

/// Typed edges: `edge_type[i]` is the relation of edge `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledEdges {
    pub edge_index: EdgeIndex,
    pub edge_type:  Vec<usize>,
}

impl LabeledEdges {
    pub fn new(
        name:       &str,
        edge_index: EdgeIndex,
        edge_type:  Vec<usize>,
    ) -> Result<Self, SupergraphError> {
        if edge_index.num_edges() != edge_type.len() {
            return Err(SupergraphError::EdgeTypeLengthMismatch {
                name:  name.to_string(),
                edges: edge_index.num_edges(),
                types: edge_type.len(),
            });
        }
        Ok(Self { edge_index, edge_type })
    }

    pub fn num_edges(&self) -> usize {
        self.edge_index.num_edges()
    }

    pub fn num_types(&self) -> usize {
        self.edge_type.iter().copied().max().map_or(0, |t| t + 1)
    }
}

#[derive(Debug, Clone)]
pub struct PoseDataset {
    pub gene_feat:       NodeFeatures,
    pub gene_edges:      EdgeIndex,
    pub drug_feat:       NodeFeatures,
    pub train:           LabeledEdges,
    pub test:            Option<LabeledEdges>,
    pub gene_drug_edges: EdgeIndex,
}

impl PoseDataset {
    pub fn num_genes(&self) -> usize {
        self.gene_feat.num_nodes()
    }

    pub fn num_drugs(&self) -> usize {
        self.drug_feat.num_nodes()
    }

    /// Side-effect types of the training split. Test types lie within it.
    pub fn num_side_effects(&self) -> usize {
        self.train.num_types()
    }

    /// Every node index must address an existing gene or drug.
    pub fn validate(&self) -> Result<(), SupergraphError> {
        let (genes, drugs) = (self.num_genes(), self.num_drugs());

        check_bounds("gg_edge_index", &self.gene_edges.src, genes)?;
        check_bounds("gg_edge_index", &self.gene_edges.dst, genes)?;
        check_bounds("gd_edge_index", &self.gene_drug_edges.src, genes)?;
        check_bounds("gd_edge_index", &self.gene_drug_edges.dst, drugs)?;
        check_bounds("train_idx", &self.train.edge_index.src, drugs)?;
        check_bounds("train_idx", &self.train.edge_index.dst, drugs)?;
        if let Some(test) = &self.test {
            check_bounds("test_idx", &test.edge_index.src, drugs)?;
            check_bounds("test_idx", &test.edge_index.dst, drugs)?;

            // The decoder only has a relation for types seen in training.
            let num_edge_type = self.num_side_effects();
            if let Some(&edge_type) = test.edge_type.iter().find(|&&t| t >= num_edge_type) {
                return Err(SupergraphError::EdgeTypeOutOfRange {
                    name: "test_et".to_string(),
                    edge_type,
                    num_edge_type,
                });
            }
        }

        for (name, edges) in [
            ("gg_edge_index", &self.gene_edges),
            ("gd_edge_index", &self.gene_drug_edges),
            ("train_idx", &self.train.edge_index),
        ] {
            if edges.is_empty() {
                return Err(SupergraphError::EmptyEdges(name.to_string()));
            }
        }
        Ok(())
    }
}

fn check_bounds(name: &str, indices: &[usize], num_node: usize) -> Result<(), SupergraphError> {
    match indices.iter().copied().find(|&i| i >= num_node) {
        Some(index) => Err(SupergraphError::NodeIndexOutOfRange {
            name: name.to_string(),
            index,
            num_node,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> PoseDataset {
        PoseDataset {
            gene_feat:       NodeFeatures::Identity(3),
            gene_edges:      EdgeIndex::from_pairs([(0, 1), (1, 2)]),
            drug_feat:       NodeFeatures::Identity(2),
            train:           LabeledEdges::new("train", EdgeIndex::from_pairs([(0, 1), (1, 0)]), vec![0, 2])
                .unwrap(),
            test:            None,
            gene_drug_edges: EdgeIndex::from_pairs([(2, 1)]),
        }
    }

    #[test]
    fn test_valid_dataset() {
        let ds = tiny();
        assert!(ds.validate().is_ok());
        assert_eq!(ds.num_side_effects(), 3);
    }

    #[test]
    fn test_out_of_range_drug_rejected() {
        let mut ds = tiny();
        ds.gene_drug_edges = EdgeIndex::from_pairs([(0, 5)]);
        let err = ds.validate().unwrap_err();
        assert!(matches!(err, SupergraphError::NodeIndexOutOfRange { index: 5, num_node: 2, .. }));
    }

    #[test]
    fn test_test_types_within_training_types() {
        let mut ds = tiny();
        ds.test = Some(LabeledEdges::new("test", EdgeIndex::from_pairs([(0, 1)]), vec![2]).unwrap());
        assert!(ds.validate().is_ok());

        ds.test = Some(LabeledEdges::new("test", EdgeIndex::from_pairs([(0, 1)]), vec![4]).unwrap());
        assert_eq!(ds.num_side_effects(), 3);
        assert_eq!(
            ds.validate().unwrap_err(),
            SupergraphError::EdgeTypeOutOfRange { name: "test_et".into(), edge_type: 4, num_edge_type: 3 }
        );
    }

    #[test]
    fn test_labeled_edges_length_mismatch() {
        let err = LabeledEdges::new("train", EdgeIndex::from_pairs([(0, 1)]), vec![0, 1]).unwrap_err();
        assert!(matches!(err, SupergraphError::EdgeTypeLengthMismatch { edges: 1, types: 2, .. }));
    }
}
