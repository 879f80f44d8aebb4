// ============================================================
// Layer 2 — PoSE Supergraph Wiring
// ============================================================
//
//   gene  (g_feat, gg_edge_index)             5 → [4, 4]
//     │  gd_edge_index
//     ▼
//   drug  (d_feat, train_idx, train_et)       {gene: 7} cat → [6, 6]
//
// The drug supervertex is the task supervertex; its edge types
// are the side effects the decoder scores.

use crate::domain::dataset::PoseDataset;
use crate::domain::error::SupergraphError;
use crate::domain::setting::{AggregationMode, SuperVertexParaSetting};
use crate::domain::supergraph::{SuperEdge, SuperGraph, SuperVertex};

pub const GENE: &str = "gene";
pub const DRUG: &str = "drug";

pub fn pose_settings() -> Vec<SuperVertexParaSetting> {
    vec![
        SuperVertexParaSetting::new(GENE, 5, vec![4, 4]),
        SuperVertexParaSetting::new(DRUG, 7, vec![6, 6])
            .with_exter_agg_channels([(GENE, 7)])
            .with_mode(AggregationMode::Cat),
    ]
}

pub fn build_pose_supergraph(dataset: &PoseDataset) -> Result<SuperGraph, SupergraphError> {
    let gene = SuperVertex::new(GENE, dataset.gene_feat.clone(), dataset.gene_edges.clone(), None)?;
    let drug = SuperVertex::new(
        DRUG,
        dataset.drug_feat.clone(),
        dataset.train.edge_index.clone(),
        Some(dataset.train.edge_type.clone()),
    )?;
    let gene_drug = SuperEdge::new(GENE, DRUG, dataset.gene_drug_edges.clone());

    let mut supergraph = SuperGraph::new(vec![gene, drug], vec![gene_drug])?;
    supergraph.set_supergraph_para_setting(pose_settings())?;
    Ok(supergraph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{generate, SyntheticSpec};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_pose_wiring() {
        let dataset = generate(&SyntheticSpec::default(), &mut StdRng::seed_from_u64(0)).unwrap();
        let sg = build_pose_supergraph(&dataset).unwrap();

        assert_eq!(sg.topological_order(), vec![GENE, DRUG]);
        assert_eq!(sg.task_supervertex().name(), DRUG);
        assert_eq!(sg.task_supervertex().num_edge_type(), dataset.num_side_effects());
        assert!(sg.missing_settings().is_empty());
    }

    #[test]
    fn test_settings_are_consistent() {
        for setting in pose_settings() {
            assert!(setting.validate().is_ok());
        }
        assert_eq!(pose_settings()[1].out_channels(), 19);
    }
}
