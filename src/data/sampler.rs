// ============================================================
// Layer 4 — Typed Negative Sampling
// ============================================================
// For every positive drug-drug edge of side effect r, draw one
// random drug pair and label it with the same r. The negatives
// are resampled every epoch, so a rare collision with a true
// edge is tolerated.

use anyhow::{ensure, Result};
use rand::Rng;

use crate::data::synthetic::distinct_from;
use crate::domain::dataset::LabeledEdges;
use crate::domain::graph::EdgeIndex;

pub fn negative_sampling(positive: &LabeledEdges, num_nodes: usize, rng: &mut impl Rng) -> Result<LabeledEdges> {
    ensure!(num_nodes >= 2, "negative sampling needs at least two nodes, got {num_nodes}");

    let edge_index = EdgeIndex::from_pairs(positive.edge_type.iter().map(|_| {
        let i = rng.gen_range(0..num_nodes);
        (i, distinct_from(&mut *rng, i, num_nodes))
    }));
    Ok(LabeledEdges::new("negatives", edge_index, positive.edge_type.clone())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_negatives_keep_types() {
        let pos = LabeledEdges::new("pos", EdgeIndex::from_pairs([(0, 1), (1, 2), (2, 3)]), vec![3, 0, 3]).unwrap();
        let neg = negative_sampling(&pos, 5, &mut StdRng::seed_from_u64(0)).unwrap();

        assert_eq!(neg.edge_type, vec![3, 0, 3]);
        assert_eq!(neg.num_edges(), 3);
        assert!(neg.edge_index.iter().all(|(s, d)| s != d && s < 5 && d < 5));
    }

    #[test]
    fn test_single_node_rejected() {
        let pos = LabeledEdges::new("pos", EdgeIndex::from_pairs([(0, 0)]), vec![0]).unwrap();
        assert!(negative_sampling(&pos, 1, &mut StdRng::seed_from_u64(0)).is_err());
    }
}
