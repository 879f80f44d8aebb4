// ============================================================
// Layer 5 — Link-Prediction Metrics
// ============================================================
// Scores of held-out positive edges against sampled negatives:
//
//   AUROC   probability that a random positive outranks a random
//           negative, ties counted as one half
//   AUPRC   average precision, Σ (R_k - R_{k-1}) · P_k over
//           distinct score thresholds
//   AP@50   average precision of the 50 best-scored pairs
//
// Plain host-side slices; nothing here touches Burn.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

pub const AP_AT_K: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkMetrics {
    pub auroc: f64,
    pub auprc: f64,
    pub ap50:  f64,
}

impl LinkMetrics {
    /// `None` when either side is empty.
    pub fn compute(pos: &[f32], neg: &[f32]) -> Option<Self> {
        Some(Self {
            auroc: auroc(pos, neg)?,
            auprc: average_precision(pos, neg)?,
            ap50:  ap_at_k(pos, neg, AP_AT_K)?,
        })
    }
}

/// `(score, is_positive)` sorted by descending score.
fn ranked(pos: &[f32], neg: &[f32]) -> Vec<(f32, bool)> {
    let mut all: Vec<(f32, bool)> = pos
        .iter()
        .map(|&s| (s, true))
        .chain(neg.iter().map(|&s| (s, false)))
        .collect();
    all.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    all
}

pub fn auroc(pos: &[f32], neg: &[f32]) -> Option<f64> {
    if pos.is_empty() || neg.is_empty() {
        return None;
    }
    let mut all: Vec<(f32, bool)> = ranked(pos, neg);
    all.reverse();

    // Mann–Whitney U with average ranks for ties (ranks start at 1).
    let mut rank_sum = 0.0f64;
    let mut i = 0;
    while i < all.len() {
        let j = i + all[i..].iter().take_while(|(s, _)| *s == all[i].0).count();
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        rank_sum += avg_rank * all[i..j].iter().filter(|(_, p)| *p).count() as f64;
        i = j;
    }

    let (p, n) = (pos.len() as f64, neg.len() as f64);
    Some((rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

pub fn average_precision(pos: &[f32], neg: &[f32]) -> Option<f64> {
    if pos.is_empty() || neg.is_empty() {
        return None;
    }
    let all = ranked(pos, neg);
    let total = pos.len() as f64;

    let (mut tp, mut seen, mut prev_recall, mut ap) = (0.0, 0.0, 0.0, 0.0);
    let mut i = 0;
    while i < all.len() {
        let j = i + all[i..].iter().take_while(|(s, _)| *s == all[i].0).count();
        tp += all[i..j].iter().filter(|(_, p)| *p).count() as f64;
        seen += (j - i) as f64;
        let recall = tp / total;
        ap += (recall - prev_recall) * (tp / seen);
        prev_recall = recall;
        i = j;
    }
    Some(ap)
}

/// Precision averaged over the positions of positives among the top `k`,
/// normalised by `min(#positives, k)`.
pub fn ap_at_k(pos: &[f32], neg: &[f32], k: usize) -> Option<f64> {
    if pos.is_empty() || k == 0 {
        return None;
    }
    let (mut hits, mut score) = (0.0, 0.0);
    for (i, (_, is_pos)) in ranked(pos, neg).into_iter().take(k).enumerate() {
        if is_pos {
            hits += 1.0;
            score += hits / (i + 1) as f64;
        }
    }
    Some(score / pos.len().min(k) as f64)
}
