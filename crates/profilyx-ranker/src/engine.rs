//! Similarity engine over a candidate pool.
//!
//! Wraps an immutable snapshot of the stored vectors and exposes the three
//! ranking operations: unrestricted, target-masked ("primary") and
//! candidate-filtered ("secondary"). The two disease-restricted modes answer
//! different questions and are both returned by every query, so they are
//! distinct named operations rather than a flag.

use crate::similarity::{mask, rank};
use profilyx_common::records::MolecularVector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One ranked pool member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub chembl_id: String,
    pub score: f32,
}

/// Ranking engine over an immutable vector snapshot.
pub struct SimilarityEngine {
    pool: Vec<MolecularVector>,
}

impl SimilarityEngine {
    pub fn new(pool: Vec<MolecularVector>) -> Self {
        Self { pool }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Rank the whole pool against the reference, unrestricted.
    pub fn rank_all(
        &self,
        reference: &MolecularVector,
        top_k: usize,
        include_self: bool,
    ) -> Vec<RankedCandidate> {
        let ranked = rank(
            &reference.weights,
            &reference.chembl_id,
            self.pool.iter().map(|v| (v.chembl_id.as_str(), &v.weights)),
            top_k,
            include_self,
        );
        Self::collect(ranked)
    }

    /// Mode (a), "primary": mask the reference and every candidate down to
    /// the disease target set before scoring. Measures similarity restricted
    /// to disease-relevant biology. With an empty target set every score is
    /// 0.0 (masking removes all signal); candidates are still returned.
    pub fn rank_masked(
        &self,
        reference: &MolecularVector,
        disease_targets: &HashSet<String>,
        top_k: usize,
        include_self: bool,
    ) -> Vec<RankedCandidate> {
        let masked_reference = mask(&reference.weights, disease_targets);
        let masked_pool: Vec<(String, _)> = self
            .pool
            .iter()
            .map(|v| (v.chembl_id.clone(), mask(&v.weights, disease_targets)))
            .collect();

        let ranked = rank(
            &masked_reference,
            &reference.chembl_id,
            masked_pool.iter().map(|(id, c)| (id.as_str(), c)),
            top_k,
            include_self,
        );
        Self::collect(ranked)
    }

    /// Mode (b), "secondary": restrict the pool to molecules with at least
    /// one nonzero weight on a disease target, then score with the full
    /// unmasked vectors. An empty target set admits no candidate and yields
    /// an empty list, not an error.
    pub fn rank_filtered(
        &self,
        reference: &MolecularVector,
        disease_targets: &HashSet<String>,
        top_k: usize,
        include_self: bool,
    ) -> Vec<RankedCandidate> {
        let ranked = rank(
            &reference.weights,
            &reference.chembl_id,
            self.pool
                .iter()
                .filter(|v| v.touches(disease_targets))
                .map(|v| (v.chembl_id.as_str(), &v.weights)),
            top_k,
            include_self,
        );
        Self::collect(ranked)
    }

    fn collect(ranked: Vec<(String, f32)>) -> Vec<RankedCandidate> {
        ranked
            .into_iter()
            .map(|(chembl_id, score)| RankedCandidate { chembl_id, score })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn vector(id: &str, entries: &[(&str, f32)]) -> MolecularVector {
        let weights: BTreeMap<String, f32> =
            entries.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        let degenerate = weights.values().all(|w| *w == 0.0);
        MolecularVector {
            chembl_id: id.to_string(),
            weights,
            degenerate,
        }
    }

    fn targets(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|t| t.to_string()).collect()
    }

    fn engine() -> (SimilarityEngine, MolecularVector) {
        let reference = vector("REF", &[("T1", 0.8), ("T2", 0.6)]);
        let pool = vec![
            reference.clone(),
            vector("A", &[("T1", 1.0)]),
            vector("B", &[("T2", 1.0)]),
            vector("C", &[("T3", 1.0)]),
        ];
        (SimilarityEngine::new(pool), reference)
    }

    #[test]
    fn test_rank_all_orders_by_alignment() {
        let (engine, reference) = engine();
        let ranked = engine.rank_all(&reference, 10, false);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].chembl_id, "A");
        assert!((ranked[0].score - 0.8).abs() < 1e-6);
        assert_eq!(ranked[1].chembl_id, "B");
        assert_eq!(ranked[2].chembl_id, "C");
        assert_eq!(ranked[2].score, 0.0);
    }

    #[test]
    fn test_masked_mode_restricts_scoring_to_disease_targets() {
        let (engine, reference) = engine();
        // Restricted to T1: only A retains signal aligned with the reference.
        let ranked = engine.rank_masked(&reference, &targets(&["T1"]), 10, false);
        assert_eq!(ranked[0].chembl_id, "A");
        assert!((ranked[0].score - 1.0).abs() < 1e-6);
        // B and C lose all signal under the mask and score zero.
        assert_eq!(ranked[1].score, 0.0);
        assert_eq!(ranked[2].score, 0.0);
    }

    #[test]
    fn test_masked_mode_with_empty_target_set_scores_all_zero() {
        let (engine, reference) = engine();
        let ranked = engine.rank_masked(&reference, &HashSet::new(), 10, false);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|c| c.score == 0.0));
    }

    #[test]
    fn test_filtered_mode_scores_full_vectors() {
        let (engine, reference) = engine();
        // Only molecules touching T1 stay in the pool, but scores use the
        // full profiles: A's full-vector cosine against REF is 0.8, not 1.0.
        let ranked = engine.rank_filtered(&reference, &targets(&["T1"]), 10, false);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].chembl_id, "A");
        assert!((ranked[0].score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_filtered_mode_with_empty_target_set_is_empty() {
        let (engine, reference) = engine();
        let ranked = engine.rank_filtered(&reference, &HashSet::new(), 10, false);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_filtered_mode_ignores_zero_weight_on_disease_target() {
        let reference = vector("REF", &[("T1", 1.0)]);
        let pool = vec![
            reference.clone(),
            // Explicit zero on T1 is "no signal", not membership.
            vector("Z", &[("T1", 0.0), ("T2", 1.0)]),
        ];
        let engine = SimilarityEngine::new(pool);
        let ranked = engine.rank_filtered(&reference, &targets(&["T1"]), 10, false);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_degenerate_reference_scores_zero_everywhere() {
        let reference = vector("REF", &[("T1", 0.0)]);
        let pool = vec![vector("A", &[("T1", 1.0)])];
        let engine = SimilarityEngine::new(pool);
        let ranked = engine.rank_all(&reference, 10, false);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].score, 0.0);
    }
}
