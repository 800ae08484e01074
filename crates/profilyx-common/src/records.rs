/// Core records exchanged between the ingestion boundary, the vector store,
/// and the ranking engine. Identifiers are the external registry IDs
/// (ChEMBL for molecules and targets, EFO/DOID/MONDO for diseases).
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Mechanism-of-action record
// ---------------------------------------------------------------------------

/// One documented mechanism-of-action relationship between a molecule and a
/// target. A molecule may carry several actions against the same target
/// (different action types); the builder averages them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub chembl_id: String,
    pub target_id: String,
    pub action_type: String,
}

impl Action {
    pub fn new(
        chembl_id: impl Into<String>,
        target_id: impl Into<String>,
        action_type: impl Into<String>,
    ) -> Self {
        Self {
            chembl_id: chembl_id.into(),
            target_id: target_id.into(),
            action_type: action_type.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Substance / Disease metadata
// ---------------------------------------------------------------------------

/// Display and resolution metadata for a molecule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Substance {
    pub chembl_id: String,
    pub name: Option<String>,
    pub trade_names: Vec<String>,
    pub synonyms: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disease {
    pub disease_id: String,
    pub name: String,
    pub description: Option<String>,
}

/// One disease→target association row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseTarget {
    pub disease_id: String,
    pub target_id: String,
}

// ---------------------------------------------------------------------------
// Molecular vector
// ---------------------------------------------------------------------------

/// A molecule's action profile: sparse mapping target → weight. Absent
/// targets are implicitly 0.0.
///
/// Invariant: the components have L2 norm 1.0 (within f32 tolerance) unless
/// `degenerate` is set, in which case every stored component is exactly 0.0.
/// A degenerate vector is a valid state (all source weights were zero), not
/// an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MolecularVector {
    pub chembl_id: String,
    pub weights: BTreeMap<String, f32>,
    #[serde(default)]
    pub degenerate: bool,
}

impl MolecularVector {
    /// Euclidean norm over this vector's own components.
    pub fn norm(&self) -> f32 {
        self.weights
            .values()
            .map(|v| v * v)
            .sum::<f32>()
            .sqrt()
    }

    /// True when the vector carries signal on at least one of the given targets.
    pub fn touches<'a, I>(&self, targets: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        targets
            .into_iter()
            .any(|t| self.weights.get(t).is_some_and(|w| *w != 0.0))
    }
}

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// One ranked candidate from a similarity query. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityHit {
    pub chembl_id: String,
    pub score: f32,
    pub name: Option<String>,
}

/// Display metadata for the resolved reference molecule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDrug {
    pub chembl_id: String,
    pub name: Option<String>,
    pub trade_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_of_unit_vector() {
        let v = MolecularVector {
            chembl_id: "CHEMBL1".to_string(),
            weights: BTreeMap::from([("T1".to_string(), 0.8), ("T2".to_string(), 0.6)]),
            degenerate: false,
        };
        assert!((v.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_touches_ignores_zero_components() {
        let v = MolecularVector {
            chembl_id: "CHEMBL1".to_string(),
            weights: BTreeMap::from([("T1".to_string(), 0.0), ("T2".to_string(), 0.5)]),
            degenerate: false,
        };
        let t1 = vec!["T1".to_string()];
        let t2 = vec!["T2".to_string()];
        assert!(!v.touches(&t1));
        assert!(v.touches(&t2));
    }
}
