//! The externally callable similarity query.
//!
//! Resolves a disease identifier and a molecule identifier to canonical IDs,
//! then runs both disease-restricted rankings (target-masked and
//! candidate-filtered) over the published vector generation.

use crate::engine::{RankedCandidate, SimilarityEngine};
use crate::error::QueryError;
use profilyx_common::records::{Disease, MolecularVector, ReferenceDrug, SimilarityHit, Substance};
use profilyx_db::{
    Database, DiseaseRepository, DiseaseTargetRepository, SubstanceRepository, VectorRepository,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Disease registry ID shapes (EFO/DOID/MONDO accessions or a bare numeric
/// code). Inputs matching this resolve by exact ID, everything else by
/// free-text search.
fn disease_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:EFO_|DOID:|MONDO_)\S+$|^[0-9]+$").expect("static pattern compiles")
    })
}

/// Result of one similarity query. `similar_primary` is the target-masked
/// ranking, `similar_secondary` the candidate-filtered one; both are always
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugSimilarityResult {
    pub disease_id: String,
    pub reference_drug: ReferenceDrug,
    pub similar_primary: Vec<SimilarityHit>,
    pub similar_secondary: Vec<SimilarityHit>,
}

/// Query façade over the store repositories.
#[derive(Clone)]
pub struct QueryService {
    substances: SubstanceRepository,
    diseases: DiseaseRepository,
    disease_targets: DiseaseTargetRepository,
    vectors: VectorRepository,
}

impl QueryService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            substances: SubstanceRepository::new(db.clone()),
            diseases: DiseaseRepository::new(db.clone()),
            disease_targets: DiseaseTargetRepository::new(db.clone()),
            vectors: VectorRepository::new(db),
        }
    }

    /// Resolve a disease identifier or free-text fragment to exactly one
    /// disease. Ambiguity returns the candidate list; nothing is guessed.
    pub async fn resolve_disease(&self, input: &str) -> Result<Disease, QueryError> {
        let input = input.trim();

        if disease_id_pattern().is_match(input) {
            return self
                .diseases
                .find_by_id(input)
                .await?
                .ok_or_else(|| QueryError::DiseaseNotFound(input.to_string()));
        }

        let mut candidates = self.diseases.search(input).await?;
        match candidates.len() {
            0 => Err(QueryError::DiseaseNotFound(input.to_string())),
            1 => Ok(candidates.remove(0)),
            _ => Err(QueryError::AmbiguousDisease {
                input: input.to_string(),
                candidates,
            }),
        }
    }

    /// Resolve a ChEMBL ID, name fragment, or trade-name fragment to exactly
    /// one substance.
    pub async fn resolve_molecule(&self, input: &str) -> Result<Substance, QueryError> {
        let input = input.trim();

        let mut candidates = self.substances.search(input).await?;
        match candidates.len() {
            0 => Err(QueryError::MoleculeNotFound(input.to_string())),
            1 => Ok(candidates.remove(0)),
            _ => Err(QueryError::AmbiguousMolecule {
                input: input.to_string(),
                candidates,
            }),
        }
    }

    /// Run the dual-mode similarity query.
    pub async fn query(
        &self,
        disease_input: &str,
        molecule_input: &str,
        top_k: usize,
    ) -> Result<DrugSimilarityResult, QueryError> {
        let disease = self.resolve_disease(disease_input).await?;
        let substance = self.resolve_molecule(molecule_input).await?;
        debug!(
            disease_id = %disease.disease_id,
            chembl_id = %substance.chembl_id,
            "Resolved query inputs"
        );

        let reference = self
            .vectors
            .get(&substance.chembl_id)
            .await?
            .ok_or_else(|| QueryError::VectorMissing(substance.chembl_id.clone()))?;

        let targets = self
            .disease_targets
            .targets_for(&disease.disease_id)
            .await?;

        let pool = self.vectors.load_all().await?;
        let engine = SimilarityEngine::new(pool);
        info!(
            disease_id = %disease.disease_id,
            reference = %reference.chembl_id,
            pool = engine.pool_size(),
            disease_targets = targets.len(),
            top_k,
            "Running similarity query"
        );

        let primary = engine.rank_masked(&reference, &targets, top_k, false);
        let secondary = engine.rank_filtered(&reference, &targets, top_k, false);

        let similar_primary = self.decorate(primary).await?;
        let similar_secondary = self.decorate(secondary).await?;

        Ok(DrugSimilarityResult {
            disease_id: disease.disease_id,
            reference_drug: ReferenceDrug {
                chembl_id: substance.chembl_id,
                name: substance.name,
                trade_names: substance.trade_names,
            },
            similar_primary,
            similar_secondary,
        })
    }

    /// Load the reference vector for a resolved molecule (exposed for
    /// callers that rank against custom pools).
    pub async fn reference_vector(
        &self,
        chembl_id: &str,
    ) -> Result<MolecularVector, QueryError> {
        self.vectors
            .get(chembl_id)
            .await?
            .ok_or_else(|| QueryError::VectorMissing(chembl_id.to_string()))
    }

    /// Attach display names to ranked candidates.
    async fn decorate(
        &self,
        ranked: Vec<RankedCandidate>,
    ) -> Result<Vec<SimilarityHit>, QueryError> {
        let mut hits = Vec::with_capacity(ranked.len());
        for candidate in ranked {
            let name = self
                .substances
                .find_by_id(&candidate.chembl_id)
                .await?
                .and_then(|s| s.name);
            hits.push(SimilarityHit {
                chembl_id: candidate.chembl_id,
                score: candidate.score,
                name,
            });
        }
        Ok(hits)
    }
}
