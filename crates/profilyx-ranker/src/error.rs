//! Query-time error types.
//!
//! Resolution failures are typed so a caller can tell "refine your input"
//! (ambiguous, with the candidate list attached) apart from "not found" and
//! from genuine store failures.

use profilyx_common::records::{Disease, Substance};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("No disease matches '{0}'")]
    DiseaseNotFound(String),

    #[error("'{input}' matches more than one disease; pass an exact disease ID")]
    AmbiguousDisease {
        input: String,
        candidates: Vec<Disease>,
    },

    #[error("No molecule matches '{0}'")]
    MoleculeNotFound(String),

    #[error("'{input}' matches more than one molecule; pass an exact ChEMBL ID")]
    AmbiguousMolecule {
        input: String,
        candidates: Vec<Substance>,
    },

    #[error("No stored vector for molecule '{0}'; run a vector build first")]
    VectorMissing(String),

    #[error(transparent)]
    Store(#[from] profilyx_db::DbError),
}
