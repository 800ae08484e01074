//! Table names and row types for the LanceDB tables.
//!
//! The input relations reuse the typed records from `profilyx-common`; this
//! module adds the rows that exist only at the storage layer (the generation
//! pointer and the persisted neighbor ranks).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Table Names
// =============================================================================

pub const TABLE_SUBSTANCES: &str = "substances";
pub const TABLE_DISEASES: &str = "diseases";
pub const TABLE_DISEASE_TARGETS: &str = "disease_targets";
pub const TABLE_ACTIONS: &str = "actions";
pub const TABLE_ACTION_TYPE_WEIGHTS: &str = "action_type_weights";
pub const TABLE_VECTOR_META: &str = "vector_meta";
pub const TABLE_SIMILARITY_RANKS: &str = "similarity_ranks";

/// Key of the single pointer row in `vector_meta`.
pub const META_KEY_VECTOR_STATE: &str = "vector_state";

/// Name of the sparse vector table for a build generation.
pub fn sparse_table_name(generation: u64) -> String {
    format!("molecular_vectors_g{generation}")
}

/// Name of the dense (one column per target) table for a build generation.
pub fn dense_table_name(generation: u64) -> String {
    format!("vector_array_g{generation}")
}

// =============================================================================
// Generation pointer / schema descriptor
// =============================================================================

/// The published vector-store state: which generation is live, which physical
/// tables back it, and the target universe the dense layout was built
/// against. Stored as one JSON row in `vector_meta` and replaced atomically
/// on commit, so a crash mid-build leaves the previous generation live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorState {
    pub generation: u64,
    pub sparse_table: String,
    pub dense_table: Option<String>,
    /// Target IDs (sorted) the generation was built against. The dense
    /// layout's column set; any read against a different universe must fail
    /// rather than return misaligned columns.
    pub targets: Vec<String>,
    pub built_at: DateTime<Utc>,
}

// =============================================================================
// Persisted neighbor ranks
// =============================================================================

/// One precomputed neighbor entry from the all-pairs ranking job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborRank {
    pub chembl_id: String,
    pub neighbor_id: String,
    pub rank: i64,
    pub score: f32,
}
