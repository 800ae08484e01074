//! profilyx Database Layer
//!
//! This crate provides an embedded database layer using LanceDB for
//! zero-dependency storage of the input relations (substances, diseases,
//! disease-target links, mechanism-of-action records, action-type weights)
//! and the derived molecular vectors.
//!
//! Vector persistence is generational: each batch build writes a fresh
//! `molecular_vectors_g{N}` table (and optionally a dense `vector_array_g{N}`
//! table), then flips a single pointer row. Readers always consult the
//! pointer, so queries never observe a partially written generation.
//!
//! # Example
//!
//! ```rust,no_run
//! use profilyx_db::{Database, VectorRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("./data/profilyx.db").await?;
//!     db.initialize().await?;
//!
//!     let vectors = VectorRepository::new(std::sync::Arc::new(db));
//!     let stored = vectors.get("CHEMBL25").await?;
//!     println!("{:?}", stored);
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod database;
pub mod diseases;
pub mod error;
pub mod schema;
pub mod schema_arrow;
pub mod substances;
pub mod vectors;
pub mod weights;

pub use actions::ActionRepository;
pub use database::{Database, DatabaseStats};
pub use diseases::{DiseaseRepository, DiseaseTargetRepository};
pub use error::{DbError, Result};
pub use schema::{
    NeighborRank, VectorState, TABLE_ACTIONS, TABLE_ACTION_TYPE_WEIGHTS, TABLE_DISEASES,
    TABLE_DISEASE_TARGETS, TABLE_SIMILARITY_RANKS, TABLE_SUBSTANCES, TABLE_VECTOR_META,
};
pub use substances::SubstanceRepository;
pub use vectors::VectorRepository;
pub use weights::ActionTypeWeightRepository;
