//! profilyx-common — Shared types, errors, and configuration used across all profilyx crates.

pub mod config;
pub mod error;
pub mod records;

pub use config::{BuildConfig, Config, QueryConfig, StoreConfig};
pub use error::{ProfilyxError, Result};
pub use records::{
    Action, Disease, DiseaseTarget, MolecularVector, ReferenceDrug, SimilarityHit, Substance,
};
