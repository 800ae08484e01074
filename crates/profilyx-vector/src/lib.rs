//! profilyx-vector — Action-profile vectorization engine.
//!
//! Turns the raw mechanism-of-action relation into one L2-normalized sparse
//! vector per molecule and loads the result into the vector store as a fresh
//! generation.

pub mod build;
pub mod builder;
pub mod weights;

pub use build::{run_vector_build, BuildReport};
pub use builder::{build_vectors, BuildSummary};
pub use weights::ActionTypeWeights;
