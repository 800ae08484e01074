//! The vector build job.
//!
//! Reads the action relation and the weight table, derives the vectors, and
//! publishes them as a fresh store generation. Re-running replaces the store
//! contents; the previous generation stays live until the new one commits.

use crate::builder::{build_vectors, BuildSummary};
use crate::weights::ActionTypeWeights;
use anyhow::{Context, Result};
use profilyx_common::config::BuildConfig;
use profilyx_db::{ActionRepository, ActionTypeWeightRepository, Database, VectorRepository};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one build run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub generation: u64,
    pub vectors_written: u64,
    pub target_universe: usize,
    pub dense_materialized: bool,
    pub summary: BuildSummary,
}

/// Run a full vector build against the store.
pub async fn run_vector_build(db: Arc<Database>, config: &BuildConfig) -> Result<BuildReport> {
    let weight_repo = ActionTypeWeightRepository::new(db.clone());
    let action_repo = ActionRepository::new(db.clone());
    let vector_repo = VectorRepository::new(db.clone());

    let stored_weights = weight_repo
        .load()
        .await
        .context("loading action-type weights")?;
    let weights = if stored_weights.is_empty() {
        warn!("action_type_weights table is empty, seeding built-in defaults");
        let defaults = ActionTypeWeights::default_rows();
        weight_repo
            .upsert_all(&defaults)
            .await
            .context("seeding default action-type weights")?;
        ActionTypeWeights::default()
    } else {
        ActionTypeWeights::from_map(stored_weights)
    };

    let actions = action_repo.all().await.context("loading action relation")?;
    info!(actions = actions.len(), "Loaded action relation");

    // The target universe is a function of the whole relation, not just the
    // molecules that end up with vectors; the dense layout's column set is
    // fixed against it.
    let targets: Vec<String> = actions
        .iter()
        .map(|a| a.target_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let (vectors, summary) = build_vectors(&actions, &weights);
    info!(
        molecules = summary.molecules_built,
        degenerate = summary.degenerate,
        skipped = summary.actions_skipped,
        "Vector aggregation complete"
    );

    let mut writer = vector_repo
        .begin_generation()
        .await
        .context("starting vector generation")?;

    let batch_size = config.batch_size.max(1);
    for chunk in vectors.chunks(batch_size) {
        writer
            .write_batch(chunk)
            .await
            .context("writing sparse vector batch")?;
    }

    if config.materialize_dense {
        writer
            .materialize_dense(&targets, &vectors, batch_size)
            .await
            .context("materializing dense layout")?;
    }

    let state = writer
        .commit(targets.clone())
        .await
        .context("publishing vector generation")?;

    info!(
        generation = state.generation,
        vectors = vectors.len(),
        targets = targets.len(),
        "Vector build complete"
    );

    Ok(BuildReport {
        generation: state.generation,
        vectors_written: vectors.len() as u64,
        target_universe: targets.len(),
        dense_materialized: config.materialize_dense,
        summary,
    })
}
