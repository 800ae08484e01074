//! Molecular vector construction.
//!
//! Aggregates the action relation per molecule: actions against the same
//! target are averaged (duplicate evidence for one molecule-target pair must
//! not double-count), then the resulting sparse vector is L2-normalized.
//! Actions with an unrecognized action type are dropped and counted, never
//! fatal. Molecules left with no resolvable action are omitted entirely —
//! a zero row would be indistinguishable from real neutral data, and
//! omission keeps the store small.

use crate::weights::ActionTypeWeights;
use profilyx_common::records::{Action, MolecularVector};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Counters surfaced after a build. Skipped actions are reported here per
/// action type rather than raised as errors.
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub molecules_built: u64,
    pub degenerate: u64,
    pub actions_total: u64,
    pub actions_skipped: u64,
    pub skipped_by_type: BTreeMap<String, u64>,
}

/// Build one normalized vector per molecule with at least one resolvable
/// action.
pub fn build_vectors(
    actions: &[Action],
    weights: &ActionTypeWeights,
) -> (Vec<MolecularVector>, BuildSummary) {
    let mut summary = BuildSummary {
        actions_total: actions.len() as u64,
        ..Default::default()
    };

    // molecule → target → weights of every matched action
    let mut grouped: BTreeMap<&str, BTreeMap<&str, Vec<f32>>> = BTreeMap::new();

    for action in actions {
        match weights.get(&action.action_type) {
            Some(weight) => {
                grouped
                    .entry(&action.chembl_id)
                    .or_default()
                    .entry(&action.target_id)
                    .or_default()
                    .push(weight);
            }
            None => {
                warn!(
                    chembl_id = %action.chembl_id,
                    target_id = %action.target_id,
                    action_type = %action.action_type,
                    "Unknown action type, skipping action"
                );
                summary.actions_skipped += 1;
                *summary
                    .skipped_by_type
                    .entry(action.action_type.clone())
                    .or_default() += 1;
            }
        }
    }

    let mut vectors = Vec::with_capacity(grouped.len());
    for (chembl_id, targets) in grouped {
        let mut components: BTreeMap<String, f32> = targets
            .into_iter()
            .map(|(target, values)| {
                let mean = values.iter().sum::<f32>() / values.len() as f32;
                (target.to_string(), mean)
            })
            .collect();

        let norm = components.values().map(|v| v * v).sum::<f32>().sqrt();
        let degenerate = norm == 0.0;
        if degenerate {
            // All matched weights were zero: keep the raw zeros and flag it.
            summary.degenerate += 1;
            debug!(chembl_id, "Degenerate vector (zero norm), kept unnormalized");
        } else {
            for value in components.values_mut() {
                *value /= norm;
            }
        }

        summary.molecules_built += 1;
        vectors.push(MolecularVector {
            chembl_id: chembl_id.to_string(),
            weights: components,
            degenerate,
        });
    }

    (vectors, summary)
}
