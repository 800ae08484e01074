//! Action-type weight lookup.
//!
//! Maps the ChEMBL mechanism action-type labels to a signed role weight:
//! positive for activating mechanisms, negative for inhibitory ones,
//! magnitude reflecting how decisive the mechanism is. Zero is a valid
//! weight ("neutral role"); an *unknown* action type resolves to `None` and
//! must be excluded from aggregation rather than treated as zero.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Built-in weight table. Deployments override by writing the
/// `action_type_weights` table before running a build.
const DEFAULT_WEIGHTS: &[(&str, f32)] = &[
    ("ACTIVATOR", 1.0),
    ("AGONIST", 1.0),
    ("ALLOSTERIC ANTAGONIST", -0.7),
    ("ANTAGONIST", -1.0),
    ("ANTISENSE INHIBITOR", -0.9),
    ("BINDING AGENT", 0.3),
    ("BLOCKER", -1.0),
    ("CROSS-LINKING AGENT", -0.8),
    ("DEGRADER", -1.0),
    ("DISRUPTING AGENT", -0.8),
    ("EXOGENOUS GENE", 0.5),
    ("EXOGENOUS PROTEIN", 0.5),
    ("HYDROLYTIC ENZYME", 0.5),
    ("INHIBITOR", -1.0),
    ("INVERSE AGONIST", -0.8),
    ("MODULATOR", 0.2),
    ("NEGATIVE ALLOSTERIC MODULATOR", -0.6),
    ("NEGATIVE MODULATOR", -0.6),
    ("OPENER", 0.8),
    ("OTHER", 0.0),
    ("PARTIAL AGONIST", 0.5),
    ("POSITIVE ALLOSTERIC MODULATOR", 0.6),
    ("POSITIVE MODULATOR", 0.6),
    ("PROTEOLYTIC ENZYME", -0.7),
    ("RELEASING AGENT", 0.7),
    ("RNAI INHIBITOR", -0.9),
    ("STABILISER", 0.4),
    ("SUBSTRATE", 0.2),
    ("VACCINE ANTIGEN", 0.3),
];

/// The action-type → weight lookup used by the vector builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionTypeWeights {
    weights: HashMap<String, f32>,
}

impl ActionTypeWeights {
    /// Build from an already-loaded mapping (e.g. the `action_type_weights`
    /// table).
    pub fn from_map(weights: HashMap<String, f32>) -> Self {
        Self { weights }
    }

    /// Weight for an action type; `None` when the type is unknown.
    pub fn get(&self, action_type: &str) -> Option<f32> {
        self.weights.get(action_type).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// The default table as upsertable rows.
    pub fn default_rows() -> Vec<(String, f32)> {
        DEFAULT_WEIGHTS
            .iter()
            .map(|(t, w)| (t.to_string(), *w))
            .collect()
    }
}

impl Default for ActionTypeWeights {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(t, w)| (t.to_string(), *w))
                .collect(),
        }
    }
}
