//! Sparse cosine similarity and top-k ranking.
//!
//! Two vectors are compared over the union of their target keys; a key
//! missing from either side contributes 0 to the dot product and nothing to
//! that vector's own norm. Stored vectors are unit-norm at build time, but
//! the math here never assumes it — masked vectors derived at query time are
//! not renormalized, and degenerate vectors are legal inputs.

use profilyx_common::records::MolecularVector;
use std::collections::{BTreeMap, HashSet};

type Components = BTreeMap<String, f32>;

fn dot(a: &Components, b: &Components) -> f32 {
    // Iterate the smaller side; absent keys on the other side are zero.
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(k, v)| large.get(k).map(|w| v * w))
        .sum()
}

fn norm(v: &Components) -> f32 {
    v.values().map(|x| x * x).sum::<f32>().sqrt()
}

/// Full cosine similarity with defensive zero-norm handling: if either side
/// has zero norm the similarity is defined as 0.0. An explicit branch, not a
/// division fault.
pub fn cosine(a: &Components, b: &Components) -> f32 {
    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

/// Zero out every component outside the given target set. The result is NOT
/// renormalized; masked similarity is meant to measure how much of the
/// original profiles aligns within disease-relevant biology.
pub fn mask(v: &Components, targets: &HashSet<String>) -> Components {
    v.iter()
        .filter(|(k, _)| targets.contains(*k))
        .map(|(k, w)| (k.clone(), *w))
        .collect()
}

/// Rank a candidate pool by cosine similarity to the reference components.
///
/// Returns at most `top_k` entries, sorted by score descending with ties
/// broken by ChEMBL ID ascending. Each candidate supplies the components it
/// should be compared with (full or masked); the candidate whose ID equals
/// `reference_id` is skipped unless `include_self` is set.
pub fn rank<'a, I>(
    reference: &Components,
    reference_id: &str,
    candidates: I,
    top_k: usize,
    include_self: bool,
) -> Vec<(String, f32)>
where
    I: IntoIterator<Item = (&'a str, &'a Components)>,
{
    let mut scored: Vec<(String, f32)> = candidates
        .into_iter()
        .filter(|(id, _)| include_self || *id != reference_id)
        .map(|(id, components)| (id.to_string(), cosine(reference, components)))
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(top_k);
    scored
}

/// Convenience over whole records.
pub fn rank_vectors(
    reference: &MolecularVector,
    pool: &[MolecularVector],
    top_k: usize,
    include_self: bool,
) -> Vec<(String, f32)> {
    rank(
        &reference.weights,
        &reference.chembl_id,
        pool.iter().map(|v| (v.chembl_id.as_str(), &v.weights)),
        top_k,
        include_self,
    )
}
