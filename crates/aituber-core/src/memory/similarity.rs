//! Vector similarity helpers shared by fragment stores and the memory service.

use std::cmp::Ordering;

use aituber_types::memory::{FragmentCandidate, ScoredFragment};

/// Cosine similarity in `[-1, 1]`. Zero-norm or length-mismatched inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Cosine distance as reported by vector stores: `1 - cosine_similarity`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Nearest first; equal distances put the most recent fragment first, then
/// the larger id, so the order never depends on storage layout.
pub fn compare_candidates(a: &FragmentCandidate, b: &FragmentCandidate) -> Ordering {
    a.distance
        .partial_cmp(&b.distance)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.fragment.created_at.cmp(&a.fragment.created_at))
        .then_with(|| b.fragment.id.cmp(&a.fragment.id))
}

/// Most similar first, with the same recency tie-break as [`compare_candidates`].
pub fn compare_scored(a: &ScoredFragment, b: &ScoredFragment) -> Ordering {
    b.similarity
        .partial_cmp(&a.similarity)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.fragment.created_at.cmp(&a.fragment.created_at))
        .then_with(|| b.fragment.id.cmp(&a.fragment.id))
}
