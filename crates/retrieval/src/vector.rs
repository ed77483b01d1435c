//! Vector similarity utilities shared by the index backends.

use std::cmp::Ordering;

use promptforge_core::index::{IndexHit, IndexRecord, MetadataFilter};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length, empty, or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Cosine distance: 0.0 = identical, 2.0 = opposite.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Rank records against a query vector.
///
/// Closest first; equal distances are ordered by ascending segment id so the
/// result never depends on storage order.
pub fn nearest<'a>(
    records: impl Iterator<Item = &'a IndexRecord>,
    query: &[f32],
    k: usize,
    filter: Option<&MetadataFilter>,
) -> Vec<IndexHit> {
    let mut hits: Vec<IndexHit> = records
        .filter(|r| filter.is_none_or(|f| f.matches(&r.segment)))
        .map(|r| IndexHit {
            segment: r.segment.clone(),
            distance: cosine_distance(&r.vector, query),
        })
        .collect();

    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.segment.id.cmp(&b.segment.id))
    });
    hits.truncate(k);
    hits
}
