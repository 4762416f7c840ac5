//! Vector similarity and brute-force nearest-neighbour ranking.

use std::cmp::Ordering;
use toolpilot_core::memory::ContextRecord;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the vectors differ in length, are empty, or either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0f64, 0.0f64, 0.0f64), |(d, na, nb), (x, y)| {
        let (x, y) = (f64::from(*x), f64::from(*y));
        (d + x * y, na + x * x, nb + y * y)
    });

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank records by cosine similarity to a query embedding.
///
/// Returns at most `limit` records, most similar first, each with
/// `similarity` set. Equal scores keep the older record first.
pub fn vector_search<'a, I>(records: I, query_embedding: &[f32], limit: usize) -> Vec<ContextRecord>
where
    I: IntoIterator<Item = &'a ContextRecord>,
{
    if limit == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f32, &ContextRecord)> = records
        .into_iter()
        .map(|record| (cosine_similarity(&record.embedding, query_embedding), record))
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.created_at.cmp(&b.1.created_at))
    });
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(sim, record)| {
            let mut r = record.clone();
            r.similarity = Some(sim);
            r
        })
        .collect()
}
