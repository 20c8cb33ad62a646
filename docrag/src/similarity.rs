//! Cosine ranking and the keyword fallback.

use std::cmp::Ordering;

use crate::document::{Chunk, ChunkVector, ScoredChunk};

/// Score given to every keyword match when no query embedding is available.
pub const KEYWORD_MATCH_SCORE: f32 = 0.8;

/// Euclidean length of a vector.
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if the lengths differ or either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let norm_a = magnitude(a);
    let norm_b = magnitude(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Outcome of ranking a collection against a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    /// Scored chunks, best first, at most `top_k`.
    pub results: Vec<ScoredChunk>,
    /// Number of vectors skipped because their dimensionality differs from the query's.
    pub skipped: usize,
    /// Dimensionality of the first skipped vector, if any.
    pub mismatched_dim: Option<usize>,
}

/// Rank chunks by cosine similarity to `query`.
///
/// Vectors whose dimensionality differs from the query's are skipped rather
/// than scored. The sort is stable, so equal scores keep document order.
pub fn rank_by_cosine(
    chunks: &[Chunk],
    vectors: &[ChunkVector],
    query: &[f32],
    top_k: usize,
) -> Ranked {
    let mut skipped = 0;
    let mut mismatched_dim = None;
    let mut results = Vec::with_capacity(chunks.len());

    for (chunk, vector) in chunks.iter().zip(vectors) {
        if vector.dim() != query.len() {
            skipped += 1;
            mismatched_dim.get_or_insert(vector.dim());
            continue;
        }
        results.push(ScoredChunk::from_chunk(chunk, cosine_similarity(query, &vector.embedding)));
    }

    sort_descending(&mut results);
    results.truncate(top_k);
    Ranked { results, skipped, mismatched_dim }
}

/// Case-insensitive substring match over chunk text.
///
/// Every match scores [`KEYWORD_MATCH_SCORE`]; matches keep document order.
pub fn keyword_search(chunks: &[Chunk], query: &str, top_k: usize) -> Vec<ScoredChunk> {
    let needle = query.to_lowercase();
    chunks
        .iter()
        .filter(|chunk| chunk.text.to_lowercase().contains(&needle))
        .take(top_k)
        .map(|chunk| ScoredChunk::from_chunk(chunk, KEYWORD_MATCH_SCORE))
        .collect()
}

/// Stable sort by descending score; NaN scores sort last.
pub fn sort_descending(results: &mut [ScoredChunk]) {
    results.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    fn chunk(text: &str, index: usize) -> Chunk {
        Chunk { id: format!("c{index}"), text: text.into(), metadata: ChunkMetadata { index } }
    }

    fn vector(index: usize, embedding: Vec<f32>) -> ChunkVector {
        ChunkVector {
            chunk_id: format!("c{index}"),
            embedding,
            metadata: ChunkMetadata { index },
        }
    }

    #[test]
    fn identical_vectors_score_one() {
        let v = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let v = [0.3, -1.2, 4.0];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        assert!((cosine_similarity(&v, &neg) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_or_zero_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn ranking_skips_mismatched_dimensions() {
        let chunks = vec![chunk("a", 0), chunk("b", 1), chunk("c", 2)];
        let vectors = vec![
            vector(0, vec![1.0, 0.0]),
            vector(1, vec![1.0, 0.0, 0.0]),
            vector(2, vec![0.0, 1.0]),
        ];
        let ranked = rank_by_cosine(&chunks, &vectors, &[1.0, 0.1], 10);
        assert_eq!(ranked.skipped, 1);
        assert_eq!(ranked.mismatched_dim, Some(3));
        let order: Vec<&str> = ranked.results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(order, vec!["a", "c"]);
    }

    #[test]
    fn ranking_respects_top_k() {
        let chunks: Vec<Chunk> = (0..5).map(|i| chunk("x", i)).collect();
        let vectors: Vec<ChunkVector> = (0..5).map(|i| vector(i, vec![1.0, i as f32])).collect();
        let ranked = rank_by_cosine(&chunks, &vectors, &[0.0, 1.0], 2);
        assert_eq!(ranked.results.len(), 2);
        assert_eq!(ranked.results[0].metadata.index, 4);
    }

    #[test]
    fn keyword_search_is_case_insensitive_and_ordered() {
        let chunks = vec![chunk("Rust is fast", 0), chunk("python", 1), chunk("rusty nail", 2)];
        let hits = keyword_search(&chunks, "RUST", 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.index, 0);
        assert_eq!(hits[1].metadata.index, 2);
        assert!(hits.iter().all(|h| (h.score - KEYWORD_MATCH_SCORE).abs() < f32::EPSILON));
        assert_eq!(keyword_search(&chunks, "rust", 1).len(), 1);
    }

    #[test]
    fn nan_scores_sort_last() {
        let mut results = vec![
            ScoredChunk::from_chunk(&chunk("nan", 0), f32::NAN),
            ScoredChunk::from_chunk(&chunk("low", 1), 0.1),
            ScoredChunk::from_chunk(&chunk("high", 2), 0.9),
        ];
        sort_descending(&mut results);
        let order: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(order, vec!["high", "low", "nan"]);
    }
}
