//! Degraded behaviour used when an external provider is unavailable.
//!
//! Every provider call in the crate returns a [`ProviderResult`]. The
//! functions here are the only place that turns those results into what the
//! caller sees, so the fallback policy can be tested without any network.

use std::collections::HashSet;

use tracing::warn;

use crate::document::ScoredChunk;
use crate::error::{ProviderError, ProviderResult};
use crate::reranker::RerankHit;
use crate::similarity::magnitude;

/// Summary stored when none could be generated.
pub const SUMMARY_SENTINEL: &str = "no summary available";

/// `count` zero vectors of the given dimensionality.
pub fn placeholder_vectors(count: usize, dimensions: usize) -> Vec<Vec<f32>> {
    vec![vec![0.0; dimensions]; count]
}

/// Accept a batch of embeddings or substitute placeholders for the whole batch.
///
/// A batch is accepted only if it has exactly `expected_len` vectors, all of
/// `dimensions` length. Anything else is treated as a provider failure so the
/// dimensionality never changes between calls.
pub fn embeddings_or_placeholder(
    result: ProviderResult<Vec<Vec<f32>>>,
    expected_len: usize,
    dimensions: usize,
) -> Vec<Vec<f32>> {
    let failure = match result {
        Ok(vectors) if vectors.len() != expected_len => ProviderError::Malformed(format!(
            "expected {expected_len} embeddings, got {}",
            vectors.len()
        )),
        Ok(vectors) => match vectors.iter().find(|v| v.len() != dimensions) {
            Some(bad) => ProviderError::Malformed(format!(
                "expected {dimensions}-dimensional embeddings, got {}",
                bad.len()
            )),
            None => return vectors,
        },
        Err(err) => err,
    };

    warn!(error = %failure, batch_size = expected_len, dimensions, "using placeholder embeddings");
    placeholder_vectors(expected_len, dimensions)
}

/// Accept a query embedding, or `None` to request keyword search instead.
///
/// An empty or zero-magnitude vector cannot rank anything and is treated
/// like a failure.
pub fn query_vector_or_none(result: ProviderResult<Vec<f32>>) -> Option<Vec<f32>> {
    match result {
        Ok(vector) if !vector.is_empty() && magnitude(&vector) > 0.0 => Some(vector),
        Ok(_) => {
            warn!("query embedding is empty, falling back to keyword search");
            None
        }
        Err(err) => {
            warn!(error = %err, "query embedding failed, falling back to keyword search");
            None
        }
    }
}

/// Apply provider rerank hits, or return the first `top_k` candidates untouched.
///
/// Hits keep the provider's order and replace the candidate score with the
/// relevance score. Hits pointing outside `candidates`, or repeating an
/// index already used, are dropped.
pub fn rerank_or_passthrough(
    candidates: Vec<ScoredChunk>,
    result: ProviderResult<Vec<RerankHit>>,
    top_k: usize,
) -> Vec<ScoredChunk> {
    let hits = match result {
        Ok(hits) => hits,
        Err(err) => {
            warn!(error = %err, candidates = candidates.len(), "rerank failed, keeping original order");
            return candidates.into_iter().take(top_k).collect();
        }
    };

    let mut seen = HashSet::new();
    hits.into_iter()
        .filter_map(|hit| {
            let index = usize::try_from(hit.index).ok().filter(|i| *i < candidates.len())?;
            seen.insert(index).then_some((index, hit.relevance_score))
        })
        .take(top_k)
        .map(|(index, score)| {
            let mut chunk = candidates[index].clone();
            chunk.score = score;
            chunk
        })
        .collect()
}

/// Accept a generated summary or substitute [`SUMMARY_SENTINEL`].
pub fn summary_or_sentinel(result: ProviderResult<String>) -> String {
    match result {
        Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
        Ok(_) => {
            warn!("summary provider returned an empty reply");
            SUMMARY_SENTINEL.to_string()
        }
        Err(err) => {
            warn!(error = %err, "summary generation failed");
            SUMMARY_SENTINEL.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    fn candidate(text: &str, score: f32, index: usize) -> ScoredChunk {
        ScoredChunk {
            text: text.into(),
            score,
            metadata: ChunkMetadata { index },
            document_id: None,
            document_title: None,
        }
    }

    #[test]
    fn accepts_well_formed_batch() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert_eq!(embeddings_or_placeholder(Ok(vectors.clone()), 2, 2), vectors);
    }

    #[test]
    fn failed_batch_becomes_placeholders() {
        let out = embeddings_or_placeholder(Err(ProviderError::MissingCredentials), 3, 4);
        assert_eq!(out, vec![vec![0.0; 4]; 3]);
    }

    #[test]
    fn short_batch_becomes_placeholders() {
        let out = embeddings_or_placeholder(Ok(vec![vec![1.0, 2.0]]), 2, 2);
        assert_eq!(out, placeholder_vectors(2, 2));
    }

    #[test]
    fn wrong_dimension_becomes_placeholders() {
        let out = embeddings_or_placeholder(Ok(vec![vec![1.0, 2.0, 3.0]]), 1, 2);
        assert_eq!(out, placeholder_vectors(1, 2));
    }

    #[test]
    fn zero_query_vector_requests_keyword_search() {
        assert_eq!(query_vector_or_none(Ok(vec![0.0, 0.0])), None);
        assert_eq!(query_vector_or_none(Ok(vec![])), None);
        assert_eq!(query_vector_or_none(Err(ProviderError::Transport("down".into()))), None);
        assert_eq!(query_vector_or_none(Ok(vec![0.5])), Some(vec![0.5]));
    }

    #[test]
    fn rerank_failure_returns_prefix_unchanged() {
        let candidates =
            vec![candidate("a", 0.9, 0), candidate("b", 0.5, 1), candidate("c", 0.1, 2)];
        let out = rerank_or_passthrough(
            candidates.clone(),
            Err(ProviderError::Timeout(std::time::Duration::from_secs(1))),
            2,
        );
        assert_eq!(out, candidates[..2].to_vec());
    }

    #[test]
    fn rerank_hits_reorder_and_rescore() {
        let candidates =
            vec![candidate("a", 0.9, 0), candidate("b", 0.5, 1), candidate("c", 0.1, 2)];
        let hits = vec![
            RerankHit { index: 2, relevance_score: 0.99 },
            RerankHit { index: 7, relevance_score: 0.98 },
            RerankHit { index: -1, relevance_score: 0.98 },
            RerankHit { index: 2, relevance_score: 0.97 },
            RerankHit { index: 0, relevance_score: 0.42 },
            RerankHit { index: 1, relevance_score: 0.10 },
        ];
        let out = rerank_or_passthrough(candidates, Ok(hits), 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "c");
        assert!((out[0].score - 0.99).abs() < f32::EPSILON);
        assert_eq!(out[1].text, "a");
        assert!((out[1].score - 0.42).abs() < f32::EPSILON);
    }

    #[test]
    fn summary_sentinel_on_failure_or_blank() {
        assert_eq!(summary_or_sentinel(Ok("  A short abstract. ".into())), "A short abstract.");
        assert_eq!(summary_or_sentinel(Ok("   ".into())), SUMMARY_SENTINEL);
        assert_eq!(summary_or_sentinel(Err(ProviderError::MissingCredentials)), SUMMARY_SENTINEL);
    }
}
