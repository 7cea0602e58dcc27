//! Item-to-item recommendation scoring.
//!
//! Given a source song, every eligible candidate is scored as a blend of
//! review-embedding similarity, lyrics-embedding similarity and TF-IDF
//! keyword overlap. Unlike search there is no admission threshold: the
//! caller always gets the best `top_k` the catalog has.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

use crate::song_store::Song;

use super::types::{cosine_similarity, ScoredCandidate, SignalScores};

/// Blend weights for the three recommendation signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendWeights {
    pub review: f64,
    pub lyrics: f64,
    pub overlap: f64,
}

impl Default for RecommendWeights {
    fn default() -> Self {
        Self {
            review: 0.5,
            lyrics: 0.4,
            overlap: 0.1,
        }
    }
}

/// Scores recommendation candidates against a source song.
pub struct RecommendationScorer {
    weights: RecommendWeights,
}

impl RecommendationScorer {
    pub fn new(weights: RecommendWeights) -> Self {
        Self { weights }
    }

    /// Rank `candidates` by similarity to `source`.
    ///
    /// Returns empty when the source has no review vector (nothing to
    /// compare against). Candidates without a review vector, excluded
    /// candidates and the source itself are skipped. The lyrics signal is
    /// 0 when either side lacks a lyrics vector.
    pub fn recommend(
        &self,
        source: &Song,
        candidates: &[Song],
        top_k: usize,
    ) -> Vec<ScoredCandidate> {
        let source_review = match &source.review_vector {
            Some(v) => v,
            None => {
                debug!(song_id = %source.id, "Source song has no review vector, nothing to recommend");
                return Vec::new();
            }
        };
        let source_lyrics = source.lyrics_vector.as_deref();
        let source_terms: HashSet<&str> = source
            .tfidf_terms
            .iter()
            .flat_map(|terms| terms.keys())
            .map(String::as_str)
            .collect();

        let mut scored: Vec<ScoredCandidate> = candidates
            .par_iter()
            .filter(|candidate| candidate.id != source.id && candidate.is_eligible())
            .filter_map(|candidate| {
                let review_vec = candidate.review_vector.as_ref()?;
                let review_sim = cosine_similarity(source_review, review_vec);
                let lyrics_sim = match (source_lyrics, candidate.lyrics_vector.as_deref()) {
                    (Some(a), Some(b)) => cosine_similarity(a, b),
                    _ => 0.0,
                };
                let overlap = keyword_overlap(&source_terms, candidate);

                let score = review_sim * self.weights.review
                    + lyrics_sim * self.weights.lyrics
                    + overlap * self.weights.overlap;

                Some(ScoredCandidate {
                    id: candidate.id.clone(),
                    title: candidate.title.clone(),
                    artist: candidate.artist.clone(),
                    album_cover: candidate.album_cover.clone(),
                    review_text: candidate.review_text.clone(),
                    vibe_tags: candidate.vibe_tags.clone(),
                    core_lyrics: candidate.core_lyrics.clone(),
                    score,
                    signals: SignalScores {
                        review: review_sim,
                        lyrics: lyrics_sim,
                        lexical: overlap,
                    },
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);

        debug!(
            song_id = %source.id,
            results = scored.len(),
            "Scored recommendation candidates"
        );
        scored
    }
}

/// Fraction of the source's TF-IDF terms that also appear among the
/// candidate's terms. 0 when the source has no terms.
fn keyword_overlap(source_terms: &HashSet<&str>, candidate: &Song) -> f64 {
    if source_terms.is_empty() {
        return 0.0;
    }
    let candidate_terms = match &candidate.tfidf_terms {
        Some(terms) => terms,
        None => return 0.0,
    };
    let shared = source_terms
        .iter()
        .filter(|term| candidate_terms.contains_key(**term))
        .count();
    shared as f64 / source_terms.len() as f64
}
