//! Signal fusion and ranking.
//!
//! Takes raw per-candidate signals (two cosine similarities plus an
//! unbounded lexical score), normalizes them into one comparable space,
//! applies the per-intent weight vector and a semantic admission
//! threshold, and produces a deterministically ordered top-K list.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::types::{IntentCategory, ScoredCandidate, SignalRow, WeightVector};

/// Tuning knobs for signal fusion.
///
/// The weight table is an exhaustive per-category mapping rather than a
/// loose key-value map: adding a category is a compile-time-visible
/// change. All values are externally configurable since the tuning is
/// still in flux; the defaults are the reference configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Minimum semantic similarity (review or lyrics) a candidate must
    /// exceed to appear in results at all. Keeps lexically-boosted but
    /// semantically irrelevant items out.
    pub threshold: f64,

    /// Ceiling used to normalize the unbounded lexical score into [0, 1].
    /// Values above the ceiling contribute the same as the ceiling, so
    /// the lexical signal cannot dominate the fused score.
    pub lexical_ceiling: f64,

    pub vibe: WeightVector,
    pub lyrics: WeightVector,
    pub exact: WeightVector,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            lexical_ceiling: 4.0,
            vibe: WeightVector {
                review: 0.6,
                lyrics: 0.2,
                lexical: 0.2,
            },
            lyrics: WeightVector {
                review: 0.2,
                lyrics: 0.6,
                lexical: 0.2,
            },
            exact: WeightVector {
                review: 0.1,
                lyrics: 0.1,
                lexical: 0.8,
            },
        }
    }
}

impl FusionConfig {
    pub fn weights_for(&self, category: IntentCategory) -> &WeightVector {
        match category {
            IntentCategory::Exact => &self.exact,
            IntentCategory::Lyrics => &self.lyrics,
            IntentCategory::Vibe => &self.vibe,
        }
    }
}

/// Fuses raw signals into a ranked result list.
#[derive(Debug, Clone, Default)]
pub struct SignalFusionRanker {
    config: FusionConfig,
}

impl SignalFusionRanker {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Normalize the unbounded lexical score into [0, 1] by clamping to
    /// the ceiling and dividing by it.
    fn normalize_lexical(&self, lexical_raw: f64) -> f64 {
        if self.config.lexical_ceiling <= 0.0 {
            return 0.0;
        }
        lexical_raw.clamp(0.0, self.config.lexical_ceiling) / self.config.lexical_ceiling
    }

    /// Score, filter, order and truncate candidates for one query.
    ///
    /// Candidates failing the admission threshold on both semantic
    /// signals are dropped. Remaining candidates are ordered by fused
    /// score descending, ties broken by id ascending so results are
    /// reproducible.
    pub fn rank(
        &self,
        category: IntentCategory,
        candidates: Vec<SignalRow>,
        top_k: usize,
    ) -> Vec<ScoredCandidate> {
        let weights = self.config.weights_for(category);

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .filter(|row| {
                row.signals.review > self.config.threshold
                    || row.signals.lyrics > self.config.threshold
            })
            .map(|row| {
                let lexical_norm = self.normalize_lexical(row.signals.lexical);
                let score = row.signals.review * weights.review
                    + row.signals.lyrics * weights.lyrics
                    + lexical_norm * weights.lexical;
                ScoredCandidate {
                    id: row.id,
                    title: row.title,
                    artist: row.artist,
                    album_cover: row.album_cover,
                    review_text: row.review_text,
                    vibe_tags: row.vibe_tags,
                    core_lyrics: row.core_lyrics,
                    score,
                    signals: row.signals,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::SignalScores;

    fn make_row(id: &str, review: f64, lyrics: f64, lexical: f64) -> SignalRow {
        SignalRow {
            id: id.to_string(),
            title: format!("title_{}", id),
            artist: format!("artist_{}", id),
            album_cover: None,
            review_text: None,
            vibe_tags: None,
            core_lyrics: None,
            signals: SignalScores {
                review,
                lyrics,
                lexical,
            },
        }
    }

    // ==========================================================================
    // Weight application
    // ==========================================================================

    #[test]
    fn test_weights_applied_exactly_as_configured() {
        let config = FusionConfig::default();
        let ranker = SignalFusionRanker::new(config);

        // Pure review signal under Exact must score exactly the review weight.
        let rows = vec![make_row("a", 1.0, 0.0, 0.0)];
        let out = ranker.rank(IntentCategory::Exact, rows, 10);
        assert_eq!(out.len(), 1);
        assert!((out[0].score - config.exact.review).abs() < 1e-12);
    }

    #[test]
    fn test_each_category_uses_its_own_weights() {
        let ranker = SignalFusionRanker::default();
        let row = make_row("a", 0.9, 0.0, 0.0);

        let vibe = ranker.rank(IntentCategory::Vibe, vec![row.clone()], 10);
        let lyrics = ranker.rank(IntentCategory::Lyrics, vec![row.clone()], 10);
        let exact = ranker.rank(IntentCategory::Exact, vec![row], 10);

        assert!((vibe[0].score - 0.9 * 0.6).abs() < 1e-12);
        assert!((lyrics[0].score - 0.9 * 0.2).abs() < 1e-12);
        assert!((exact[0].score - 0.9 * 0.1).abs() < 1e-12);
    }

    // ==========================================================================
    // Lexical normalization
    // ==========================================================================

    #[test]
    fn test_clamping_is_idempotent_beyond_ceiling() {
        let ranker = SignalFusionRanker::default();

        let at_ceiling = ranker.rank(
            IntentCategory::Exact,
            vec![make_row("a", 0.8, 0.0, 4.0)],
            10,
        );
        let above_ceiling = ranker.rank(
            IntentCategory::Exact,
            vec![make_row("a", 0.8, 0.0, 400.0)],
            10,
        );

        assert!((at_ceiling[0].score - above_ceiling[0].score).abs() < 1e-12);
    }

    #[test]
    fn test_lexical_normalized_by_ceiling() {
        let ranker = SignalFusionRanker::default();
        // lexical 2.0 / ceiling 4.0 = 0.5 normalized, weighted 0.8 under Exact
        let out = ranker.rank(
            IntentCategory::Exact,
            vec![make_row("a", 0.8, 0.0, 2.0)],
            10,
        );
        let expected = 0.8 * 0.1 + 0.5 * 0.8;
        assert!((out[0].score - expected).abs() < 1e-12);
    }

    // ==========================================================================
    // Admission threshold
    // ==========================================================================

    #[test]
    fn test_threshold_excludes_then_admits() {
        let ranker = SignalFusionRanker::default();

        let below = ranker.rank(
            IntentCategory::Vibe,
            vec![make_row("a", 0.39, 0.0, 10.0)],
            10,
        );
        assert!(below.is_empty());

        let above = ranker.rank(
            IntentCategory::Vibe,
            vec![make_row("a", 0.41, 0.0, 10.0)],
            10,
        );
        assert_eq!(above.len(), 1);
    }

    #[test]
    fn test_lyrics_signal_alone_can_admit() {
        let ranker = SignalFusionRanker::default();
        let out = ranker.rank(
            IntentCategory::Lyrics,
            vec![make_row("a", 0.1, 0.75, 0.0)],
            10,
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_threshold_is_strict() {
        let ranker = SignalFusionRanker::default();
        // Exactly at the threshold is not admitted.
        let out = ranker.rank(IntentCategory::Vibe, vec![make_row("a", 0.4, 0.4, 0.0)], 10);
        assert!(out.is_empty());
    }

    // ==========================================================================
    // Ordering and truncation
    // ==========================================================================

    #[test]
    fn test_ordered_by_fused_score_descending() {
        let ranker = SignalFusionRanker::default();
        let out = ranker.rank(
            IntentCategory::Vibe,
            vec![
                make_row("low", 0.5, 0.0, 0.0),
                make_row("high", 0.9, 0.0, 0.0),
                make_row("mid", 0.7, 0.0, 0.0),
            ],
            10,
        );
        let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_ties_broken_by_id_ascending() {
        let ranker = SignalFusionRanker::default();
        let out = ranker.rank(
            IntentCategory::Vibe,
            vec![
                make_row("b", 0.8, 0.0, 0.0),
                make_row("a", 0.8, 0.0, 0.0),
                make_row("c", 0.8, 0.0, 0.0),
            ],
            10,
        );
        let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_truncates_to_top_k() {
        let ranker = SignalFusionRanker::default();
        let rows = (0..20)
            .map(|i| make_row(&format!("id_{:02}", i), 0.5 + (i as f64) * 0.01, 0.0, 0.0))
            .collect();
        let out = ranker.rank(IntentCategory::Vibe, rows, 5);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0].id, "id_19");
    }

    // ==========================================================================
    // Worked example from the reference configuration
    // ==========================================================================

    #[test]
    fn test_exact_query_lexical_boost_beats_pure_semantics() {
        // "周杰伦 晴天" classified Exact: a lexically matched candidate with
        // lexical_raw above the ceiling beats a semantically closer one
        // with no lexical match.
        let ranker = SignalFusionRanker::default();
        let out = ranker.rank(
            IntentCategory::Exact,
            vec![
                make_row("qingtian", 0.8, 0.0, 6.0),
                make_row("other", 0.95, 0.0, 0.0),
            ],
            10,
        );
        assert_eq!(out[0].id, "qingtian");
        assert!((out[0].score - 0.88).abs() < 1e-12);
        assert!((out[1].score - 0.095).abs() < 1e-12);
    }

    // ==========================================================================
    // Config plumbing
    // ==========================================================================

    #[test]
    fn test_config_deserializes_with_partial_overrides() {
        let config: FusionConfig = toml::from_str(
            r#"
            threshold = 0.3
            [exact]
            review = 0.2
            lyrics = 0.2
            lexical = 0.6
            "#,
        )
        .unwrap();
        assert!((config.threshold - 0.3).abs() < 1e-12);
        assert!((config.lexical_ceiling - 4.0).abs() < 1e-12);
        assert!((config.exact.lexical - 0.6).abs() < 1e-12);
        // Untouched categories keep their defaults.
        assert!((config.vibe.review - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_zero_ceiling_drops_lexical_contribution() {
        let ranker = SignalFusionRanker::new(FusionConfig {
            lexical_ceiling: 0.0,
            ..FusionConfig::default()
        });
        let out = ranker.rank(
            IntentCategory::Exact,
            vec![make_row("a", 0.8, 0.0, 100.0)],
            10,
        );
        assert!((out[0].score - 0.8 * 0.1).abs() < 1e-12);
    }
}
