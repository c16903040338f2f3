// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context retrieval across the persona and episodic collections.
//!
//! Persona hits are authoritative and score a flat 1.0. Episodic hits get a
//! weighted composite of similarity, recency and importance plus configured
//! tone/tag boosts, clipped to [0, 1]. Both lists are merged, ranked and cut
//! to a single shared cap of `max(topk_persona, topk_episodic)`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mneme_config::model::{RetrievalConfig, SelectionPolicy};
use mneme_core::error::MnemeError;
use mneme_core::types::{Collection, MetadataFilter};
use mneme_core::{Clock, EmbeddingProvider, VectorStore};
use tracing::{debug, warn};

use crate::types::{MemoryRecord, RetrievalStats, ScoredCandidate};

/// Score assigned to every persona candidate.
const PERSONA_SCORE: f64 = 1.0;

/// Recency decay: 1.0 for a fresh record, halving after one day.
pub fn recency_weight(age_days: f64) -> f64 {
    1.0 / (1.0 + age_days.max(0.0))
}

/// Ranks and merges memory candidates into a bounded context block.
pub struct RetrievalScorer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    clock: Arc<dyn Clock>,
    config: RetrievalConfig,
}

impl RetrievalScorer {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        clock: Arc<dyn Clock>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Build the context block for `query`.
    ///
    /// Never fails: a collection whose query fails contributes no candidates,
    /// and an embedding failure or blank query yields an empty context.
    pub async fn retrieve_context(
        &self,
        query: &str,
        topk_persona: usize,
        topk_episodic: usize,
        importance_threshold: f64,
    ) -> (String, RetrievalStats) {
        let (selected, stats) = self
            .retrieve_candidates(query, topk_persona, topk_episodic, importance_threshold)
            .await;
        (render_context(&selected), stats)
    }

    /// [`RetrievalScorer::retrieve_context`] with the episodic records in
    /// `exclude` left out of the candidate set.
    pub async fn retrieve_context_excluding(
        &self,
        query: &str,
        topk_persona: usize,
        topk_episodic: usize,
        importance_threshold: f64,
        exclude: &[&str],
    ) -> (String, RetrievalStats) {
        let (selected, stats) = self
            .retrieve_candidates_excluding(
                query,
                topk_persona,
                topk_episodic,
                importance_threshold,
                exclude,
            )
            .await;
        (render_context(&selected), stats)
    }

    /// Ranked candidates behind [`RetrievalScorer::retrieve_context`].
    pub async fn retrieve_candidates(
        &self,
        query: &str,
        topk_persona: usize,
        topk_episodic: usize,
        importance_threshold: f64,
    ) -> (Vec<ScoredCandidate>, RetrievalStats) {
        self.retrieve_candidates_excluding(query, topk_persona, topk_episodic, importance_threshold, &[])
            .await
    }

    /// Ranked candidates with the episodic records in `exclude` left out.
    pub async fn retrieve_candidates_excluding(
        &self,
        query: &str,
        topk_persona: usize,
        topk_episodic: usize,
        importance_threshold: f64,
        exclude: &[&str],
    ) -> (Vec<ScoredCandidate>, RetrievalStats) {
        mneme_core::metrics::record_retrieval();
        let mut stats = RetrievalStats {
            topk_persona,
            topk_episodic,
            ..RetrievalStats::default()
        };

        let query = query.trim();
        if query.is_empty() {
            debug!("blank retrieval query, returning empty context");
            return (Vec::new(), stats);
        }

        let embedding = match self.embedder.encode_query(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "query embedding failed, returning empty context");
                stats.embedding_failed = true;
                return (Vec::new(), stats);
            }
        };

        let now = self.clock.now();

        let persona = match self.persona_candidates(&embedding, topk_persona, now).await {
            Ok((candidates, considered)) => {
                stats.persona_considered = considered;
                candidates
            }
            Err(e) => {
                warn!(collection = "persona", error = %e, "persona query failed, continuing without it");
                mneme_core::metrics::record_store_failure(Collection::Persona.as_str(), "query");
                stats.persona_failed = true;
                Vec::new()
            }
        };

        let episodic = match self
            .episodic_candidates(&embedding, topk_episodic, importance_threshold, exclude, now)
            .await
        {
            Ok((candidates, considered)) => {
                stats.episodic_considered = considered;
                candidates
            }
            Err(e) => {
                warn!(collection = "episodic", error = %e, "episodic query failed, continuing without it");
                mneme_core::metrics::record_store_failure(Collection::Episodic.as_str(), "query");
                stats.episodic_failed = true;
                Vec::new()
            }
        };

        let selected = merge_ranked(persona, episodic, topk_persona.max(topk_episodic));
        stats.persona_hits = selected
            .iter()
            .filter(|c| c.collection == Collection::Persona)
            .count();
        stats.episodic_hits = selected.len() - stats.persona_hits;

        debug!(
            persona_hits = stats.persona_hits,
            episodic_hits = stats.episodic_hits,
            persona_considered = stats.persona_considered,
            episodic_considered = stats.episodic_considered,
            "context retrieved"
        );
        (selected, stats)
    }

    async fn persona_candidates(
        &self,
        embedding: &[f32],
        topk: usize,
        now: DateTime<Utc>,
    ) -> Result<(Vec<ScoredCandidate>, usize), MnemeError> {
        if topk == 0 {
            return Ok((Vec::new(), 0));
        }
        let active = MetadataFilter::eq("active", true);
        let hits = self
            .store
            .query(Collection::Persona, embedding, topk, Some(&active))
            .await?;
        let considered = hits.len();
        let candidates = hits
            .into_iter()
            .map(|hit| {
                let similarity = f64::from(hit.similarity());
                ScoredCandidate {
                    record: MemoryRecord::from_parts(&hit.id, &hit.document, &hit.metadata),
                    collection: Collection::Persona,
                    similarity,
                    score: PERSONA_SCORE,
                }
            })
            .filter(|c| !c.record.is_expired(now))
            .collect();
        Ok((candidates, considered))
    }

    async fn episodic_candidates(
        &self,
        embedding: &[f32],
        topk: usize,
        importance_threshold: f64,
        exclude: &[&str],
        now: DateTime<Utc>,
    ) -> Result<(Vec<ScoredCandidate>, usize), MnemeError> {
        if topk == 0 {
            return Ok((Vec::new(), 0));
        }
        let n = topk
            .saturating_mul(self.config.overfetch_factor.max(1))
            .saturating_add(exclude.len());
        let hits = self
            .store
            .query(Collection::Episodic, embedding, n, None)
            .await?;
        let considered = hits.len();
        let candidates = hits
            .into_iter()
            .filter(|hit| !exclude.contains(&hit.id.as_str()))
            .filter_map(|hit| {
                let record = MemoryRecord::from_parts(&hit.id, &hit.document, &hit.metadata);
                if record.is_expired(now) {
                    return None;
                }
                let similarity = f64::from(hit.similarity());
                let score = self.composite_score(similarity, &record, now);
                self.selects(score, record.importance(), importance_threshold)
                    .then_some(ScoredCandidate {
                        record,
                        collection: Collection::Episodic,
                        similarity,
                        score,
                    })
            })
            .collect();
        Ok((candidates, considered))
    }

    /// Weighted, boosted and clipped score for an episodic record.
    pub fn composite_score(&self, similarity: f64, record: &MemoryRecord, now: DateTime<Utc>) -> f64 {
        let w = &self.config.weights;
        let base = w.similarity * similarity
            + w.recency * recency_weight(record.age_days(now))
            + w.importance * record.importance();

        let boosts = &self.config.boosts;
        let tone_bonus = boosts.tone.get(&record.tone).copied().unwrap_or(0.0);
        let tag_bonus: f64 = record
            .tags
            .iter()
            .filter_map(|tag| boosts.tags.get(tag))
            .sum();

        let score = base + tone_bonus + tag_bonus;
        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn selects(&self, score: f64, importance: f64, importance_threshold: f64) -> bool {
        let by_score = score >= self.config.min_score;
        match self.config.selection_policy {
            SelectionPolicy::ScoreOrImportance => by_score || importance >= importance_threshold,
            SelectionPolicy::ScoreOnly => by_score,
        }
    }
}

/// Persona first, then a stable sort by score so ties keep that order.
fn merge_ranked(
    persona: Vec<ScoredCandidate>,
    episodic: Vec<ScoredCandidate>,
    cap: usize,
) -> Vec<ScoredCandidate> {
    let mut merged = persona;
    merged.extend(episodic);
    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged.truncate(cap);
    merged
}

/// One line per candidate, prefixed with its collection tag.
pub fn render_context(candidates: &[ScoredCandidate]) -> String {
    candidates
        .iter()
        .map(|c| format!("{} {}", c.collection.context_tag(), c.record.text))
        .collect::<Vec<_>>()
        .join("\n")
}
