//! Hybrid candidate search
//!
//! Embeds the rewritten query, runs a metadata-filtered nearest-neighbor
//! search, and falls back to pure semantic search when — and only when —
//! the filtered attempt yields zero dishes. Constraint-extraction errors or
//! metadata typos therefore degrade recall gracefully instead of zeroing it.
//!
//! Index or embedding failures are fatal for the question: correctness
//! cannot be salvaged without the index.

use crate::constraints::ConstraintSet;
use crate::index::VectorIndex;
use astromenu_common::embeddings::Embedder;
use astromenu_common::errors::Result;
use astromenu_common::models::ScoredChunk;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// A dish surfaced by search, pending verification
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    /// Dish identifier
    pub dish_id: u32,

    /// Dish name from the chunk metadata
    pub dish_name: String,

    /// Best similarity score among the chunks that produced this dish
    pub score: f32,

    /// Chunks that produced this candidate
    pub chunk_ids: Vec<Uuid>,

    /// False when the candidate came from the fallback attempt
    pub matched_filter: bool,
}

/// Result of the two-attempt search
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Distinct candidate dishes, best score first, ties by ascending id
    pub candidates: Vec<Candidate>,

    /// Whether the unconstrained fallback attempt produced the candidates
    pub fallback_used: bool,
}

/// Candidate search over the vector index
pub struct CandidateSearch {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl CandidateSearch {
    /// Create a new candidate search
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Search for candidate dishes matching the rewritten query and
    /// constraints, returning at most `top_k` distinct dishes.
    pub async fn search(
        &self,
        rewritten_query: &str,
        constraints: &ConstraintSet,
        top_k: usize,
    ) -> Result<SearchOutcome> {
        // The embedding is computed once and shared by both attempts
        let embedding = self.embedder.embed(rewritten_query).await?;

        // An all-empty constraint set filters nothing, so a single
        // unconstrained attempt is observably identical to the filtered one
        if constraints.is_empty() {
            let chunks = self.index.search(&embedding, None, top_k).await?;
            return Ok(SearchOutcome {
                candidates: aggregate(chunks, top_k, true),
                fallback_used: false,
            });
        }

        let filtered = self
            .index
            .search(&embedding, Some(constraints), top_k)
            .await?;
        if !filtered.is_empty() {
            tracing::debug!(chunks = filtered.len(), "Filtered search succeeded");
            return Ok(SearchOutcome {
                candidates: aggregate(filtered, top_k, true),
                fallback_used: false,
            });
        }

        // Fallback triggers on empty results only, never on weak ones
        tracing::info!("Filtered search returned no dishes, falling back to semantic search");
        let unfiltered = self.index.search(&embedding, None, top_k).await?;
        Ok(SearchOutcome {
            candidates: aggregate(unfiltered, top_k, false),
            fallback_used: true,
        })
    }
}

/// Aggregate chunks by dish id, keeping each dish's best score.
///
/// Candidates are ordered by descending score with ties broken by ascending
/// dish id, and truncated to `top_k` distinct dishes.
fn aggregate(chunks: Vec<ScoredChunk>, top_k: usize, matched_filter: bool) -> Vec<Candidate> {
    let mut by_dish: BTreeMap<u32, Candidate> = BTreeMap::new();

    for chunk in chunks {
        let entry = by_dish
            .entry(chunk.metadata.dish_id)
            .or_insert_with(|| Candidate {
                dish_id: chunk.metadata.dish_id,
                dish_name: chunk.metadata.dish_name.clone(),
                score: chunk.score,
                chunk_ids: Vec::new(),
                matched_filter,
            });
        entry.score = entry.score.max(chunk.score);
        entry.chunk_ids.push(chunk.chunk_id);
    }

    let mut candidates: Vec<Candidate> = by_dish.into_values().collect();
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.dish_id.cmp(&b.dish_id))
    });
    candidates.truncate(top_k);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Dimension;
    use crate::index::MemoryIndex;
    use astromenu_common::embeddings::HashEmbedder;
    use astromenu_common::models::ChunkMetadata;

    const DIM: usize = 64;

    fn metadata(dish_id: u32, name: &str, restaurant: &str, ingredients: &[&str]) -> ChunkMetadata {
        ChunkMetadata {
            dish_id,
            dish_name: name.into(),
            restaurant: restaurant.into(),
            planet: Some("Pandora".into()),
            chef: Some("Zentharion".into()),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            techniques: vec![],
        }
    }

    async fn seeded_index(embedder: &HashEmbedder) -> MemoryIndex {
        let index = MemoryIndex::new();
        let dishes = [
            (1, "Nebula Risotto", "The Event Horizon", vec!["stardust rice"]),
            (2, "Plasma Tart", "The Event Horizon", vec!["nebula-root"]),
            (3, "Quantum Gnocchi", "Singularity Bistro", vec!["void flour"]),
        ];
        for (id, name, restaurant, ingredients) in dishes {
            let text = format!("{} served at {}", name, restaurant);
            let embedding = embedder.embed(&text).await.unwrap();
            index.insert(text, embedding, metadata(id, name, restaurant, &ingredients));
        }
        index
    }

    fn search_for(embedder: HashEmbedder, index: MemoryIndex) -> CandidateSearch {
        CandidateSearch::new(Arc::new(embedder), Arc::new(index))
    }

    #[tokio::test]
    async fn test_empty_constraints_behave_as_unconstrained() {
        let embedder = HashEmbedder::new(DIM);
        let index = seeded_index(&embedder).await;
        let search = search_for(HashEmbedder::new(DIM), index);

        let outcome = search
            .search("galactic dish", &ConstraintSet::default(), 10)
            .await
            .unwrap();

        assert!(!outcome.fallback_used);
        assert_eq!(outcome.candidates.len(), 3);
    }

    #[tokio::test]
    async fn test_excluded_values_never_returned() {
        let embedder = HashEmbedder::new(DIM);
        let index = seeded_index(&embedder).await;
        let search = search_for(HashEmbedder::new(DIM), index);

        let mut constraints = ConstraintSet::default();
        constraints.insert(Dimension::Ingredient, vec![], vec!["nebula-root".into()]);

        let outcome = search
            .search("galactic dish", &constraints, 10)
            .await
            .unwrap();

        assert!(!outcome.fallback_used);
        assert!(outcome.candidates.iter().all(|c| c.dish_id != 2));
        assert_eq!(outcome.candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_fallback_activates_only_on_zero_results() {
        let embedder = HashEmbedder::new(DIM);
        let index = seeded_index(&embedder).await;
        let search = search_for(HashEmbedder::new(DIM), index);

        // Misspelled restaurant matches no indexed metadata value
        let mut constraints = ConstraintSet::default();
        constraints.insert(
            Dimension::Restaurant,
            vec!["The Event Horizzon".into()],
            vec![],
        );

        let outcome = search
            .search("galactic dish", &constraints, 10)
            .await
            .unwrap();

        assert!(outcome.fallback_used);
        assert_eq!(outcome.candidates.len(), 3);
        assert!(outcome.candidates.iter().all(|c| !c.matched_filter));
    }

    #[tokio::test]
    async fn test_no_fallback_on_weak_but_nonzero_result() {
        let embedder = HashEmbedder::new(DIM);
        let index = seeded_index(&embedder).await;
        let search = search_for(HashEmbedder::new(DIM), index);

        let mut constraints = ConstraintSet::default();
        constraints.insert(
            Dimension::Restaurant,
            vec!["Singularity Bistro".into()],
            vec![],
        );

        let outcome = search
            .search("completely unrelated text", &constraints, 10)
            .await
            .unwrap();

        assert!(!outcome.fallback_used);
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].dish_id, 3);
    }

    #[tokio::test]
    async fn test_aggregates_chunks_by_dish_keeping_best_score() {
        let embedder = HashEmbedder::new(DIM);
        let index = MemoryIndex::new();
        // Two chunks for the same dish with different texts, hence scores
        for text in ["Nebula Risotto first course", "Nebula Risotto dessert"] {
            let embedding = embedder.embed(text).await.unwrap();
            index.insert(
                text,
                embedding,
                metadata(1, "Nebula Risotto", "The Event Horizon", &[]),
            );
        }
        let search = search_for(HashEmbedder::new(DIM), index);

        let outcome = search
            .search("Nebula Risotto first course", &ConstraintSet::default(), 10)
            .await
            .unwrap();

        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].chunk_ids.len(), 2);
        // Best score belongs to the exact-match chunk
        assert!(outcome.candidates[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_top_k_bounds_distinct_dishes() {
        let embedder = HashEmbedder::new(DIM);
        let index = seeded_index(&embedder).await;
        let search = search_for(HashEmbedder::new(DIM), index);

        let outcome = search
            .search("galactic dish", &ConstraintSet::default(), 2)
            .await
            .unwrap();
        assert_eq!(outcome.candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_query_is_deterministic_and_does_not_error() {
        let embedder = HashEmbedder::new(DIM);
        let index = seeded_index(&embedder).await;
        let search = search_for(HashEmbedder::new(DIM), index);

        let first = search.search("", &ConstraintSet::default(), 10).await.unwrap();
        let second = search.search("", &ConstraintSet::default(), 10).await.unwrap();

        let ids = |o: &SearchOutcome| o.candidates.iter().map(|c| c.dish_id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_score_ties_break_by_ascending_dish_id() {
        let embedder = HashEmbedder::new(DIM);
        let index = MemoryIndex::new();
        let embedding = embedder.embed("same text").await.unwrap();
        for id in [9, 4, 7] {
            index.insert(
                "same text",
                embedding.clone(),
                metadata(id, "Twin Dish", "The Event Horizon", &[]),
            );
        }
        let search = search_for(HashEmbedder::new(DIM), index);

        let outcome = search
            .search("same text", &ConstraintSet::default(), 10)
            .await
            .unwrap();
        let ids: Vec<u32> = outcome.candidates.iter().map(|c| c.dish_id).collect();
        assert_eq!(ids, vec![4, 7, 9]);
    }
}
