//! In-memory vector index for tests
//!
//! Brute-force cosine similarity over in-process chunks, evaluating the
//! constraint set directly against chunk metadata. Deterministic: ties are
//! broken by chunk id.

use super::VectorIndex;
use crate::constraints::ConstraintSet;
use astromenu_common::errors::Result;
use astromenu_common::models::{ChunkMetadata, ScoredChunk};
use std::sync::RwLock;
use uuid::Uuid;

struct StoredChunk {
    id: Uuid,
    content: String,
    embedding: Vec<f32>,
    metadata: ChunkMetadata,
}

/// In-process vector index
#[derive(Default)]
pub struct MemoryIndex {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a chunk, returning its id
    pub fn insert(
        &self,
        content: impl Into<String>,
        embedding: Vec<f32>,
        metadata: ChunkMetadata,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.chunks
            .write()
            .expect("memory index lock poisoned")
            .push(StoredChunk {
                id,
                content: content.into(),
                embedding,
                metadata,
            });
        id
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.chunks.read().expect("memory index lock poisoned").len()
    }

    /// Whether the index holds no chunks
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait::async_trait]
impl VectorIndex for MemoryIndex {
    async fn search(
        &self,
        embedding: &[f32],
        filter: Option<&ConstraintSet>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let chunks = self.chunks.read().expect("memory index lock poisoned");

        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .filter(|chunk| match filter {
                Some(constraints) => constraints.matches(&chunk.metadata),
                None => true,
            })
            .map(|chunk| ScoredChunk {
                chunk_id: chunk.id,
                content: chunk.content.clone(),
                score: cosine_similarity(embedding, &chunk.embedding),
                metadata: chunk.metadata.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        scored.truncate(limit);

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Dimension;

    fn metadata(dish_id: u32, planet: &str) -> ChunkMetadata {
        ChunkMetadata {
            dish_id,
            dish_name: format!("Dish {}", dish_id),
            restaurant: "The Event Horizon".into(),
            planet: Some(planet.into()),
            chef: None,
            ingredients: vec![],
            techniques: vec![],
        }
    }

    #[tokio::test]
    async fn test_ranks_by_similarity() {
        let index = MemoryIndex::new();
        index.insert("far", vec![0.0, 1.0], metadata(1, "Asgard"));
        index.insert("near", vec![1.0, 0.0], metadata(2, "Asgard"));

        let results = index.search(&[1.0, 0.0], None, 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata.dish_id, 2);
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_filter_restricts_results() {
        let index = MemoryIndex::new();
        index.insert("a", vec![1.0, 0.0], metadata(1, "Asgard"));
        index.insert("b", vec![1.0, 0.0], metadata(2, "Krypton"));

        let mut constraints = ConstraintSet::default();
        constraints.insert(Dimension::Planet, vec!["Krypton".into()], vec![]);

        let results = index
            .search(&[1.0, 0.0], Some(&constraints), 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.dish_id, 2);
    }

    #[tokio::test]
    async fn test_limit_applies_after_filtering() {
        let index = MemoryIndex::new();
        for i in 0..5 {
            index.insert("c", vec![1.0, 0.0], metadata(i, "Asgard"));
        }
        let results = index.search(&[1.0, 0.0], None, 3).await.unwrap();
        assert_eq!(results.len(), 3);
    }
}
