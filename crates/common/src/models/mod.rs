//! Core data models for the AstroMenu retrieval system

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A dish record from the knowledge base.
///
/// Immutable once ingested; the pipeline references dishes by id only and
/// fetches the full record through the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    /// Stable unique identifier
    pub id: u32,

    /// Dish name
    pub name: String,

    /// Restaurant serving the dish
    pub restaurant: String,

    /// Planet the restaurant is located on
    pub planet: Option<String>,

    /// Chef who prepares the dish
    pub chef: Option<String>,

    /// Ordered list of ingredients
    #[serde(default)]
    pub ingredients: Vec<String>,

    /// Ordered list of preparation techniques
    #[serde(default)]
    pub techniques: Vec<String>,

    /// Free-text description
    pub description: Option<String>,
}

/// Categorical metadata copied onto every chunk in the vector index.
///
/// Many chunks may carry the same `dish_id`; the pipeline aggregates them
/// back to distinct dishes after search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub dish_id: u32,
    pub dish_name: String,
    pub restaurant: String,
    pub planet: Option<String>,
    pub chef: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub techniques: Vec<String>,
}

impl ChunkMetadata {
    /// Build chunk metadata from a dish record
    pub fn from_dish(dish: &Dish) -> Self {
        Self {
            dish_id: dish.id,
            dish_name: dish.name.clone(),
            restaurant: dish.restaurant.clone(),
            planet: dish.planet.clone(),
            chef: dish.chef.clone(),
            ingredients: dish.ingredients.clone(),
            techniques: dish.techniques.clone(),
        }
    }
}

/// A chunk returned by the vector index with its similarity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Chunk ID
    pub chunk_id: Uuid,

    /// Chunk content
    pub content: String,

    /// Similarity score (higher is more similar)
    pub score: f32,

    /// Copied dish metadata
    pub metadata: ChunkMetadata,
}

/// A question record from the batch input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Row identifier for batch processing
    pub row_id: u32,

    /// Question text
    pub question: String,

    /// Optional difficulty label (Easy, Medium, Hard, Impossible)
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// A result record, the sole persisted output per question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Row identifier from the input
    pub row_id: u32,

    /// Comma-joined verified dish ids, ascending
    pub result: String,
}

impl ResultRecord {
    /// Build a result record from a set of verified dish ids.
    ///
    /// Ids are emitted ascending and deduplicated for determinism.
    pub fn from_ids(row_id: u32, ids: impl IntoIterator<Item = u32>) -> Self {
        let mut ids: Vec<u32> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self {
            row_id,
            result: ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_record_orders_and_dedups() {
        let record = ResultRecord::from_ids(7, vec![42, 3, 42, 17]);
        assert_eq!(record.row_id, 7);
        assert_eq!(record.result, "3,17,42");
    }

    #[test]
    fn test_result_record_empty() {
        let record = ResultRecord::from_ids(1, vec![]);
        assert_eq!(record.result, "");
    }

    #[test]
    fn test_chunk_metadata_from_dish() {
        let dish = Dish {
            id: 9,
            name: "Nebula Risotto".into(),
            restaurant: "The Event Horizon".into(),
            planet: Some("Pandora".into()),
            chef: Some("Zentharion".into()),
            ingredients: vec!["stardust rice".into()],
            techniques: vec!["gravitational searing".into()],
            description: None,
        };
        let meta = ChunkMetadata::from_dish(&dish);
        assert_eq!(meta.dish_id, 9);
        assert_eq!(meta.chef.as_deref(), Some("Zentharion"));
    }
}
