//! Qdrant REST client for nearest-neighbor search with payload filtering

use super::VectorIndex;
use crate::constraints::ConstraintSet;
use astromenu_common::config::IndexConfig;
use astromenu_common::errors::{AppError, Result};
use astromenu_common::models::{ChunkMetadata, ScoredChunk};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

/// Vector index backed by a Qdrant collection
pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl QdrantIndex {
    /// Create a new index client from configuration
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
        })
    }

    /// Build the Qdrant payload filter for a constraint set.
    ///
    /// Every dimension contributes to `must`/`must_not`: single-valued
    /// dimensions use one member-of condition for the include side, while
    /// list-valued dimensions get one condition per included value so that
    /// all of them are required. Returns None for an empty set.
    fn build_filter(constraints: &ConstraintSet) -> Option<Value> {
        let mut must = Vec::new();
        let mut must_not = Vec::new();

        for (dimension, filter) in constraints.iter() {
            let key = dimension.payload_key();

            if let Some(include) = filter.include() {
                if dimension.is_multi_valued() {
                    for value in include {
                        must.push(json!({ "key": key, "match": { "any": [value] } }));
                    }
                } else {
                    let values: Vec<&String> = include.iter().collect();
                    must.push(json!({ "key": key, "match": { "any": values } }));
                }
            }

            if let Some(exclude) = filter.exclude() {
                let values: Vec<&String> = exclude.iter().collect();
                must_not.push(json!({ "key": key, "match": { "any": values } }));
            }
        }

        if must.is_empty() && must_not.is_empty() {
            return None;
        }

        let mut filter = serde_json::Map::new();
        if !must.is_empty() {
            filter.insert("must".to_string(), Value::Array(must));
        }
        if !must_not.is_empty() {
            filter.insert("must_not".to_string(), Value::Array(must_not));
        }
        Some(Value::Object(filter))
    }

    fn parse_hit(hit: &Value) -> Result<ScoredChunk> {
        let payload = hit.get("payload").cloned().unwrap_or(Value::Null);

        let metadata: ChunkMetadata =
            serde_json::from_value(payload.clone()).map_err(|e| AppError::IndexError {
                message: format!("Malformed chunk payload: {}", e),
            })?;

        let content = payload
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let chunk_id = match hit.get("id") {
            Some(Value::String(s)) => Uuid::parse_str(s).unwrap_or_else(|_| Uuid::nil()),
            Some(Value::Number(n)) => Uuid::from_u128(n.as_u64().unwrap_or(0) as u128),
            _ => Uuid::nil(),
        };

        let score = hit
            .get("score")
            .and_then(Value::as_f64)
            .unwrap_or_default() as f32;

        Ok(ScoredChunk {
            chunk_id,
            content,
            score,
            metadata,
        })
    }
}

#[async_trait::async_trait]
impl VectorIndex for QdrantIndex {
    async fn search(
        &self,
        embedding: &[f32],
        filter: Option<&ConstraintSet>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );

        let mut body = json!({
            "vector": embedding,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(qdrant_filter) = filter.and_then(Self::build_filter) {
            body["filter"] = qdrant_filter;
        }

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::IndexUnavailable {
                message: format!("Index request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IndexError {
                message: format!("Index error {}: {}", status, body),
            });
        }

        let result: Value = response.json().await.map_err(|e| AppError::IndexError {
            message: format!("Failed to parse index response: {}", e),
        })?;

        let hits = result
            .get("result")
            .and_then(Value::as_array)
            .ok_or_else(|| AppError::IndexError {
                message: "Index response missing result array".to_string(),
            })?;

        let chunks = hits
            .iter()
            .map(Self::parse_hit)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            collection = %self.collection,
            filtered = filter.is_some(),
            hits = chunks.len(),
            "Index search complete"
        );

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Dimension;

    #[test]
    fn test_build_filter_empty_set_is_none() {
        let constraints = ConstraintSet::default();
        assert!(QdrantIndex::build_filter(&constraints).is_none());
    }

    #[test]
    fn test_build_filter_include_and_exclude() {
        let mut constraints = ConstraintSet::default();
        constraints.insert(Dimension::Chef, vec!["Zentharion".into()], vec![]);
        constraints.insert(
            Dimension::Ingredient,
            vec!["stardust rice".into(), "comet broth".into()],
            vec!["nebula-root".into()],
        );

        let filter = QdrantIndex::build_filter(&constraints).unwrap();
        let must = filter["must"].as_array().unwrap();
        let must_not = filter["must_not"].as_array().unwrap();

        // One member-of condition for chef, one per required ingredient
        assert_eq!(must.len(), 3);
        assert_eq!(must_not.len(), 1);
        assert_eq!(must_not[0]["key"], "ingredients");
        assert_eq!(must_not[0]["match"]["any"][0], "nebula-root");
    }

    #[test]
    fn test_parse_hit() {
        let hit = json!({
            "id": "9f2c84e3-98f1-4a51-b7b4-7a915f6c1e01",
            "score": 0.87,
            "payload": {
                "dish_id": 12,
                "dish_name": "Nebula Risotto",
                "restaurant": "The Event Horizon",
                "planet": "Pandora",
                "chef": "Zentharion",
                "ingredients": ["stardust rice"],
                "techniques": ["gravitational searing"],
                "content": "A risotto stirred at the edge of a black hole."
            }
        });

        let chunk = QdrantIndex::parse_hit(&hit).unwrap();
        assert_eq!(chunk.metadata.dish_id, 12);
        assert_eq!(chunk.score, 0.87);
        assert!(chunk.content.starts_with("A risotto"));
    }

    #[test]
    fn test_parse_hit_rejects_malformed_payload() {
        let hit = json!({ "id": 1, "score": 0.5, "payload": { "dish_name": "No id" } });
        assert!(QdrantIndex::parse_hit(&hit).is_err());
    }
}
