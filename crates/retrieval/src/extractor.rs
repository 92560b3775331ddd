//! Constraint extraction from free-text questions
//!
//! Turns a question into a set of include/exclude categorical constraints
//! plus a rewritten query optimized for embedding search. Extraction never
//! fails the question: a service error or unparseable response degrades to
//! an empty constraint set and the original question, so search proceeds as
//! pure semantic search.

use crate::constraints::{ConstraintSet, Dimension};
use crate::prompts;
use astromenu_common::completion::CompletionClient;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Output of constraint extraction
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// Constraints over known attribute dimensions
    pub constraints: ConstraintSet,

    /// Query string optimized for semantic search (never empty unless the
    /// question itself is empty)
    pub rewritten_query: String,
}

/// Extracts structured filters and a search query from questions
pub struct ConstraintExtractor {
    completion: Arc<dyn CompletionClient>,
}

impl ConstraintExtractor {
    /// Create a new extractor backed by a completion client
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    /// Extract constraints and a rewritten query from a question.
    ///
    /// Idempotent for a deterministic completion configuration.
    pub async fn extract(&self, question: &str) -> Extraction {
        let prompt = prompts::extraction_prompt(question);

        let response = match self.completion.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Constraint extraction failed, degrading to pure semantic search"
                );
                return Extraction {
                    constraints: ConstraintSet::default(),
                    rewritten_query: question.to_string(),
                };
            }
        };

        match Self::parse_response(&response, question) {
            Some(extraction) => {
                tracing::debug!(
                    constrained_dimensions = extraction.constraints.len(),
                    rewritten_query = %extraction.rewritten_query,
                    "Extraction complete"
                );
                extraction
            }
            None => {
                tracing::warn!(
                    response = %response,
                    "Unparseable extraction response, degrading to pure semantic search"
                );
                Extraction {
                    constraints: ConstraintSet::default(),
                    rewritten_query: question.to_string(),
                }
            }
        }
    }

    /// Parse the completion response into an extraction.
    ///
    /// Tolerates fenced JSON, string values where arrays are expected, and
    /// nulls. Unknown fields are ignored; a blank rewritten query falls back
    /// to the original question.
    fn parse_response(response: &str, question: &str) -> Option<Extraction> {
        let cleaned = strip_code_fences(response);
        let value: Value = serde_json::from_str(&cleaned).ok()?;
        let object = value.as_object()?;

        let mut constraints = ConstraintSet::default();
        for dimension in Dimension::ALL {
            let (in_key, out_key) = extraction_keys(dimension);
            let include = object.get(in_key).map(coerce_values).unwrap_or_default();
            let exclude = object.get(out_key).map(coerce_values).unwrap_or_default();
            constraints.insert(dimension, include, exclude);
        }

        let rewritten_query = object
            .get("search_query")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(question)
            .to_string();

        Some(Extraction {
            constraints,
            rewritten_query,
        })
    }
}

/// Response field names for a dimension's include/exclude sides
fn extraction_keys(dimension: Dimension) -> (&'static str, &'static str) {
    match dimension {
        Dimension::Restaurant => ("restaurant_in", "restaurant_out"),
        Dimension::Planet => ("planet_in", "planet_out"),
        Dimension::Chef => ("chef_in", "chef_out"),
        Dimension::Ingredient => ("ingredients_in", "ingredients_out"),
        Dimension::Technique => ("techniques_in", "techniques_out"),
    }
}

/// Coerce a JSON value into a list of strings.
///
/// Accepts an array of strings, a bare string (possibly itself a serialized
/// JSON array), or null/anything else as empty.
fn coerce_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) => {
            if s.eq_ignore_ascii_case("null") {
                return vec![];
            }
            // Some models return the array as an escaped string
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(s) {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            } else {
                vec![s.clone()]
            }
        }
        _ => vec![],
    }
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use astromenu_common::completion::ScriptedCompletion;

    fn extractor(responses: Vec<&str>) -> ConstraintExtractor {
        ConstraintExtractor::new(Arc::new(ScriptedCompletion::new(responses)))
    }

    #[tokio::test]
    async fn test_extracts_constraints_and_query() {
        let response = r#"{
            "chef_in": ["Zentharion"],
            "ingredients_out": ["nebula-root"],
            "search_query": "dish without ingredient nebula-root"
        }"#;
        let extraction = extractor(vec![response])
            .extract("Show me dishes from Chef Zentharion that do not contain nebula-root")
            .await;

        let chef = extraction.constraints.get(Dimension::Chef).unwrap();
        assert!(chef.include().unwrap().contains("Zentharion"));
        let ingredient = extraction.constraints.get(Dimension::Ingredient).unwrap();
        assert!(ingredient.exclude().unwrap().contains("nebula-root"));
        assert_eq!(
            extraction.rewritten_query,
            "dish without ingredient nebula-root"
        );
    }

    #[tokio::test]
    async fn test_tolerates_fenced_json_and_string_values() {
        let response = "```json\n{\"ingredients_in\": \"comet broth\", \"search_query\": \"dish with ingredient comet broth\"}\n```";
        let extraction = extractor(vec![response])
            .extract("dishes with comet broth")
            .await;

        let ingredient = extraction.constraints.get(Dimension::Ingredient).unwrap();
        assert!(ingredient.include().unwrap().contains("comet broth"));
    }

    #[tokio::test]
    async fn test_string_encoded_array() {
        let response = r#"{"techniques_in": "[\"gravitational searing\"]", "search_query": "q"}"#;
        let extraction = extractor(vec![response]).extract("anything").await;
        let technique = extraction.constraints.get(Dimension::Technique).unwrap();
        assert!(technique.include().unwrap().contains("gravitational searing"));
    }

    #[tokio::test]
    async fn test_degrades_on_service_failure() {
        // Exhausted scripted client simulates a completion failure
        let extraction = extractor(vec![]).extract("any question").await;
        assert!(extraction.constraints.is_empty());
        assert_eq!(extraction.rewritten_query, "any question");
    }

    #[tokio::test]
    async fn test_degrades_on_unparseable_response() {
        let extraction = extractor(vec!["this is not json"])
            .extract("any question")
            .await;
        assert!(extraction.constraints.is_empty());
        assert_eq!(extraction.rewritten_query, "any question");
    }

    #[tokio::test]
    async fn test_blank_rewrite_falls_back_to_question() {
        let response = r#"{"search_query": "   "}"#;
        let extraction = extractor(vec![response]).extract("original question").await;
        assert_eq!(extraction.rewritten_query, "original question");
    }

    #[tokio::test]
    async fn test_idempotent_with_deterministic_responses() {
        let response = r#"{"planet_in": ["Asgard"], "search_query": "dish"}"#;
        let first = extractor(vec![response]).extract("dishes from Asgard").await;
        let second = extractor(vec![response]).extract("dishes from Asgard").await;
        assert_eq!(first.constraints, second.constraints);
        assert_eq!(first.rewritten_query, second.rewritten_query);
    }
}
