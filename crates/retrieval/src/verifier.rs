//! Final verification pass over candidate dishes
//!
//! Embedding similarity and coarse metadata filters both admit false
//! positives; this stage asks the completion service to judge each candidate
//! against the literal question, strictly from the dish's structured
//! attributes and description. Output is always a subset of the input
//! candidates. Failures reject conservatively: precision is favored over
//! recall here.

use crate::prompts;
use crate::search::Candidate;
use astromenu_common::catalog::DishCatalog;
use astromenu_common::completion::CompletionClient;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Verifies candidates against the original question
pub struct CandidateVerifier {
    completion: Arc<dyn CompletionClient>,
    catalog: Arc<DishCatalog>,
}

impl CandidateVerifier {
    /// Create a new verifier
    pub fn new(completion: Arc<dyn CompletionClient>, catalog: Arc<DishCatalog>) -> Self {
        Self {
            completion,
            catalog,
        }
    }

    /// Verify candidates against the original (non-rewritten) question,
    /// returning the confirmed dish ids.
    ///
    /// An empty candidate set short-circuits without a service call.
    pub async fn verify(&self, question: &str, candidates: &[Candidate]) -> BTreeSet<u32> {
        if candidates.is_empty() {
            return BTreeSet::new();
        }

        let candidate_ids: BTreeSet<u32> = candidates.iter().map(|c| c.dish_id).collect();
        let payload = self.candidate_payload(candidates);
        if payload.is_empty() {
            tracing::warn!("No candidate resolved to a catalog record, rejecting all");
            return BTreeSet::new();
        }

        let candidates_json = match serde_json::to_string_pretty(&payload) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize candidates, rejecting all");
                return BTreeSet::new();
            }
        };

        let prompt = prompts::verification_prompt(question, &candidates_json);
        let response = match self.completion.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    candidates = candidates.len(),
                    "Verification call failed, conservatively rejecting all candidates"
                );
                return BTreeSet::new();
            }
        };

        let confirmed_names = match parse_names(&response) {
            Some(names) => names,
            None => {
                tracing::warn!(
                    response = %response,
                    "Unparseable verification response, conservatively rejecting all candidates"
                );
                return BTreeSet::new();
            }
        };

        // Resolve names through the catalog and intersect with the input
        // set; verification can never introduce an identifier
        let mut verified = BTreeSet::new();
        for name in &confirmed_names {
            match self.catalog.id_for_name(name) {
                Some(id) if candidate_ids.contains(&id) => {
                    verified.insert(id);
                }
                Some(id) => {
                    tracing::warn!(
                        name = %name,
                        id,
                        "Verifier confirmed a dish outside the candidate set, dropping"
                    );
                }
                None => {
                    tracing::warn!(name = %name, "Verifier returned an unmapped dish name, dropping");
                }
            }
        }

        tracing::debug!(
            candidates = candidates.len(),
            verified = verified.len(),
            "Verification complete"
        );
        verified
    }

    /// Build the structured records presented to the completion service.
    ///
    /// Candidates missing from the catalog cannot be judged and are dropped
    /// (conservative rejection).
    fn candidate_payload(&self, candidates: &[Candidate]) -> Vec<Value> {
        // Dedupe by id while preserving the ranked candidate order
        let mut seen = HashMap::new();
        candidates
            .iter()
            .filter(|c| seen.insert(c.dish_id, ()).is_none())
            .filter_map(|candidate| match self.catalog.get(candidate.dish_id) {
                Some(dish) => Some(json!({
                    "name": dish.name,
                    "planet": dish.planet,
                    "restaurant": dish.restaurant,
                    "chef": dish.chef,
                    "ingredients": dish.ingredients,
                    "techniques": dish.techniques,
                    "description": dish.description,
                })),
                None => {
                    tracing::warn!(
                        dish_id = candidate.dish_id,
                        "Candidate missing from catalog, rejecting"
                    );
                    None
                }
            })
            .collect()
    }
}

/// Parse the verification response into confirmed dish names
fn parse_names(response: &str) -> Option<Vec<String>> {
    let cleaned = response
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();
    let value: Value = serde_json::from_str(&cleaned).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}
