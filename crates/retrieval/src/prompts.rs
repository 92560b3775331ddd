//! Fixed prompt templates for the completion service
//!
//! Both templates are stable across calls so that a deterministic service
//! configuration yields reproducible extractions and verifications.

/// Planets known to the knowledge base.
///
/// Planet extraction is constrained to this closed list; anything else is
/// omitted rather than guessed.
pub const KNOWN_PLANETS: [&str; 10] = [
    "Pandora",
    "Ego",
    "Cybertron",
    "Montressor",
    "Krypton",
    "Namecc",
    "Klyntar",
    "Asgard",
    "Tatooine",
    "Arrakis",
];

/// Prompt asking the model to extract categorical constraints and a
/// rewritten query from a question, as a single JSON object.
pub fn extraction_prompt(question: &str) -> String {
    let planets = KNOWN_PLANETS.join(", ");
    format!(
        r#"Analyze the following question about dishes and identify any explicit, precise filters.
Return a JSON object with this exact structure:
{{
    "restaurant_in": ["restaurant names that MUST match, if mentioned explicitly"] or null,
    "restaurant_out": ["restaurant names that must NOT match"] or null,
    "planet_in": ["planet names, only if mentioned explicitly and present in this list: {planets}"] or null,
    "planet_out": ["planet names that must NOT match, from the same list"] or null,
    "chef_in": ["chef names that MUST match, if mentioned explicitly"] or null,
    "chef_out": ["chef names that must NOT match"] or null,
    "ingredients_in": ["ingredients that MUST be present"] or null,
    "ingredients_out": ["ingredients that must NOT be present"] or null,
    "techniques_in": ["techniques that MUST be used"] or null,
    "techniques_out": ["techniques that must NOT be used"] or null,
    "search_query": "a short query optimized for semantic search"
}}

IMPORTANT:
- Extract names ONLY if they are mentioned explicitly and precisely in the question.
- Copy names exactly as written, including special characters.
- For the IN side look for phrases like "with", "using", "that contains", "prepared by", "served at", "from".
- For the OUT side look for phrases like "without", "does not contain", "not using", "excluding", "not from".
- A name mentioned with no explicit inclusion/exclusion cue goes on the IN side.
- Omit anything ambiguous: a field with no precise match must be null.
- The search_query keeps the mentioned ingredient and technique names plus the words
  "dish", "ingredient" or "technique" for context, and drops everything else.
  Examples: "dish with ingredient X", "dish using technique Y".

Question: "{question}"

Return ONLY the JSON, with no other text."#,
    )
}

/// Prompt asking the model to verify which candidate dishes genuinely
/// satisfy the literal conditions of the question.
pub fn verification_prompt(question: &str, candidates_json: &str) -> String {
    format!(
        r#"You are a rigorous culinary judge. Your task is to select the dishes that EXACTLY satisfy the user's request.
Analyze the question for the relevant conditions:
- Planet
- Restaurant
- Chef
- Ingredients
- Techniques

User question: "{question}"

IMPORTANT:
- If the question names a specific planet, keep only dishes with that planet.
- If the question names a specific restaurant, keep only dishes with that restaurant.
- If the question names a specific chef, keep only dishes with that chef.
- If the question requires an ingredient (e.g. "with X", "that contains X"), the EXACT ingredient must appear in the dish's ingredient list; ignore surrounding prose.
- If the question forbids an ingredient (e.g. "without X"), that ingredient must NOT appear in the dish's ingredient list.
- If the question requires a technique (e.g. "using Y"), the EXACT technique must appear in the dish's technique list.
- If the question forbids a technique (e.g. "without technique Y"), that technique must NOT appear in the dish's technique list.
- Judge strictly from the structured attributes and description below; do not invent dishes.

Candidate dishes (with planet, restaurant, chef, ingredients, techniques and description):
{candidates_json}

Task: return a JSON array of strings containing ONLY the names of the dishes that EXACTLY satisfy the request.
If no dish satisfies the request, return an empty array [].

Output format: ["Dish Name A", "Dish Name B"]"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_embeds_question_and_planets() {
        let prompt = extraction_prompt("dishes from Asgard");
        assert!(prompt.contains("dishes from Asgard"));
        assert!(prompt.contains("Asgard, Tatooine"));
        assert!(prompt.contains("search_query"));
    }

    #[test]
    fn test_verification_prompt_embeds_candidates() {
        let prompt = verification_prompt("dishes without nebula-root", "[{\"name\":\"X\"}]");
        assert!(prompt.contains("dishes without nebula-root"));
        assert!(prompt.contains("[{\"name\":\"X\"}]"));
    }
}
