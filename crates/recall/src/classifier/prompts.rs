//! Prompts for LLM-based fact extraction and consolidation
//!
//! Templates are rendered with simple placeholder replacement. Both
//! prompts demand JSON-only responses matching the wire types in
//! `classifier::types`.

use crate::memory::MemoryRecord;

/// Extraction prompt turning one exchange into atomic fact strings
///
/// Placeholders: {memories_text}, {user_message}, {assistant_response}
pub const EXTRACTION_PROMPT: &str = r#"Existing memories: {memories_text}

New exchange:
User: {user_message}
Assistant: {assistant_response}

Extract NEW or CHANGED facts not already accurately captured in existing memories.

- NEW: Information not in existing memories
- CHANGED: Updates or contradictions to existing memories
- SKIP: Information already accurately captured

Extract: preferences, personal facts, plans
Ignore: greetings, questions, general knowledge

IMPORTANT: Each fact must be atomic - one complete idea per fact.
Break compound statements into separate facts.

Examples:
Good: ["User is vegetarian", "User lives in Berlin"]
Bad: ["User is vegetarian and lives in Berlin"]

Respond with ONLY a JSON object in this exact format:
{"facts": ["fact1", "fact2"]}"#;

/// Consolidation prompt choosing how a fact relates to existing memories
///
/// Placeholders: {fact}, {existing_memories}
pub const CONSOLIDATION_PROMPT: &str = r#"New fact: {fact}
Existing memories: {existing_memories}

Choose one action:
- ADD: Completely new information not related to existing memories
- UPDATE: Refines or adds detail to existing memory without contradicting it
- INVALIDATE: Contradicts existing memory (old info is now false/outdated)
- NOOP: Information already accurately captured

For UPDATE: provide updated_content and target_id
For INVALIDATE: provide target_id (old memory will be marked invalid, new fact added)

Always explain your reasoning for the chosen action. Be succinct when possible.

Respond with ONLY a JSON object in this exact format:
{"action": "ADD|UPDATE|INVALIDATE|NOOP", "reasoning": "...", "target_id": "...", "updated_content": "..."}"#;

/// Serialize candidate records for the consolidation prompt.
///
/// Only id and content are shown to the classifier; timestamps would
/// invite it to reason about recency the store already ranked by.
pub fn candidate_context(candidates: &[MemoryRecord]) -> String {
    let entries: Vec<serde_json::Value> = candidates
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id.to_string(),
                "content": r.content,
            })
        })
        .collect();

    serde_json::Value::Array(entries).to_string()
}
