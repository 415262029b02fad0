//! Classifier module for LLM-driven memory decisions
//!
//! The classifier turns a conversation exchange into atomic facts and
//! relates each fact to existing memories, returning a structured
//! decision the consolidator validates and applies.

pub mod anthropic;
pub mod prompts;
pub mod types;

use async_trait::async_trait;

use crate::memory::MemoryRecord;

pub use anthropic::AnthropicClassifier;
pub use types::{ClassifierDecision, ClassifierError, ConversationTurn, DecisionAction};

/// Trait for fact classifiers (remote LLM APIs, scripted test doubles)
///
/// Implementations own the request/response contract with the language
/// model; callers only ever see parsed, schema-checked structures. Output
/// that fails to parse is a `ClassifierError::ContractViolation`.
#[async_trait]
pub trait FactClassifier: Send + Sync {
    /// Extract zero or more atomic fact strings from a conversation turn
    async fn extract_facts(&self, turn: &ConversationTurn) -> types::Result<Vec<String>>;

    /// Decide how a fact relates to the supplied candidate memories
    ///
    /// The returned decision is unvalidated wire data; in particular its
    /// `target_id` may not name any supplied candidate.
    async fn classify_fact(
        &self,
        fact: &str,
        candidates: &[MemoryRecord],
    ) -> types::Result<ClassifierDecision>;

    /// Classifier name for logging
    fn name(&self) -> &'static str;
}
