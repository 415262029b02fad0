//! Classifier types for fact extraction and consolidation decisions
//!
//! Defines the wire-level decision structure returned by the LLM
//! classifier, the conversation turn it analyzes, and classifier errors.

use serde::{Deserialize, Serialize};

/// One conversation exchange plus the memory context it was answered with
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    /// What the user said
    pub user_message: String,
    /// What the assistant answered
    pub assistant_response: String,
    /// Memories that were in context for this exchange, pre-rendered as text
    pub memories_text: String,
}

impl ConversationTurn {
    pub fn new(user_message: String, assistant_response: String, memories_text: String) -> Self {
        Self {
            user_message,
            assistant_response,
            memories_text,
        }
    }
}

/// Action the classifier chose for a fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionAction {
    /// Completely new information
    Add,
    /// Refines an existing memory without contradicting it
    Update,
    /// Contradicts an existing memory, which must be superseded
    Invalidate,
    /// Already accurately captured
    Noop,
}

/// Structured decision as returned by the classifier.
///
/// This is the raw wire shape, validated immediately on receipt. The
/// target id stays a plain string here: whether it names one of the
/// supplied candidates is the consolidator's call, not a parse concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierDecision {
    /// Chosen action
    pub action: DecisionAction,
    /// Human-readable rationale for the action
    pub reasoning: String,
    /// Candidate record id, required for UPDATE and INVALIDATE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// Replacement content, required for UPDATE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_content: Option<String>,
}

/// Classifier-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Contract violation: {0}")]
    ContractViolation(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for classifier operations
pub type Result<T> = std::result::Result<T, ClassifierError>;
