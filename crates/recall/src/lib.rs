//! Recall - Long-term conversational memory with LLM-driven consolidation
//!
//! This crate maintains a per-tenant store of atomic facts about a user.
//! After each conversation turn, facts are extracted by an LLM classifier
//! and consolidated one at a time against the most similar existing
//! memories: genuinely new facts are added, refinements update a record
//! in place, contradictions soft-invalidate the old record and add its
//! replacement, and redundant facts are dropped. Invalidation never
//! deletes; superseded facts remain queryable as history.

pub mod classifier;
pub mod config;
pub mod consolidator;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod store;
pub mod testing;

pub use classifier::{AnthropicClassifier, ConversationTurn, FactClassifier};
pub use config::Config;
pub use consolidator::{ConsolidationDecision, ConsolidationOutcome, Consolidator};
pub use error::RecallError;
pub use memory::MemoryRecord;
pub use store::{LanceStore, MemoryStore};
