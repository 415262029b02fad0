//! Memory consolidation
//!
//! For each atomic fact extracted from a conversation turn, decide how
//! it relates to existing memory (ADD, UPDATE, INVALIDATE, or NOOP) and
//! apply that decision to the store. The classifier proposes, the
//! consolidator validates and executes: a decision naming a target
//! outside the supplied candidate set is rejected before any write.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::classifier::{ClassifierDecision, ConversationTurn, DecisionAction, FactClassifier};
use crate::error::{RecallError, Result};
use crate::memory::MemoryRecord;
use crate::store::MemoryStore;

/// Default number of similar records offered to the classifier per fact
pub const DEFAULT_CANDIDATE_LIMIT: usize = 10;

/// A validated consolidation decision, ready to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsolidationDecision {
    /// Insert a new active record carrying the fact
    Add { fact: String },
    /// Replace an existing record's content
    Update {
        target_id: Uuid,
        updated_content: String,
    },
    /// Soft-delete an existing record and insert its replacement
    Invalidate { target_id: Uuid, replacement: String },
    /// The fact is already accurately captured
    Noop,
}

/// Result of consolidating one fact
#[derive(Debug, Clone)]
pub struct ConsolidationOutcome {
    /// The decision that was applied
    pub decision: ConsolidationDecision,
    /// The classifier's rationale
    pub reasoning: String,
}

/// Applies classifier decisions to a tenant's memory store
///
/// Both collaborators are injected; the consolidator holds no global
/// state and owns no connections of its own.
pub struct Consolidator {
    store: Arc<dyn MemoryStore>,
    classifier: Arc<dyn FactClassifier>,
    candidate_limit: usize,
}

impl Consolidator {
    pub fn new(store: Arc<dyn MemoryStore>, classifier: Arc<dyn FactClassifier>) -> Self {
        Self {
            store,
            classifier,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }

    /// Override how many similar records the classifier sees per fact
    pub fn with_candidate_limit(mut self, candidate_limit: usize) -> Self {
        self.candidate_limit = candidate_limit;
        self
    }

    /// Consolidate one fact against the supplied candidate records.
    ///
    /// Classifies the fact, validates the decision against `candidates`,
    /// then applies it. On `MalformedDecision` or a classifier contract
    /// violation no store mutation happens for this fact.
    pub async fn consolidate(
        &self,
        tenant: &str,
        fact: &str,
        candidates: &[MemoryRecord],
    ) -> Result<ConsolidationOutcome> {
        let raw = self.classifier.classify_fact(fact, candidates).await?;
        debug!(
            action = ?raw.action,
            classifier = self.classifier.name(),
            "Classified fact"
        );

        let decision = resolve_decision(fact, candidates, &raw)?;
        self.apply(tenant, &decision).await?;

        info!(tenant, decision = ?decision, "Applied consolidation decision");
        Ok(ConsolidationOutcome {
            decision,
            reasoning: raw.reasoning,
        })
    }

    /// Consolidate one fact, searching the store for its candidates first
    pub async fn consolidate_fact(&self, tenant: &str, fact: &str) -> Result<ConsolidationOutcome> {
        let candidates = self
            .store
            .search(tenant, fact, self.candidate_limit, true)
            .await?;
        self.consolidate(tenant, fact, &candidates).await
    }

    /// Extract facts from a conversation turn and consolidate each in order.
    ///
    /// Facts are processed sequentially so a later fact's candidate
    /// search sees the effects of an earlier fact's mutation; two
    /// near-duplicate facts in one turn must not both ADD. If
    /// consolidation fails on the Nth fact, the first N-1 remain
    /// committed; there is no rollback.
    pub async fn consolidate_turn(
        &self,
        tenant: &str,
        turn: &ConversationTurn,
    ) -> Result<Vec<ConsolidationOutcome>> {
        let facts = self.classifier.extract_facts(turn).await?;
        if facts.is_empty() {
            debug!(tenant, "No facts extracted, skipping consolidation");
            return Ok(Vec::new());
        }

        info!(tenant, count = facts.len(), "Extracted facts");

        let mut outcomes = Vec::with_capacity(facts.len());
        for fact in &facts {
            let fact = fact.trim();
            if fact.is_empty() {
                continue;
            }
            outcomes.push(self.consolidate_fact(tenant, fact).await?);
        }

        Ok(outcomes)
    }

    async fn apply(&self, tenant: &str, decision: &ConsolidationDecision) -> Result<()> {
        match decision {
            ConsolidationDecision::Add { fact } => {
                self.store.insert(tenant, fact).await?;
            }
            ConsolidationDecision::Update {
                target_id,
                updated_content,
            } => {
                self.store
                    .update_content(tenant, *target_id, updated_content)
                    .await?;
            }
            ConsolidationDecision::Invalidate {
                target_id,
                replacement,
            } => {
                // Two independent writes; a crash in between leaves the
                // invalidated record without its replacement.
                self.store.invalidate(tenant, *target_id, Utc::now()).await?;
                self.store.insert(tenant, replacement).await?;
            }
            ConsolidationDecision::Noop => {}
        }
        Ok(())
    }
}

/// Validate a raw classifier decision against the candidate set.
///
/// UPDATE and INVALIDATE must name one of the supplied candidates; the
/// consolidator never guesses a target. UPDATE additionally requires
/// non-empty replacement content.
fn resolve_decision(
    fact: &str,
    candidates: &[MemoryRecord],
    raw: &ClassifierDecision,
) -> Result<ConsolidationDecision> {
    match raw.action {
        DecisionAction::Add => Ok(ConsolidationDecision::Add {
            fact: fact.to_string(),
        }),
        DecisionAction::Noop => Ok(ConsolidationDecision::Noop),
        DecisionAction::Update => {
            let target_id = resolve_target(candidates, raw.target_id.as_deref())?;
            let updated_content = raw
                .updated_content
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| {
                    RecallError::MalformedDecision(
                        "UPDATE decision is missing updated_content".to_string(),
                    )
                })?;

            Ok(ConsolidationDecision::Update {
                target_id,
                updated_content: updated_content.to_string(),
            })
        }
        DecisionAction::Invalidate => {
            let target_id = resolve_target(candidates, raw.target_id.as_deref())?;
            Ok(ConsolidationDecision::Invalidate {
                target_id,
                replacement: fact.to_string(),
            })
        }
    }
}

/// Match a claimed target id against the candidate set
fn resolve_target(candidates: &[MemoryRecord], target_id: Option<&str>) -> Result<Uuid> {
    let claimed = target_id.ok_or_else(|| {
        RecallError::MalformedDecision("Decision requires a target_id but none was given".to_string())
    })?;

    candidates
        .iter()
        .map(|c| c.id)
        .find(|id| id.to_string() == claimed)
        .ok_or_else(|| {
            RecallError::MalformedDecision(format!(
                "target_id '{claimed}' is not among the {} supplied candidates",
                candidates.len()
            ))
        })
}
