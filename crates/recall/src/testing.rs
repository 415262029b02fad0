//! Test utilities for recall - mocks and in-memory doubles
//!
//! Provides fast, deterministic stand-ins for the three external
//! collaborators: the embedding model, the memory store, and the LLM
//! classifier.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::classifier::types::{ClassifierDecision, ClassifierError, ConversationTurn};
use crate::classifier::{DecisionAction, FactClassifier};
use crate::embedding::{EMBEDDING_DIMENSION, EmbeddingProvider};
use crate::error::{RecallError, Result};
use crate::memory::MemoryRecord;
use crate::store::MemoryStore;

/// Mock embedding model for tests that don't need real ML.
/// Produces deterministic vectors based on input text hash.
#[derive(Debug, Clone, Default)]
pub struct MockEmbeddingModel;

impl MockEmbeddingModel {
    pub fn new() -> Self {
        Self
    }
}

impl EmbeddingProvider for MockEmbeddingModel {
    /// Generate a deterministic "embedding" from text using hashing.
    /// Values land in [-1, 1]; equal texts get equal vectors.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        Ok((0..EMBEDDING_DIMENSION)
            .map(|i| {
                let x = seed
                    .wrapping_mul(i as u64 + 1)
                    .wrapping_add(0x9e3779b97f4a7c15);
                let normalized = (x as f32) / (u64::MAX as f32);
                (normalized * 2.0) - 1.0
            })
            .collect())
    }
}

/// HashMap-backed memory store with naive token-overlap ranking.
///
/// Implements the full MemoryStore contract including tenant isolation
/// and soft invalidation, so consolidator tests exercise real store
/// semantics without a database on disk.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, Vec<MemoryRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn overlap_score(query: &str, content: &str) -> usize {
        let query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        content
            .to_lowercase()
            .split_whitespace()
            .filter(|w| query_words.iter().any(|q| q == w))
            .count()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn search(
        &self,
        tenant: &str,
        query: &str,
        limit: usize,
        active_only: bool,
    ) -> Result<Vec<MemoryRecord>> {
        let records = self.records.lock().expect("store lock poisoned");

        let mut matches: Vec<(usize, MemoryRecord)> = records
            .get(tenant)
            .map(|tenant_records| {
                tenant_records
                    .iter()
                    .filter(|r| !active_only || r.is_active())
                    .map(|r| (Self::overlap_score(query, &r.content), r.clone()))
                    .collect()
            })
            .unwrap_or_default();

        matches.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.updated_at.cmp(&a.1.updated_at)));
        matches.truncate(limit);

        Ok(matches.into_iter().map(|(_, r)| r).collect())
    }

    async fn insert(&self, tenant: &str, content: &str) -> Result<MemoryRecord> {
        let record = MemoryRecord::new(content.to_string());
        let mut records = self.records.lock().expect("store lock poisoned");
        records
            .entry(tenant.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update_content(&self, tenant: &str, id: Uuid, content: &str) -> Result<()> {
        let mut records = self.records.lock().expect("store lock poisoned");
        let record = records
            .get_mut(tenant)
            .and_then(|tenant_records| tenant_records.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| RecallError::Storage(format!("Record not found: {id}")))?;

        record.content = content.to_string();
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn invalidate(&self, tenant: &str, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut records = self.records.lock().expect("store lock poisoned");
        let record = records
            .get_mut(tenant)
            .and_then(|tenant_records| {
                tenant_records
                    .iter_mut()
                    .find(|r| r.id == id && r.is_active())
            })
            .ok_or_else(|| RecallError::Storage(format!("Active record not found: {id}")))?;

        record.invalidation_time = Some(at);
        record.updated_at = at;
        Ok(())
    }

    async fn get(&self, tenant: &str, id: Uuid) -> Result<Option<MemoryRecord>> {
        let records = self.records.lock().expect("store lock poisoned");
        Ok(records
            .get(tenant)
            .and_then(|tenant_records| tenant_records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn list(&self, tenant: &str, active: bool, limit: usize) -> Result<Vec<MemoryRecord>> {
        let records = self.records.lock().expect("store lock poisoned");
        Ok(records
            .get(tenant)
            .map(|tenant_records| {
                tenant_records
                    .iter()
                    .filter(|r| r.is_active() == active)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Scripted classifier replaying queued extractions and decisions.
///
/// Records the candidate contents shown to each classify call so tests
/// can assert what the consolidator searched for.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    facts: Mutex<VecDeque<Vec<String>>>,
    decisions: Mutex<VecDeque<ClassifierDecision>>,
    seen_candidates: Mutex<Vec<Vec<String>>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the fact list returned by the next extract_facts call
    pub fn push_facts(&self, facts: &[&str]) {
        self.facts
            .lock()
            .expect("facts lock poisoned")
            .push_back(facts.iter().map(|f| f.to_string()).collect());
    }

    /// Queue the decision returned by the next classify_fact call
    pub fn push_decision(&self, decision: ClassifierDecision) {
        self.decisions
            .lock()
            .expect("decisions lock poisoned")
            .push_back(decision);
    }

    /// Candidate contents shown to each classify_fact call, in order
    pub fn seen_candidates(&self) -> Vec<Vec<String>> {
        self.seen_candidates
            .lock()
            .expect("candidates lock poisoned")
            .clone()
    }
}

#[async_trait]
impl FactClassifier for ScriptedClassifier {
    async fn extract_facts(
        &self,
        _turn: &ConversationTurn,
    ) -> std::result::Result<Vec<String>, ClassifierError> {
        Ok(self
            .facts
            .lock()
            .expect("facts lock poisoned")
            .pop_front()
            .unwrap_or_default())
    }

    async fn classify_fact(
        &self,
        _fact: &str,
        candidates: &[MemoryRecord],
    ) -> std::result::Result<ClassifierDecision, ClassifierError> {
        self.seen_candidates
            .lock()
            .expect("candidates lock poisoned")
            .push(candidates.iter().map(|c| c.content.clone()).collect());

        self.decisions
            .lock()
            .expect("decisions lock poisoned")
            .pop_front()
            .ok_or_else(|| {
                ClassifierError::ContractViolation("No scripted decision left".to_string())
            })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Build a decision without the ceremony, for test scripts
pub fn decision(
    action: DecisionAction,
    target_id: Option<String>,
    updated_content: Option<String>,
) -> ClassifierDecision {
    ClassifierDecision {
        action,
        reasoning: "scripted decision".to_string(),
        target_id,
        updated_content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_embedding_is_deterministic() {
        let model = MockEmbeddingModel::new();
        let emb1 = model.embed("hello world").unwrap();
        let emb2 = model.embed("hello world").unwrap();
        assert_eq!(emb1, emb2);
    }

    #[test]
    fn mock_embedding_has_correct_dimensions() {
        let model = MockEmbeddingModel::new();
        let emb = model.embed("test").unwrap();
        assert_eq!(emb.len(), EMBEDDING_DIMENSION);
    }

    #[test]
    fn mock_embedding_different_for_different_inputs() {
        let model = MockEmbeddingModel::new();
        assert_ne!(model.embed("hello").unwrap(), model.embed("world").unwrap());
    }

    #[tokio::test]
    async fn in_memory_store_isolates_tenants() {
        let store = InMemoryStore::new();
        store.insert("alice", "User is vegetarian").await.unwrap();

        let bob_records = store.list("bob", true, 10).await.unwrap();
        assert!(bob_records.is_empty());

        let alice_records = store.list("alice", true, 10).await.unwrap();
        assert_eq!(alice_records.len(), 1);
    }

    #[tokio::test]
    async fn in_memory_store_ranks_by_overlap() {
        let store = InMemoryStore::new();
        store.insert("alice", "User lives in Berlin").await.unwrap();
        store.insert("alice", "User has a cat named Miso").await.unwrap();

        let results = store
            .search("alice", "User moved from Berlin", 10, true)
            .await
            .unwrap();
        assert_eq!(results[0].content, "User lives in Berlin");
    }

    #[tokio::test]
    async fn in_memory_store_invalidate_requires_active_record() {
        let store = InMemoryStore::new();
        let record = store.insert("alice", "User lives in Berlin").await.unwrap();

        store.invalidate("alice", record.id, Utc::now()).await.unwrap();
        let again = store.invalidate("alice", record.id, Utc::now()).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn scripted_classifier_replays_in_order() {
        let classifier = ScriptedClassifier::new();
        classifier.push_decision(decision(DecisionAction::Add, None, None));
        classifier.push_decision(decision(DecisionAction::Noop, None, None));

        let first = classifier.classify_fact("f1", &[]).await.unwrap();
        let second = classifier.classify_fact("f2", &[]).await.unwrap();
        assert_eq!(first.action, DecisionAction::Add);
        assert_eq!(second.action, DecisionAction::Noop);

        let exhausted = classifier.classify_fact("f3", &[]).await;
        assert!(exhausted.is_err());
    }
}
