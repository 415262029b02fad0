//! Memory store boundary
//!
//! The store owns persistence, tenant isolation, and similarity ranking.
//! Consolidation treats the ranking policy as opaque: it only relies on
//! `search` returning the most relevant active records first.

pub mod lance;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::memory::MemoryRecord;

pub use lance::LanceStore;

/// Trait for tenant-scoped memory stores
///
/// Every operation is scoped to one tenant; no call can observe another
/// tenant's records. Per-record writes are atomic, but no cross-record
/// transaction is offered: the consolidator's invalidate-then-add pair is
/// two independent writes.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Return up to `limit` records most similar to `query`, best first
    ///
    /// With `active_only`, invalidated records are excluded.
    async fn search(
        &self,
        tenant: &str,
        query: &str,
        limit: usize,
        active_only: bool,
    ) -> Result<Vec<MemoryRecord>>;

    /// Insert a new active record and return it
    async fn insert(&self, tenant: &str, content: &str) -> Result<MemoryRecord>;

    /// Replace a record's content, leaving `invalidation_time` untouched
    async fn update_content(&self, tenant: &str, id: Uuid, content: &str) -> Result<()>;

    /// Soft-delete a record by setting its invalidation time
    ///
    /// The record's content is preserved; it simply stops being active.
    async fn invalidate(&self, tenant: &str, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Fetch a record by id
    async fn get(&self, tenant: &str, id: Uuid) -> Result<Option<MemoryRecord>>;

    /// List up to `limit` records, either the active or the invalidated ones
    async fn list(&self, tenant: &str, active: bool, limit: usize) -> Result<Vec<MemoryRecord>>;
}
