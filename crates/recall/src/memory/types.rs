//! Memory types for the Recall system
//!
//! Defines the MemoryRecord struct, the atomic unit of long-term memory,
//! and helpers for rendering records into prompt context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single fact stored in a tenant's memory.
///
/// A record is "active" while `invalidation_time` is unset. Invalidation
/// is a soft delete: the timestamp is set once and never cleared, so
/// superseded facts remain queryable as history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier, assigned at creation, immutable
    pub id: Uuid,
    /// The atomic fact as free text
    pub content: String,
    /// When this record was superseded; `None` means currently valid
    pub invalidation_time: Option<DateTime<Utc>>,
    /// When this record was created
    pub created_at: DateTime<Utc>,
    /// When this record was last modified
    pub updated_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Create a new active record with a fresh id and current timestamps
    pub fn new(content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content,
            invalidation_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this record is currently valid
    pub fn is_active(&self) -> bool {
        self.invalidation_time.is_none()
    }
}

/// Render records as a bullet list suitable for prompt context.
///
/// Returns an empty string for an empty slice.
pub fn format_context(records: &[MemoryRecord]) -> String {
    records
        .iter()
        .map(|r| format!("- {}", r.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_active() {
        let record = MemoryRecord::new("User is vegetarian".to_string());
        assert!(record.is_active());
        assert!(record.invalidation_time.is_none());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_invalidated_record_is_not_active() {
        let mut record = MemoryRecord::new("User lives in Berlin".to_string());
        record.invalidation_time = Some(Utc::now());
        assert!(!record.is_active());
    }

    #[test]
    fn test_record_serialization() {
        let record = MemoryRecord::new("Test content".to_string());

        let json = serde_json::to_string(&record).expect("Failed to serialize record");
        let deserialized: MemoryRecord =
            serde_json::from_str(&json).expect("Failed to deserialize record");

        assert_eq!(record.id, deserialized.id);
        assert_eq!(record.content, deserialized.content);
        assert_eq!(record.invalidation_time, deserialized.invalidation_time);
    }

    #[test]
    fn test_format_context() {
        let records = vec![
            MemoryRecord::new("User is vegetarian".to_string()),
            MemoryRecord::new("User lives in Berlin".to_string()),
        ];

        let context = format_context(&records);
        assert_eq!(context, "- User is vegetarian\n- User lives in Berlin");
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), "");
    }
}
