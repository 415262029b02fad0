use std::path::Path;
use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray,
    TimestampMicrosecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::TryStreamExt;
use lancedb::Table;
use lancedb::query::{ExecutableQuery, QueryBase};
use uuid::Uuid;

use crate::embedding::{EMBEDDING_DIMENSION, EmbeddingProvider};
use crate::error::{RecallError, Result};
use crate::memory::MemoryRecord;
use crate::store::MemoryStore;

const EMBEDDING_DIMENSIONS: i32 = EMBEDDING_DIMENSION as i32;
const MEMORIES_TABLE: &str = "memories";

/// LanceDB-backed memory store
///
/// One table holds all tenants; every query carries a tenant predicate.
/// Embeddings are computed client-side on insert and content update.
pub struct LanceStore {
    table: Table,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl LanceStore {
    /// Connect to a LanceDB database, creating the memories table if needed
    pub async fn open(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let uri = path
            .to_str()
            .ok_or_else(|| RecallError::Storage("Invalid path encoding".to_string()))?;

        let connection = lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| RecallError::Storage(format!("Failed to connect to LanceDB: {e}")))?;

        let names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RecallError::Storage(format!("Failed to list tables: {e}")))?;

        let table = if names.contains(&MEMORIES_TABLE.to_string()) {
            connection
                .open_table(MEMORIES_TABLE)
                .execute()
                .await
                .map_err(|e| RecallError::Storage(format!("Failed to open memories table: {e}")))?
        } else {
            let schema = Self::memories_schema();
            let batch = Self::create_empty_batch(schema.clone());
            let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

            connection
                .create_table(MEMORIES_TABLE, Box::new(batches))
                .execute()
                .await
                .map_err(|e| {
                    RecallError::Storage(format!("Failed to create memories table: {e}"))
                })?
        };

        Ok(Self { table, embedder })
    }

    fn memories_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("tenant", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    EMBEDDING_DIMENSIONS,
                ),
                false,
            ),
            Field::new(
                "invalidation_time",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                true,
            ),
            Field::new(
                "created_at",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
            Field::new(
                "updated_at",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
        ]))
    }

    fn create_empty_batch(schema: Arc<Schema>) -> RecordBatch {
        let empty_strings: Vec<Option<&str>> = vec![];
        let empty_timestamps: Vec<Option<i64>> = vec![];
        let empty_embeddings: Vec<Option<Vec<Option<f32>>>> = vec![];

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(empty_strings.clone())),
                Arc::new(StringArray::from(empty_strings.clone())),
                Arc::new(StringArray::from(empty_strings)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(empty_embeddings, EMBEDDING_DIMENSIONS)),
                Arc::new(
                    TimestampMicrosecondArray::from(empty_timestamps.clone()).with_timezone("UTC"),
                ),
                Arc::new(
                    TimestampMicrosecondArray::from(empty_timestamps.clone()).with_timezone("UTC"),
                ),
                Arc::new(TimestampMicrosecondArray::from(empty_timestamps).with_timezone("UTC")),
            ],
        )
        .expect("Schema matches columns")
    }

    /// Convert a MemoryRecord plus its tenant and embedding to a RecordBatch
    fn record_to_batch(
        record: &MemoryRecord,
        tenant: &str,
        embedding: &[f32],
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let id = record.id.to_string();
        let embeddings: Vec<Option<Vec<Option<f32>>>> =
            vec![Some(embedding.iter().map(|&v| Some(v)).collect())];
        let invalidation: Vec<Option<i64>> = vec![
            record
                .invalidation_time
                .map(|t| t.timestamp_micros()),
        ];

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![id.as_str()])),
                Arc::new(StringArray::from(vec![tenant])),
                Arc::new(StringArray::from(vec![record.content.as_str()])),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(embeddings, EMBEDDING_DIMENSIONS)),
                Arc::new(TimestampMicrosecondArray::from(invalidation).with_timezone("UTC")),
                Arc::new(
                    TimestampMicrosecondArray::from(vec![record.created_at.timestamp_micros()])
                        .with_timezone("UTC"),
                ),
                Arc::new(
                    TimestampMicrosecondArray::from(vec![record.updated_at.timestamp_micros()])
                        .with_timezone("UTC"),
                ),
            ],
        )
        .map_err(|e| RecallError::Storage(format!("Failed to create RecordBatch: {e}")))
    }

    /// Convert an Arrow RecordBatch row back to a MemoryRecord
    fn batch_to_record(batch: &RecordBatch, row: usize) -> Result<MemoryRecord> {
        let id_array = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| RecallError::Storage("Failed to get id column".to_string()))?;

        let content_array = batch
            .column(2)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| RecallError::Storage("Failed to get content column".to_string()))?;

        let invalidation_array = batch
            .column(4)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .ok_or_else(|| {
                RecallError::Storage("Failed to get invalidation_time column".to_string())
            })?;

        let created_at_array = batch
            .column(5)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .ok_or_else(|| RecallError::Storage("Failed to get created_at column".to_string()))?;

        let updated_at_array = batch
            .column(6)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .ok_or_else(|| RecallError::Storage("Failed to get updated_at column".to_string()))?;

        let id = Uuid::parse_str(id_array.value(row))
            .map_err(|e| RecallError::Storage(format!("Failed to parse UUID: {e}")))?;

        let invalidation_time = if invalidation_array.is_null(row) {
            None
        } else {
            Some(Self::parse_timestamp(
                invalidation_array.value(row),
                "invalidation_time",
            )?)
        };

        Ok(MemoryRecord {
            id,
            content: content_array.value(row).to_string(),
            invalidation_time,
            created_at: Self::parse_timestamp(created_at_array.value(row), "created_at")?,
            updated_at: Self::parse_timestamp(updated_at_array.value(row), "updated_at")?,
        })
    }

    fn parse_timestamp(micros: i64, column: &str) -> Result<DateTime<Utc>> {
        Utc.timestamp_micros(micros)
            .single()
            .ok_or_else(|| RecallError::Storage(format!("Failed to parse {column} timestamp")))
    }

    fn tenant_predicate(tenant: &str) -> String {
        format!("tenant = '{}'", escape(tenant))
    }

    fn row_predicate(tenant: &str, id: Uuid) -> String {
        format!("{} AND id = '{id}'", Self::tenant_predicate(tenant))
    }

    async fn collect_records(
        stream: impl futures::Stream<Item = lancedb::error::Result<RecordBatch>> + Unpin,
    ) -> Result<Vec<MemoryRecord>> {
        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| RecallError::Storage(format!("Failed to collect query results: {e}")))?;

        let mut records = Vec::new();
        for batch in &batches {
            for row in 0..batch.num_rows() {
                records.push(Self::batch_to_record(batch, row)?);
            }
        }

        Ok(records)
    }
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

#[async_trait]
impl MemoryStore for LanceStore {
    async fn search(
        &self,
        tenant: &str,
        query: &str,
        limit: usize,
        active_only: bool,
    ) -> Result<Vec<MemoryRecord>> {
        let embedding = self.embedder.embed(query)?;

        let mut predicate = Self::tenant_predicate(tenant);
        if active_only {
            predicate.push_str(" AND invalidation_time IS NULL");
        }

        let stream = self
            .table
            .query()
            .nearest_to(embedding.as_slice())
            .map_err(|e| RecallError::Storage(format!("Failed to create vector query: {e}")))?
            .only_if(predicate)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RecallError::Storage(format!("Failed to execute search: {e}")))?;

        Self::collect_records(stream).await
    }

    async fn insert(&self, tenant: &str, content: &str) -> Result<MemoryRecord> {
        let embedding = self.embedder.embed(content)?;
        let record = MemoryRecord::new(content.to_string());

        let schema = Self::memories_schema();
        let batch = Self::record_to_batch(&record, tenant, &embedding, schema.clone())?;
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        self.table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| RecallError::Storage(format!("Failed to insert record: {e}")))?;

        Ok(record)
    }

    async fn update_content(&self, tenant: &str, id: Uuid, content: &str) -> Result<()> {
        // Content changes require a fresh embedding, which cannot be
        // expressed through the SQL update builder. Replace the row,
        // preserving id, created_at, and invalidation_time.
        let existing = self
            .get(tenant, id)
            .await?
            .ok_or_else(|| RecallError::Storage(format!("Record not found: {id}")))?;

        let embedding = self.embedder.embed(content)?;
        let updated = MemoryRecord {
            content: content.to_string(),
            updated_at: Utc::now(),
            ..existing
        };

        self.table
            .delete(&Self::row_predicate(tenant, id))
            .await
            .map_err(|e| RecallError::Storage(format!("Failed to replace record: {e}")))?;

        let schema = Self::memories_schema();
        let batch = Self::record_to_batch(&updated, tenant, &embedding, schema.clone())?;
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        self.table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| RecallError::Storage(format!("Failed to replace record: {e}")))?;

        Ok(())
    }

    async fn invalidate(&self, tenant: &str, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let micros = at.timestamp_micros();

        // The extra IS NULL guard keeps an existing invalidation
        // timestamp from ever being overwritten.
        let result = self
            .table
            .update()
            .only_if(format!(
                "{} AND invalidation_time IS NULL",
                Self::row_predicate(tenant, id)
            ))
            .column("invalidation_time", format!("{micros}"))
            .column("updated_at", format!("{micros}"))
            .execute()
            .await
            .map_err(|e| RecallError::Storage(format!("Failed to invalidate record: {e}")))?;

        if result.rows_updated == 0 {
            return Err(RecallError::Storage(format!(
                "Active record not found: {id}"
            )));
        }

        Ok(())
    }

    async fn get(&self, tenant: &str, id: Uuid) -> Result<Option<MemoryRecord>> {
        let stream = self
            .table
            .query()
            .only_if(Self::row_predicate(tenant, id))
            .execute()
            .await
            .map_err(|e| RecallError::Storage(format!("Failed to query record: {e}")))?;

        let records = Self::collect_records(stream).await?;
        Ok(records.into_iter().next())
    }

    async fn list(&self, tenant: &str, active: bool, limit: usize) -> Result<Vec<MemoryRecord>> {
        let null_check = if active { "IS NULL" } else { "IS NOT NULL" };
        let predicate = format!(
            "{} AND invalidation_time {null_check}",
            Self::tenant_predicate(tenant)
        );

        let stream = self
            .table
            .query()
            .only_if(predicate)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RecallError::Storage(format!("Failed to list records: {e}")))?;

        Self::collect_records(stream).await
    }
}
