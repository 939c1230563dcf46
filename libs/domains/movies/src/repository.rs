use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::codec::{self, FieldValue};
use crate::error::{CatalogError, CatalogResult};
use crate::schema::Table;
use crate::writer::{PendingWrite, WriteMode, WriteOutcome, WriteResult, decode_rows};

/// Row key to positional raw fields, as read from CSV or a feed
pub type RawRows = HashMap<String, Vec<String>>;

/// Repository trait for catalog persistence
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert all rows into `table` as one batch
    async fn batch_insert(
        &self,
        table: Table,
        rows: RawRows,
        mode: WriteMode,
    ) -> CatalogResult<WriteOutcome>;

    /// Look up one row by its full primary key (partition then clustering values)
    async fn find(&self, table: Table, key: &[FieldValue]) -> CatalogResult<Option<Vec<FieldValue>>>;
}

/// Hashable form of a primary-key value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Int(i32),
    Float(u32),
    Text(String),
    Timestamp(i64),
}

impl From<&FieldValue> for KeyPart {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Int(v) => KeyPart::Int(*v),
            FieldValue::Float(v) => KeyPart::Float(v.to_bits()),
            FieldValue::Text(v) => KeyPart::Text(v.clone()),
            FieldValue::Timestamp(v) => KeyPart::Timestamp(*v),
        }
    }
}

type TableRows = HashMap<Vec<KeyPart>, Vec<FieldValue>>;

/// In-memory implementation of CatalogRepository (for development/testing)
///
/// Rows are upserted by primary key like the real tables.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalogRepository {
    tables: Arc<RwLock<HashMap<Table, TableRows>>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct rows stored in `table`
    pub async fn count(&self, table: Table) -> usize {
        let tables = self.tables.read().await;
        tables.get(&table).map_or(0, |rows| rows.len())
    }

    async fn upsert(
        tables: Arc<RwLock<HashMap<Table, TableRows>>>,
        table: Table,
        rows: Vec<Vec<FieldValue>>,
    ) -> WriteResult {
        let schema = table.schema();
        let count = rows.len();

        let mut tables = tables.write().await;
        let stored = tables.entry(table).or_default();
        for row in rows {
            let key = codec::key_of(schema, &row).iter().map(KeyPart::from).collect();
            stored.insert(key, row);
        }

        tracing::debug!(%table, rows = count, "Stored batch in memory");
        WriteResult { table, rows: count }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn batch_insert(
        &self,
        table: Table,
        rows: RawRows,
        mode: WriteMode,
    ) -> CatalogResult<WriteOutcome> {
        let rows = decode_rows(table.schema(), rows)?;
        if rows.is_empty() {
            return Ok(WriteOutcome::Completed(WriteResult { table, rows: 0 }));
        }

        let tables = Arc::clone(&self.tables);
        match mode {
            WriteMode::Sync => Ok(WriteOutcome::Completed(
                Self::upsert(tables, table, rows).await,
            )),
            WriteMode::Async => {
                let count = rows.len();
                Ok(WriteOutcome::Pending(PendingWrite::spawn(
                    table,
                    count,
                    async move { Ok(Self::upsert(tables, table, rows).await) },
                )))
            }
        }
    }

    async fn find(&self, table: Table, key: &[FieldValue]) -> CatalogResult<Option<Vec<FieldValue>>> {
        codec::validate_key(table.schema(), key)
            .map_err(|source| CatalogError::InvalidKey { table, source })?;

        let key: Vec<KeyPart> = key.iter().map(KeyPart::from).collect();
        let tables = self.tables.read().await;
        Ok(tables.get(&table).and_then(|rows| rows.get(&key)).cloned())
    }
}
