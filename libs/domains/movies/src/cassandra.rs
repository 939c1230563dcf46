use async_trait::async_trait;
use database::CassandraSession;
use scylla::statement::prepared::PreparedStatement;
use scylla::value::{CqlValue, Row};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::codec::{self, FieldValue};
use crate::error::{CatalogError, CatalogResult};
use crate::repository::{CatalogRepository, RawRows};
use crate::schema::{Table, TableSchema};
use crate::writer::{BatchWriter, WriteMode, WriteOutcome};

/// `SELECT <all columns> FROM <ks>.<table> WHERE k1 = ? AND ...` over the full primary key
pub fn select_by_key_statement(keyspace: &str, schema: &TableSchema) -> String {
    let columns: Vec<&str> = schema.column_names().collect();
    let predicates: Vec<String> = schema
        .primary_key()
        .map(|c| format!("{} = ?", c.name))
        .collect();

    format!(
        "SELECT {} FROM {}.{} WHERE {}",
        columns.join(", "),
        keyspace,
        schema.name,
        predicates.join(" AND ")
    )
}

/// One prepared statement per table, prepared on first use
#[derive(Debug)]
pub struct StatementCache<T> {
    statements: RwLock<HashMap<Table, T>>,
}

impl<T: Clone> StatementCache<T> {
    pub fn new() -> Self {
        Self {
            statements: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached statement for `table`, running `prepare` if there is none
    ///
    /// A failed `prepare` caches nothing, so the next call tries again.
    pub async fn get_or_try_insert<F, Fut, E>(&self, table: Table, prepare: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(statement) = self.statements.read().await.get(&table) {
            return Ok(statement.clone());
        }

        let mut statements = self.statements.write().await;
        if let Some(statement) = statements.get(&table) {
            return Ok(statement.clone());
        }

        let statement = prepare().await?;
        debug!(%table, "Cached prepared statement");
        statements.insert(table, statement.clone());
        Ok(statement)
    }

    pub async fn len(&self) -> usize {
        self.statements.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<T: Clone> Default for StatementCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// ScyllaDB/Cassandra implementation of CatalogRepository
#[derive(Debug, Clone)]
pub struct CassandraCatalogRepository {
    writer: BatchWriter,
    selects: Arc<StatementCache<PreparedStatement>>,
}

impl CassandraCatalogRepository {
    pub fn new(session: CassandraSession, keyspace: impl Into<String>) -> CatalogResult<Self> {
        Ok(Self {
            writer: BatchWriter::new(session, keyspace)?,
            selects: Arc::new(StatementCache::new()),
        })
    }

    pub fn writer(&self) -> &BatchWriter {
        &self.writer
    }
}

#[async_trait]
impl CatalogRepository for CassandraCatalogRepository {
    async fn batch_insert(
        &self,
        table: Table,
        rows: RawRows,
        mode: WriteMode,
    ) -> CatalogResult<WriteOutcome> {
        self.writer.batch_insert(table, rows, mode).await
    }

    #[instrument(skip(self), fields(keyspace = %self.writer.keyspace()))]
    async fn find(&self, table: Table, key: &[FieldValue]) -> CatalogResult<Option<Vec<FieldValue>>> {
        let schema = table.schema();
        codec::validate_key(schema, key)
            .map_err(|source| CatalogError::InvalidKey { table, source })?;

        let session = self.writer.session();
        let prepared = self
            .selects
            .get_or_try_insert(table, || async {
                session
                    .prepare(select_by_key_statement(self.writer.keyspace(), schema))
                    .await
                    .map_err(|source| CatalogError::Prepare { table, source })
            })
            .await?;

        let values: Vec<CqlValue> = key.iter().cloned().map(CqlValue::from).collect();
        let rows_result = session
            .execute_unpaged(&prepared, values)
            .await?
            .into_rows_result()
            .map_err(|e| CatalogError::RowDecode(e.to_string()))?;

        let row = rows_result
            .maybe_first_row::<Row>()
            .map_err(|e| CatalogError::RowDecode(e.to_string()))?;

        row.map(|row| {
            codec::from_cql_row(schema, row.columns)
                .map_err(|e| CatalogError::RowDecode(e.to_string()))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_select_by_key_statement() {
        assert_eq!(
            select_by_key_statement("movies", Table::MoviesGenre.schema()),
            "SELECT genre, release_year, movie_id, duration, movie_name FROM movies.movies_genre WHERE genre = ? AND release_year = ? AND movie_id = ?"
        );
    }

    #[tokio::test]
    async fn test_statement_cache_prepares_once_per_table() {
        let cache = StatementCache::new();
        let prepared = AtomicUsize::new(0);
        let prepare = |table: Table| {
            let prepared = &prepared;
            move || async move {
                prepared.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CatalogError>(select_by_key_statement("movies", table.schema()))
            }
        };

        for _ in 0..3 {
            let cql = cache
                .get_or_try_insert(Table::WatchHistory, prepare(Table::WatchHistory))
                .await
                .unwrap();
            assert!(cql.contains("movies.watch_history"));
        }
        cache
            .get_or_try_insert(Table::MoviesGenre, prepare(Table::MoviesGenre))
            .await
            .unwrap();

        assert_eq!(prepared.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_statement_cache_retries_failed_prepare() {
        let cache: StatementCache<String> = StatementCache::new();

        let err = cache
            .get_or_try_insert(Table::CustomerQueue, || async {
                Err(CatalogError::InvalidKeyspace("bad-name".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidKeyspace(_)));
        assert!(cache.is_empty().await);

        let cql = cache
            .get_or_try_insert(Table::CustomerQueue, || async {
                Ok::<_, CatalogError>("SELECT".to_string())
            })
            .await
            .unwrap();
        assert_eq!(cql, "SELECT");
    }

    #[test]
    fn test_select_by_key_statement_timestamp_clustering() {
        let cql = select_by_key_statement("movies", Table::CustomerQueue.schema());
        assert!(cql.ends_with("WHERE customer_id = ? AND queued_at = ?"));
    }
}
