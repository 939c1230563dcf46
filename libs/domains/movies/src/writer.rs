//! Batch writes into the catalog tables
//!
//! One call prepares the insert statement once, appends it once per row to a
//! single logged batch and submits that batch as one request. Every row is
//! decoded before anything goes over the wire, so a malformed row rejects the
//! whole call without side effects.

use database::CassandraSession;
use scylla::statement::batch::{Batch, BatchType};
use scylla::value::CqlValue;
use std::fmt;
use std::future::Future;
use strum::{Display, EnumString};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::codec::{self, FieldValue};
use crate::ddl::validate_keyspace;
use crate::error::{CatalogError, CatalogResult};
use crate::models::CatalogRecord;
use crate::schema::{Table, TableSchema};

/// Whether `batch_insert` waits for the cluster acknowledgement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Sync,
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResult {
    pub table: Table,
    /// Rows carried by the acknowledged batch
    pub rows: usize,
}

/// A batch handed to a background task
///
/// Failures are logged by the task itself, so a detached write never fails
/// silently. Call [`PendingWrite::wait`] to observe the result instead.
#[must_use = "a pending write should be awaited with `wait()` or explicitly `detach()`ed"]
#[derive(Debug)]
pub struct PendingWrite {
    table: Table,
    rows: usize,
    handle: JoinHandle<CatalogResult<WriteResult>>,
}

impl PendingWrite {
    /// Run `write` on the tokio runtime
    pub fn spawn<F>(table: Table, rows: usize, write: F) -> Self
    where
        F: Future<Output = CatalogResult<WriteResult>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let result = write.await;
            if let Err(e) = &result {
                error!(%table, rows, error = %e, "Asynchronous batch write failed");
            }
            result
        });

        Self {
            table,
            rows,
            handle,
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> CatalogResult<WriteResult> {
        self.handle.await?
    }

    /// Let the write finish in the background without observing it
    pub fn detach(self) {
        debug!(table = %self.table, rows = self.rows, "Detached pending batch write");
    }
}

#[must_use]
#[derive(Debug)]
pub enum WriteOutcome {
    Completed(WriteResult),
    Pending(PendingWrite),
}

impl WriteOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, WriteOutcome::Pending(_))
    }

    /// Resolve to the write result, waiting for a pending write if needed
    pub async fn wait(self) -> CatalogResult<WriteResult> {
        match self {
            WriteOutcome::Completed(result) => Ok(result),
            WriteOutcome::Pending(pending) => pending.wait().await,
        }
    }
}

/// `INSERT INTO <ks>.<table> (c1, ..., cn) VALUES (?, ..., ?)`
pub fn insert_statement(keyspace: &str, schema: &TableSchema) -> String {
    let columns: Vec<&str> = schema.column_names().collect();
    let markers = vec!["?"; columns.len()];
    format!(
        "INSERT INTO {}.{} ({}) VALUES ({})",
        keyspace,
        schema.name,
        columns.join(", "),
        markers.join(", ")
    )
}

/// Decode every raw row, rejecting the lot on the first malformed one
pub fn decode_rows<I, K, V, S>(schema: &TableSchema, rows: I) -> CatalogResult<Vec<Vec<FieldValue>>>
where
    I: IntoIterator<Item = (K, V)>,
    K: fmt::Display,
    V: AsRef<[S]>,
    S: AsRef<str>,
{
    rows.into_iter()
        .map(|(key, fields)| {
            codec::decode(schema, fields.as_ref()).map_err(|source| CatalogError::MalformedRow {
                key: key.to_string(),
                source,
            })
        })
        .collect()
}

/// Everything needed to submit one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub table: Table,
    pub statement: String,
    pub rows: Vec<Vec<FieldValue>>,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn plan_batch<I, K, V, S>(keyspace: &str, table: Table, rows: I) -> CatalogResult<BatchPlan>
where
    I: IntoIterator<Item = (K, V)>,
    K: fmt::Display,
    V: AsRef<[S]>,
    S: AsRef<str>,
{
    let schema = table.schema();
    let rows = decode_rows(schema, rows)?;

    Ok(BatchPlan {
        table,
        statement: insert_statement(keyspace, schema),
        rows,
    })
}

/// Prepare once, append once per row, submit one logged batch
async fn submit(session: CassandraSession, plan: BatchPlan) -> CatalogResult<WriteResult> {
    let BatchPlan {
        table,
        statement,
        rows,
    } = plan;

    let prepared = session
        .prepare(statement)
        .await
        .map_err(|source| CatalogError::Prepare { table, source })?;

    let mut batch = Batch::new(BatchType::Logged);
    for _ in 0..rows.len() {
        batch.append_statement(prepared.clone());
    }

    let values: Vec<Vec<CqlValue>> = rows
        .into_iter()
        .map(|row| row.into_iter().map(CqlValue::from).collect())
        .collect();
    let count = values.len();

    session
        .batch(&batch, values)
        .await
        .map_err(|source| CatalogError::BatchWrite { table, source })?;

    debug!(%table, rows = count, "Batch acknowledged");
    Ok(WriteResult { table, rows: count })
}

/// Writes catalog rows into one keyspace over a shared session
#[derive(Debug, Clone)]
pub struct BatchWriter {
    session: CassandraSession,
    keyspace: String,
}

impl BatchWriter {
    pub fn new(session: CassandraSession, keyspace: impl Into<String>) -> CatalogResult<Self> {
        let keyspace = keyspace.into();
        validate_keyspace(&keyspace)?;
        Ok(Self { session, keyspace })
    }

    pub fn session(&self) -> &CassandraSession {
        &self.session
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    /// Insert raw string rows into `table` as one batch
    ///
    /// Keys only identify rows in errors. An empty input completes with zero
    /// rows without contacting the cluster.
    #[instrument(skip(self, rows), fields(keyspace = %self.keyspace))]
    pub async fn batch_insert<I, K, V, S>(
        &self,
        table: Table,
        rows: I,
        mode: WriteMode,
    ) -> CatalogResult<WriteOutcome>
    where
        I: IntoIterator<Item = (K, V)>,
        K: fmt::Display,
        V: AsRef<[S]>,
        S: AsRef<str>,
    {
        let plan = plan_batch(&self.keyspace, table, rows)?;
        self.execute(plan, mode).await
    }

    /// Insert one typed record as a single-row batch
    #[instrument(skip(self, record), fields(keyspace = %self.keyspace, table = %R::TABLE))]
    pub async fn insert<R: CatalogRecord>(
        &self,
        record: R,
        mode: WriteMode,
    ) -> CatalogResult<WriteOutcome> {
        let plan = BatchPlan {
            table: R::TABLE,
            statement: insert_statement(&self.keyspace, R::TABLE.schema()),
            rows: vec![record.into_values()],
        };
        self.execute(plan, mode).await
    }

    async fn execute(&self, plan: BatchPlan, mode: WriteMode) -> CatalogResult<WriteOutcome> {
        if plan.is_empty() {
            return Ok(WriteOutcome::Completed(WriteResult {
                table: plan.table,
                rows: 0,
            }));
        }

        debug!(table = %plan.table, rows = plan.len(), %mode, "Submitting batch");
        let session = self.session.clone();

        match mode {
            WriteMode::Sync => submit(session, plan).await.map(WriteOutcome::Completed),
            WriteMode::Async => {
                let (table, rows) = (plan.table, plan.len());
                Ok(WriteOutcome::Pending(PendingWrite::spawn(
                    table,
                    rows,
                    submit(session, plan),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn watch_row(cid: &str, mid: &str) -> Vec<String> {
        vec![
            cid.to_string(),
            mid.to_string(),
            "1609459200000".to_string(),
            "15".to_string(),
            "Inception".to_string(),
        ]
    }

    #[test]
    fn test_insert_statement_lists_columns_in_order() {
        assert_eq!(
            insert_statement("movies", Table::WatchHistory.schema()),
            "INSERT INTO movies.watch_history (customer_id, movie_id, watched_at, pause_time, movie_name) VALUES (?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn test_plan_batch_decodes_every_row() {
        let mut rows = HashMap::new();
        rows.insert("1".to_string(), watch_row("7", "42"));
        rows.insert("2".to_string(), watch_row("7", "43"));
        rows.insert("3".to_string(), watch_row("8", "42"));

        let plan = plan_batch("movies", Table::WatchHistory, rows).unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan.statement.starts_with("INSERT INTO movies.watch_history"));
        assert!(plan.rows.iter().all(|r| r.len() == 5));
    }

    #[test]
    fn test_plan_batch_names_malformed_row() {
        let rows = vec![
            (1, watch_row("7", "42")),
            (2, vec!["7".to_string(), "42".to_string()]),
        ];

        let err = plan_batch("movies", Table::WatchHistory, rows).unwrap_err();
        match err {
            CatalogError::MalformedRow { key, source } => {
                assert_eq!(key, "2");
                assert_eq!(
                    source,
                    crate::error::CodecError::FieldCount {
                        expected: 5,
                        actual: 2
                    }
                );
            }
            other => panic!("expected MalformedRow, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_batch_empty() {
        let rows: Vec<(usize, Vec<String>)> = Vec::new();
        let plan = plan_batch("movies", Table::CustomerQueue, rows).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_write_mode_parsing() {
        assert_eq!(WriteMode::from_str("async").unwrap(), WriteMode::Async);
        assert_eq!(WriteMode::default(), WriteMode::Sync);
        assert_eq!(WriteMode::Sync.to_string(), "sync");
    }

    #[tokio::test]
    async fn test_pending_write_reports_result() {
        let pending = PendingWrite::spawn(Table::MoviesGenre, 2, async {
            Ok(WriteResult {
                table: Table::MoviesGenre,
                rows: 2,
            })
        });
        assert_eq!(pending.rows(), 2);

        let result = WriteOutcome::Pending(pending).wait().await.unwrap();
        assert_eq!(result.rows, 2);
    }

    #[tokio::test]
    async fn test_pending_write_surfaces_failure() {
        let pending = PendingWrite::spawn(Table::CustomerRating, 1, async {
            Err(CatalogError::InvalidKeyspace("bad-name".to_string()))
        });

        let err = pending.wait().await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidKeyspace(_)));
    }

    #[tokio::test]
    async fn test_completed_outcome_waits_immediately() {
        let outcome = WriteOutcome::Completed(WriteResult {
            table: Table::WatchHistory,
            rows: 0,
        });
        assert!(!outcome.is_pending());
        assert_eq!(outcome.wait().await.unwrap().rows, 0);
    }
}
