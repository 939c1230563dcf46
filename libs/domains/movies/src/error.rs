use database::CassandraError;
use scylla::errors::{ExecutionError, PrepareError};
use thiserror::Error;

use crate::schema::{ColumnType, Table};

/// A raw or stored value did not fit the table layout
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("field {index} ({column}) is not a valid {expected}: {value:?}")]
    InvalidField {
        index: usize,
        column: &'static str,
        expected: ColumnType,
        value: String,
    },

    #[error("column {column} holds an unexpected value: {found}")]
    UnexpectedValue { column: &'static str, found: String },

    #[error("values do not match the {0} record layout")]
    RecordShape(Table),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    /// A row failed decoding; nothing from its batch was submitted
    #[error("Malformed row '{key}': {source}")]
    MalformedRow {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("Invalid primary key for {table}: {source}")]
    InvalidKey {
        table: Table,
        #[source]
        source: CodecError,
    },

    #[error("Failed to prepare statement for {table}: {source}")]
    Prepare {
        table: Table,
        #[source]
        source: PrepareError,
    },

    /// The cluster rejected the batch after the retry policy gave up
    #[error("Batch write to {table} failed: {source}")]
    BatchWrite {
        table: Table,
        #[source]
        source: ExecutionError,
    },

    #[error("Query failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Could not decode result rows: {0}")]
    RowDecode(String),

    #[error("Invalid keyspace name '{0}'")]
    InvalidKeyspace(String),

    #[error("Replication factor must be at least 1, got {0}")]
    InvalidReplicationFactor(u32),

    #[error(transparent)]
    Connection(#[from] CassandraError),

    #[error("Pending write task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn is_malformed_row(&self) -> bool {
        matches!(self, CatalogError::MalformedRow { .. })
    }
}
