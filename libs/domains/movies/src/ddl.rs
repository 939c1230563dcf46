//! Keyspace and table provisioning
//!
//! DDL is generated from the same table descriptions the writer uses. Only
//! validated identifiers are ever interpolated into statement text.

use database::CassandraSession;
use regex::Regex;
use std::sync::LazyLock;
use strum::IntoEnumIterator;
use tracing::{info, instrument};

use crate::error::{CatalogError, CatalogResult};
use crate::schema::{Table, TableSchema};

static KEYSPACE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,47}$").unwrap());

/// Reject anything that is not a plain CQL identifier of at most 48 chars
pub fn validate_keyspace(keyspace: &str) -> CatalogResult<()> {
    if KEYSPACE_NAME.is_match(keyspace) {
        Ok(())
    } else {
        Err(CatalogError::InvalidKeyspace(keyspace.to_string()))
    }
}

pub fn create_keyspace_statement(keyspace: &str, replication_factor: u32) -> CatalogResult<String> {
    validate_keyspace(keyspace)?;
    if replication_factor == 0 {
        return Err(CatalogError::InvalidReplicationFactor(replication_factor));
    }

    Ok(format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    ))
}

pub fn create_table_statement(keyspace: &str, schema: &TableSchema) -> String {
    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.kind))
        .collect();

    let partition = if schema.partition_key.len() == 1 {
        schema.partition_key[0].to_string()
    } else {
        format!("({})", schema.partition_key.join(", "))
    };
    let primary_key = std::iter::once(partition)
        .chain(schema.clustering_key.iter().map(|c| c.to_string()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} ({}, PRIMARY KEY ({}))",
        keyspace,
        schema.name,
        columns.join(", "),
        primary_key
    )
}

pub fn drop_keyspace_statement(keyspace: &str) -> CatalogResult<String> {
    validate_keyspace(keyspace)?;
    Ok(format!("DROP KEYSPACE {}", keyspace))
}

pub fn drop_table_statement(keyspace: &str, table: Table) -> CatalogResult<String> {
    validate_keyspace(keyspace)?;
    Ok(format!("DROP TABLE IF EXISTS {}.{}", keyspace, table.schema().name))
}

/// Creates and drops the catalog keyspace and its tables
#[derive(Debug, Clone)]
pub struct SchemaManager {
    session: CassandraSession,
}

impl SchemaManager {
    pub fn new(session: CassandraSession) -> Self {
        Self { session }
    }

    async fn run(&self, statement: &str) -> CatalogResult<()> {
        self.session.query_unpaged(statement, &[]).await?;
        Ok(())
    }

    /// Create the keyspace (SimpleStrategy) and all four tables if missing
    #[instrument(skip(self))]
    pub async fn create_schema(&self, keyspace: &str, replication_factor: u32) -> CatalogResult<()> {
        let statement = create_keyspace_statement(keyspace, replication_factor)?;
        self.run(&statement).await?;
        info!(keyspace, replication_factor, "Keyspace ready");

        for table in Table::iter() {
            self.run(&create_table_statement(keyspace, table.schema()))
                .await?;
            info!(keyspace, %table, "Table ready");
        }
        Ok(())
    }

    /// Drop the keyspace; fails if it does not exist
    #[instrument(skip(self))]
    pub async fn drop_schema(&self, keyspace: &str) -> CatalogResult<()> {
        self.run(&drop_keyspace_statement(keyspace)?).await?;
        info!(keyspace, "Dropped keyspace");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn drop_table(&self, keyspace: &str, table: Table) -> CatalogResult<()> {
        self.run(&drop_table_statement(keyspace, table)?).await?;
        info!(keyspace, %table, "Dropped table");
        Ok(())
    }
}
