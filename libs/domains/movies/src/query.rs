//! Ad-hoc CQL passthrough
//!
//! Statements run at consistency ONE with server-side tracing enabled. Rows
//! come back as [`CqlValue`]s and are logged at debug level.

use chrono::DateTime;
use database::CassandraSession;
use scylla::statement::Consistency;
use scylla::statement::unprepared::Statement;
use scylla::value::{CqlValue, Row};
use std::fmt;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};

/// Column names and rows returned by an ad-hoc query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<CqlValue>>>,
    /// Server-side trace of the request, if the cluster recorded one
    pub tracing_id: Option<Uuid>,
}

impl QueryOutput {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn render(value: &Option<CqlValue>) -> String {
    match value {
        None => "null".to_string(),
        Some(CqlValue::Int(v)) => v.to_string(),
        Some(CqlValue::BigInt(v)) => v.to_string(),
        Some(CqlValue::Float(v)) => v.to_string(),
        Some(CqlValue::Double(v)) => v.to_string(),
        Some(CqlValue::Boolean(v)) => v.to_string(),
        Some(CqlValue::Text(v) | CqlValue::Ascii(v)) => v.clone(),
        Some(CqlValue::Uuid(v)) => v.to_string(),
        Some(CqlValue::Timestamp(ts)) => DateTime::from_timestamp_millis(ts.0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| ts.0.to_string()),
        Some(other) => format!("{:?}", other),
    }
}

/// Tab separated header line followed by one line per row
impl fmt::Display for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.columns.is_empty() {
            writeln!(f, "{}", self.columns.join("\t"))?;
        }
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(render).collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }
        Ok(())
    }
}

/// Run one CQL statement at consistency ONE with tracing on
///
/// Statements that return no rows (DDL, writes) yield an empty output.
#[instrument(skip(session))]
pub async fn run_query(session: &CassandraSession, cql: &str) -> CatalogResult<QueryOutput> {
    let mut statement = Statement::new(cql);
    statement.set_consistency(Consistency::One);
    statement.set_tracing(true);

    let result = session.query_unpaged(statement, &[]).await?;
    let tracing_id = result.tracing_id();

    let mut output = QueryOutput {
        tracing_id,
        ..Default::default()
    };

    if result.is_rows() {
        let rows_result = result
            .into_rows_result()
            .map_err(|e| CatalogError::RowDecode(e.to_string()))?;

        output.columns = rows_result
            .column_specs()
            .iter()
            .map(|spec| spec.name().to_string())
            .collect();

        for row in rows_result
            .rows::<Row>()
            .map_err(|e| CatalogError::RowDecode(e.to_string()))?
        {
            let row = row.map_err(|e| CatalogError::RowDecode(e.to_string()))?;
            debug!(?row, "Query row");
            output.rows.push(row.columns);
        }
    }

    info!(rows = output.rows.len(), ?tracing_id, "Query finished");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scylla::value::CqlTimestamp;

    #[test]
    fn test_display_renders_header_and_rows() {
        let output = QueryOutput {
            columns: vec!["customer_id".to_string(), "watched_at".to_string(), "movie_name".to_string()],
            rows: vec![vec![
                Some(CqlValue::Int(7)),
                Some(CqlValue::Timestamp(CqlTimestamp(1_609_459_200_000))),
                None,
            ]],
            tracing_id: None,
        };

        assert_eq!(
            output.to_string(),
            "customer_id\twatched_at\tmovie_name\n7\t2021-01-01T00:00:00+00:00\tnull\n"
        );
    }

    #[test]
    fn test_display_without_rows() {
        let output = QueryOutput::default();
        assert!(output.is_empty());
        assert_eq!(output.to_string(), "");
    }
}
