//! Table layouts of the movie catalog
//!
//! Each table is described once here; insert/select statements, DDL and the
//! row codec are all derived from these descriptions.

use strum::{Display, EnumIter, EnumString};

/// CQL type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    Text,
    /// Milliseconds since the Unix epoch
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

const fn column(name: &'static str, kind: ColumnType) -> Column {
    Column { name, kind }
}

/// The four denormalized catalog tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    WatchHistory,
    CustomerRating,
    CustomerQueue,
    MoviesGenre,
}

impl Table {
    pub fn schema(self) -> &'static TableSchema {
        match self {
            Table::WatchHistory => &WATCH_HISTORY,
            Table::CustomerRating => &CUSTOMER_RATING,
            Table::CustomerQueue => &CUSTOMER_QUEUE,
            Table::MoviesGenre => &MOVIES_GENRE,
        }
    }
}

/// Ordered columns plus primary key of one table
///
/// Column order is also the positional order of raw input fields.
#[derive(Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub table: Table,
    pub name: &'static str,
    pub columns: &'static [Column],
    pub partition_key: &'static [&'static str],
    pub clustering_key: &'static [&'static str],
}

impl TableSchema {
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Partition columns followed by clustering columns
    pub fn primary_key(&self) -> impl Iterator<Item = &'static Column> + '_ {
        self.partition_key
            .iter()
            .chain(self.clustering_key.iter())
            .filter_map(move |name| self.columns.iter().find(|c| c.name == *name))
    }

    /// Positions of the primary-key columns within `columns`
    pub fn primary_key_positions(&self) -> Vec<usize> {
        self.partition_key
            .iter()
            .chain(self.clustering_key.iter())
            .filter_map(|name| self.columns.iter().position(|c| c.name == *name))
            .collect()
    }
}

static WATCH_HISTORY: TableSchema = TableSchema {
    table: Table::WatchHistory,
    name: "watch_history",
    columns: &[
        column("customer_id", ColumnType::Int),
        column("movie_id", ColumnType::Int),
        column("watched_at", ColumnType::Timestamp),
        column("pause_time", ColumnType::Int),
        column("movie_name", ColumnType::Text),
    ],
    partition_key: &["customer_id"],
    clustering_key: &["movie_id"],
};

static CUSTOMER_RATING: TableSchema = TableSchema {
    table: Table::CustomerRating,
    name: "customer_rating",
    columns: &[
        column("customer_id", ColumnType::Int),
        column("movie_id", ColumnType::Int),
        column("movie_name", ColumnType::Text),
        column("customer_name", ColumnType::Text),
        column("rating", ColumnType::Float),
    ],
    partition_key: &["customer_id"],
    clustering_key: &["movie_id"],
};

static CUSTOMER_QUEUE: TableSchema = TableSchema {
    table: Table::CustomerQueue,
    name: "customer_queue",
    columns: &[
        column("customer_id", ColumnType::Int),
        column("queued_at", ColumnType::Timestamp),
        column("customer_name", ColumnType::Text),
        column("movie_id", ColumnType::Int),
        column("movie_name", ColumnType::Text),
    ],
    partition_key: &["customer_id"],
    clustering_key: &["queued_at"],
};

static MOVIES_GENRE: TableSchema = TableSchema {
    table: Table::MoviesGenre,
    name: "movies_genre",
    columns: &[
        column("genre", ColumnType::Text),
        column("release_year", ColumnType::Int),
        column("movie_id", ColumnType::Int),
        column("duration", ColumnType::Int),
        column("movie_name", ColumnType::Text),
    ],
    partition_key: &["genre"],
    clustering_key: &["release_year", "movie_id"],
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_table_names_match_schema_names() {
        for table in Table::iter() {
            assert_eq!(table.to_string(), table.schema().name);
            assert_eq!(table.schema().table, table);
            assert_eq!(Table::from_str(table.schema().name).unwrap(), table);
        }
    }

    #[test]
    fn test_every_key_column_exists() {
        for table in Table::iter() {
            let schema = table.schema();
            let key_len = schema.partition_key.len() + schema.clustering_key.len();
            assert_eq!(schema.primary_key().count(), key_len, "{}", schema.name);
            assert_eq!(schema.primary_key_positions().len(), key_len);
        }
    }

    #[test]
    fn test_movies_genre_primary_key_order() {
        let schema = Table::MoviesGenre.schema();
        let key: Vec<&str> = schema.primary_key().map(|c| c.name).collect();
        assert_eq!(key, vec!["genre", "release_year", "movie_id"]);
        assert_eq!(schema.primary_key_positions(), vec![0, 1, 2]);
    }

    #[test]
    fn test_customer_queue_clusters_on_timestamp() {
        let schema = Table::CustomerQueue.schema();
        assert_eq!(schema.primary_key_positions(), vec![0, 1]);
        assert_eq!(schema.column("queued_at").unwrap().kind, ColumnType::Timestamp);
    }

    #[test]
    fn test_unknown_table_name() {
        assert!(Table::from_str("movies").is_err());
    }
}
