//! Movies Domain
//!
//! Data access for the movie catalog: four denormalized tables written in
//! batches and read back by primary key.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ SchemaManager│   │  BatchWriter │   │  run_query   │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        │                  │ codec           │
//!        └──────────────────┼──────────────────┘
//!                    ┌──────▼──────┐
//!                    │  Session    │  ← database::cassandra
//!                    └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use database::cassandra::{CassandraConfig, ConnectionManager};
//! use domain_movies::{BatchWriter, SchemaManager, Table, WriteMode};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut manager = ConnectionManager::new(CassandraConfig::new(vec!["127.0.0.1:9042"]));
//! let session = manager.connect().await?;
//!
//! SchemaManager::new(session.clone()).create_schema("movies", 1).await?;
//!
//! let writer = BatchWriter::new(session, "movies")?;
//! let rows = vec![(1, vec!["7", "42", "1609459200000", "15", "Inception"])];
//! let result = writer
//!     .batch_insert(Table::WatchHistory, rows, WriteMode::Sync)
//!     .await?
//!     .wait()
//!     .await?;
//! assert_eq!(result.rows, 1);
//!
//! manager.close();
//! # Ok(())
//! # }
//! ```

pub mod cassandra;
pub mod codec;
pub mod ddl;
pub mod error;
pub mod models;
pub mod query;
pub mod repository;
pub mod schema;
pub mod writer;

// Re-export commonly used types
pub use cassandra::CassandraCatalogRepository;
pub use codec::FieldValue;
pub use ddl::SchemaManager;
pub use error::{CatalogError, CatalogResult, CodecError};
pub use models::{CatalogRecord, CustomerQueue, CustomerRating, MovieGenre, WatchHistory};
pub use query::{QueryOutput, run_query};
pub use repository::{CatalogRepository, InMemoryCatalogRepository, RawRows};
pub use schema::{ColumnType, Table, TableSchema};
pub use writer::{BatchWriter, PendingWrite, WriteMode, WriteOutcome, WriteResult};
