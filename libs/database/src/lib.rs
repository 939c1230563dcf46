//! Database library providing Cassandra/ScyllaDB connection management
//!
//! # Features
//!
//! - `config` - `CassandraConfig::from_env()` via `core_config::FromEnv`
//!
//! # Example
//!
//! ```ignore
//! use database::cassandra::{self, CassandraConfig, ConnectionManager};
//!
//! let session = cassandra::connect(&["127.0.0.1:9042"], None).await?;
//!
//! // Owned lifecycle with reconnection
//! let mut manager = ConnectionManager::new(CassandraConfig::with_keyspace(
//!     vec!["127.0.0.1:9042"],
//!     "movies",
//! ));
//! let session = manager.ensure_connected().await?;
//! manager.close();
//! ```

pub mod cassandra;
pub mod common;

pub use cassandra::{CassandraError, CassandraSession};
