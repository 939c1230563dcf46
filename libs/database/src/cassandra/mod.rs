//! Cassandra/ScyllaDB connection management
//!
//! Uses the `scylla` driver, which speaks to both Apache Cassandra and ScyllaDB.
//! Every session carries a downgrading-consistency retry policy, and
//! [`ConnectionManager`] re-establishes dropped sessions at a constant interval.
//!
//! # Example
//!
//! ```ignore
//! use database::cassandra::{CassandraConfig, ConnectionManager};
//!
//! let config = CassandraConfig::with_keyspace(vec!["127.0.0.1:9042"], "movies")
//!     .with_datacenter("dc1");
//! let mut manager = ConnectionManager::new(config);
//! let session = manager.connect().await?;
//! session.query_unpaged("SELECT * FROM watch_history", &[]).await?;
//! manager.close();
//! ```

mod config;
mod connector;
mod health;

pub use config::{CassandraConfig, parse_consistency};
pub use connector::{
    CassandraError, CassandraSession, ConnectionManager, connect, connect_from_config,
    connect_with_reconnection,
};
pub use health::{ClusterInfo, check_health, get_cluster_info};

// Re-export scylla types for convenience
pub use scylla::client::session::Session;
pub use scylla::statement::Consistency;
pub use scylla::value::CqlValue;
