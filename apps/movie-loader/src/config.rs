//! Configuration for the movie loader

use core_config::{Environment, FromEnv, env_parse};
use database::cassandra::CassandraConfig;
use eyre::{Result, ensure};

pub const DEFAULT_KEYSPACE: &str = "movies";
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// Connection settings; sessions stay unbound so the keyspace can be created and dropped
    pub cassandra: CassandraConfig,
    /// Keyspace holding the catalog tables
    pub keyspace: String,
    /// Upper bound on rows per batch
    pub batch_size: usize,
    pub replication_factor: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_env();
        let mut cassandra = CassandraConfig::from_env()?; // Required - CASSANDRA_CONTACT_POINTS
        let keyspace = cassandra
            .keyspace
            .take()
            .unwrap_or_else(|| DEFAULT_KEYSPACE.to_string());

        let batch_size = env_parse("LOADER_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        ensure!(batch_size > 0, "LOADER_BATCH_SIZE must be at least 1");

        Ok(Self {
            environment,
            cassandra,
            keyspace,
            batch_size,
            replication_factor: env_parse("LOADER_REPLICATION_FACTOR", 1)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", Some("10.0.0.1:9042,10.0.0.2:9042")),
                ("CASSANDRA_KEYSPACE", None),
                ("LOADER_BATCH_SIZE", None),
                ("LOADER_REPLICATION_FACTOR", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.keyspace, "movies");
                assert_eq!(config.batch_size, 100);
                assert_eq!(config.replication_factor, 1);
                assert_eq!(config.cassandra.contact_points.len(), 2);
                assert!(config.cassandra.keyspace.is_none());
            },
        );
    }

    #[test]
    fn test_config_keyspace_moves_out_of_session_config() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", Some("127.0.0.1:9042")),
                ("CASSANDRA_KEYSPACE", Some("catalog")),
                ("LOADER_BATCH_SIZE", Some("25")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.keyspace, "catalog");
                assert_eq!(config.batch_size, 25);
                assert!(config.cassandra.keyspace.is_none());
            },
        );
    }

    #[test]
    fn test_config_rejects_zero_batch_size() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", Some("127.0.0.1:9042")),
                ("LOADER_BATCH_SIZE", Some("0")),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }

    #[test]
    fn test_config_requires_contact_points() {
        temp_env::with_var_unset("CASSANDRA_CONTACT_POINTS", || {
            assert!(Config::from_env().is_err());
        });
    }
}
