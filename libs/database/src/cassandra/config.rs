use scylla::statement::Consistency;

#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_list, env_parse};

use crate::common::DEFAULT_RECONNECT_DELAY_MS;

/// Cassandra/ScyllaDB connection configuration
///
/// Can be constructed manually or loaded from environment variables (with the
/// `config` feature).
///
/// # Example
///
/// ```ignore
/// use database::cassandra::CassandraConfig;
///
/// let config = CassandraConfig::with_keyspace(vec!["127.0.0.1:9042"], "movies")
///     .with_reconnect_delay(250);
///
/// // From environment variables (requires `config` feature)
/// let config = CassandraConfig::from_env()?;
/// ```
#[derive(Clone, Debug)]
pub struct CassandraConfig {
    /// Contact points (host:port pairs) used to discover the rest of the cluster
    pub contact_points: Vec<String>,

    /// Keyspace the session is bound to, if any
    pub keyspace: Option<String>,

    /// Optional datacenter for DC-aware load balancing
    pub local_datacenter: Option<String>,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Fixed delay between reconnection attempts after a connection drop
    pub reconnect_delay_ms: u64,

    /// Consistency level of the default execution profile
    pub consistency: Consistency,
}

impl CassandraConfig {
    /// Create a keyspace-less config for the given contact points
    pub fn new<S: Into<String>>(contact_points: Vec<S>) -> Self {
        Self {
            contact_points: contact_points.into_iter().map(|s| s.into()).collect(),
            ..Self::default()
        }
    }

    /// Create a config whose sessions are bound to `keyspace`
    pub fn with_keyspace<S: Into<String>>(
        contact_points: Vec<S>,
        keyspace: impl Into<String>,
    ) -> Self {
        Self {
            keyspace: Some(keyspace.into()),
            ..Self::new(contact_points)
        }
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.local_datacenter = Some(datacenter.into());
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_reconnect_delay(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn contact_points(&self) -> &[String] {
        &self.contact_points
    }

    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }
}

impl Default for CassandraConfig {
    fn default() -> Self {
        Self {
            contact_points: vec!["127.0.0.1:9042".to_string()],
            keyspace: None,
            local_datacenter: None,
            username: None,
            password: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            consistency: Consistency::LocalQuorum,
        }
    }
}

/// Parse a consistency level name such as `ONE`, `local_quorum` or `EACH_QUORUM`
pub fn parse_consistency(name: &str) -> Option<Consistency> {
    let consistency = match name.trim().to_ascii_uppercase().as_str() {
        "ANY" => Consistency::Any,
        "ONE" => Consistency::One,
        "TWO" => Consistency::Two,
        "THREE" => Consistency::Three,
        "QUORUM" => Consistency::Quorum,
        "ALL" => Consistency::All,
        "LOCAL_QUORUM" => Consistency::LocalQuorum,
        "EACH_QUORUM" => Consistency::EachQuorum,
        "LOCAL_ONE" => Consistency::LocalOne,
        _ => return None,
    };
    Some(consistency)
}

/// Load CassandraConfig from environment variables
///
/// Environment variables:
/// - `CASSANDRA_CONTACT_POINTS` (required) - comma-separated `host:port` list
/// - `CASSANDRA_KEYSPACE` (optional)
/// - `CASSANDRA_DATACENTER` (optional)
/// - `CASSANDRA_USERNAME` / `CASSANDRA_PASSWORD` (optional)
/// - `CASSANDRA_CONNECT_TIMEOUT_SECS` (default: 10)
/// - `CASSANDRA_REQUEST_TIMEOUT_SECS` (default: 30)
/// - `CASSANDRA_RECONNECT_DELAY_MS` (default: 100)
/// - `CASSANDRA_CONSISTENCY` (default: LOCAL_QUORUM)
#[cfg(feature = "config")]
impl FromEnv for CassandraConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let contact_points = env_list("CASSANDRA_CONTACT_POINTS")?;

        let consistency = match std::env::var("CASSANDRA_CONSISTENCY") {
            Ok(name) => parse_consistency(&name).ok_or_else(|| ConfigError::ParseError {
                key: "CASSANDRA_CONSISTENCY".to_string(),
                details: format!("unknown consistency level '{}'", name),
            })?,
            Err(_) => Consistency::LocalQuorum,
        };

        Ok(Self {
            contact_points,
            keyspace: std::env::var("CASSANDRA_KEYSPACE").ok(),
            local_datacenter: std::env::var("CASSANDRA_DATACENTER").ok(),
            username: std::env::var("CASSANDRA_USERNAME").ok(),
            password: std::env::var("CASSANDRA_PASSWORD").ok(),
            connect_timeout_secs: env_parse("CASSANDRA_CONNECT_TIMEOUT_SECS", 10)?,
            request_timeout_secs: env_parse("CASSANDRA_REQUEST_TIMEOUT_SECS", 30)?,
            reconnect_delay_ms: env_parse(
                "CASSANDRA_RECONNECT_DELAY_MS",
                DEFAULT_RECONNECT_DELAY_MS,
            )?,
            consistency,
        })
    }
}
