use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::errors::ExecutionError;
use scylla::policies::load_balancing::DefaultPolicy;
use scylla::policies::retry::DowngradingConsistencyRetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::CassandraConfig;
use super::health::{check_health, get_cluster_info};
use crate::common::{ConstantReconnectionPolicy, ReconnectionPolicy, reconnect_with_policy};

/// Error type for Cassandra operations
#[derive(Debug, thiserror::Error)]
pub enum CassandraError {
    /// No contact point could be reached, or the new session failed verification
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Not connected: call connect() first")]
    NotConnected,
}

/// Shared session handle; the driver multiplexes concurrent requests over it
pub type CassandraSession = Arc<Session>;

/// Default execution profile applied to every request on the session
///
/// Requests that fail for lack of replica acknowledgements are retried once
/// at a lower consistency level before the error reaches the caller.
fn execution_profile(config: &CassandraConfig) -> ExecutionProfile {
    let mut builder = ExecutionProfile::builder()
        .consistency(config.consistency)
        .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)))
        .retry_policy(Arc::new(DowngradingConsistencyRetryPolicy::new()));

    if let Some(ref datacenter) = config.local_datacenter {
        builder = builder.load_balancing_policy(
            DefaultPolicy::builder()
                .prefer_datacenter(datacenter.clone())
                .build(),
        );
    }

    builder.build()
}

/// Connect to a cluster from a list of contact points, optionally binding a keyspace
///
/// # Example
/// ```ignore
/// use database::cassandra::connect;
///
/// let session = connect(&["127.0.0.1:9042"], Some("movies")).await?;
/// ```
pub async fn connect(
    contact_points: &[impl AsRef<str>],
    keyspace: Option<&str>,
) -> Result<CassandraSession, CassandraError> {
    let points: Vec<&str> = contact_points.iter().map(|s| s.as_ref()).collect();
    let config = match keyspace {
        Some(keyspace) => CassandraConfig::with_keyspace(points, keyspace),
        None => CassandraConfig::new(points),
    };
    connect_from_config(&config).await
}

/// Connect using a CassandraConfig
///
/// Builds the session with the downgrading retry policy, verifies it against
/// `system.local` and logs the discovered topology.
#[instrument(skip(config), fields(contact_points = ?config.contact_points))]
pub async fn connect_from_config(
    config: &CassandraConfig,
) -> Result<CassandraSession, CassandraError> {
    if config.contact_points.is_empty() {
        return Err(CassandraError::ConnectionFailed(
            "no contact points configured".to_string(),
        ));
    }

    info!("Attempting to connect to Cassandra");

    let mut builder = SessionBuilder::new()
        .known_nodes(&config.contact_points)
        .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
        .default_execution_profile_handle(execution_profile(config).into_handle());

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        builder = builder.user(username, password);
    }

    if let Some(ref keyspace) = config.keyspace {
        builder = builder.use_keyspace(keyspace, true);
    }

    let session: Session = builder
        .build()
        .await
        .map_err(|e| CassandraError::ConnectionFailed(e.to_string()))?;

    let cluster = get_cluster_info(&session)
        .await
        .map_err(|e| CassandraError::ConnectionFailed(e.to_string()))?;
    info!(
        cluster = cluster.cluster_name.as_deref().unwrap_or("unknown"),
        version = cluster.release_version.as_deref().unwrap_or("unknown"),
        "Connected to cluster"
    );
    log_topology(&session);

    Ok(Arc::new(session))
}

/// Connect, retrying forever (or up to the policy's cap) at the policy's interval
pub async fn connect_with_reconnection(
    config: &CassandraConfig,
    policy: &dyn ReconnectionPolicy,
) -> Result<CassandraSession, CassandraError> {
    reconnect_with_policy(|| connect_from_config(config), policy).await
}

fn log_topology(session: &Session) {
    let state = session.get_cluster_state();
    for node in state.get_nodes_info() {
        debug!(
            datacenter = node.datacenter.as_deref().unwrap_or("-"),
            host = ?node.address,
            rack = node.rack.as_deref().unwrap_or("-"),
            "Discovered node"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionStep {
    Reuse,
    Reconnect,
    Connect,
}

impl ConnectionStep {
    /// `health` is `None` when no session is open
    fn from_health(health: Option<bool>) -> Self {
        match health {
            Some(true) => Self::Reuse,
            Some(false) => Self::Reconnect,
            None => Self::Connect,
        }
    }
}

/// Owns the lifecycle of one cluster session
///
/// Opening is idempotent: a second `connect` returns the already-open session.
/// Closing is idempotent as well. Both take `&mut self`, so they cannot run
/// while the manager is borrowed elsewhere; writes that hold a cloned
/// [`CassandraSession`] must be finished or abandoned before `close`.
///
/// # Example
/// ```ignore
/// use database::cassandra::{CassandraConfig, ConnectionManager};
///
/// let mut manager = ConnectionManager::new(CassandraConfig::with_keyspace(
///     vec!["127.0.0.1:9042"],
///     "movies",
/// ));
/// let session = manager.connect().await?;
/// // ... use session ...
/// manager.close();
/// ```
#[derive(Debug)]
pub struct ConnectionManager {
    config: CassandraConfig,
    policy: Box<dyn ReconnectionPolicy>,
    session: Option<CassandraSession>,
}

impl ConnectionManager {
    /// Create a disconnected manager; reconnection uses a constant delay from the config
    pub fn new(config: CassandraConfig) -> Self {
        let policy = ConstantReconnectionPolicy::from_millis(config.reconnect_delay_ms);
        Self {
            config,
            policy: Box::new(policy),
            session: None,
        }
    }

    pub fn with_reconnection_policy(mut self, policy: impl ReconnectionPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn config(&self) -> &CassandraConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Open the session, or return the one already open
    pub async fn connect(&mut self) -> Result<CassandraSession, CassandraError> {
        if let Some(ref session) = self.session {
            debug!("Session already open, reusing it");
            return Ok(session.clone());
        }

        let session = connect_from_config(&self.config).await?;
        self.session = Some(session.clone());
        Ok(session)
    }

    /// The live session
    pub fn session(&self) -> Result<&CassandraSession, CassandraError> {
        self.session.as_ref().ok_or(CassandraError::NotConnected)
    }

    /// Drop the current session and re-establish one under the reconnection policy
    pub async fn reconnect(&mut self) -> Result<CassandraSession, CassandraError> {
        if self.session.take().is_some() {
            info!("Dropping current session before reconnecting");
        }

        let session = connect_with_reconnection(&self.config, self.policy.as_ref()).await?;
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Return a healthy session, reconnecting if the current one stopped answering
    ///
    /// Nothing reconnects in the background: callers drive reconnection by
    /// calling this before each unit of work instead of holding on to a
    /// session from [`connect`](Self::connect).
    pub async fn ensure_connected(&mut self) -> Result<CassandraSession, CassandraError> {
        let health = match &self.session {
            Some(session) => Some(check_health(session).await),
            None => None,
        };

        match (ConnectionStep::from_health(health), self.session.clone()) {
            (ConnectionStep::Reuse, Some(session)) => Ok(session),
            (ConnectionStep::Reconnect, _) => {
                warn!("Session failed health check, reconnecting");
                self.reconnect().await
            }
            _ => self.connect().await,
        }
    }

    /// Release the session; calling this on a closed manager does nothing
    pub fn close(&mut self) {
        match self.session.take() {
            Some(session) => {
                let other_holders = Arc::strong_count(&session) - 1;
                drop(session);
                if other_holders > 0 {
                    debug!(
                        other_holders,
                        "Session still referenced elsewhere, it closes when they finish"
                    );
                }
                info!("Successfully closed session");
            }
            None => debug!("Session already closed"),
        }
    }
}
