//! ScyllaDB test infrastructure
//!
//! Provides a `TestScylla` helper that runs a single-node ScyllaDB container.

use database::cassandra::{CassandraConfig, CassandraSession, connect_with_reconnection};
use database::common::ConstantReconnectionPolicy;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

const SCYLLA_IMAGE: &str = "scylladb/scylla";
const SCYLLA_TAG: &str = "6.2";
const CQL_PORT: u16 = 9042;

/// Test ScyllaDB wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::TestScylla;
///
/// # async fn example() {
/// let scylla = TestScylla::new().await;
/// let session = scylla.session();
/// session.query_unpaged("SELECT now() FROM system.local", &[]).await.unwrap();
/// # }
/// ```
pub struct TestScylla {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    session: CassandraSession,
    pub contact_point: String,
}

impl TestScylla {
    /// Start a developer-mode ScyllaDB node and connect to it
    pub async fn new() -> Self {
        let container = GenericImage::new(SCYLLA_IMAGE, SCYLLA_TAG)
            .with_exposed_port(CQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("initialization completed"))
            .with_cmd([
                "--smp",
                "1",
                "--memory",
                "512M",
                "--overprovisioned",
                "1",
                "--developer-mode",
                "1",
            ])
            .with_startup_timeout(Duration::from_secs(180))
            .start()
            .await
            .expect("Failed to start ScyllaDB container");

        let host_port = container
            .get_host_port_ipv4(CQL_PORT)
            .await
            .expect("Failed to get ScyllaDB port");

        let contact_point = format!("127.0.0.1:{}", host_port);
        let config = CassandraConfig::new(vec![contact_point.clone()]);

        // The CQL port may open a moment after the log line
        let policy = ConstantReconnectionPolicy::from_millis(500).with_max_attempts(60);
        let session = connect_with_reconnection(&config, &policy)
            .await
            .expect("Failed to connect to ScyllaDB");

        tracing::info!(port = host_port, "Test ScyllaDB ready ({}:{})", SCYLLA_IMAGE, SCYLLA_TAG);

        Self {
            container,
            session,
            contact_point,
        }
    }

    /// Get a shared handle to the session (useful for passing to writers)
    pub fn session(&self) -> CassandraSession {
        self.session.clone()
    }

    /// Config pointing at this container, for tests that manage their own connection
    pub fn config(&self) -> CassandraConfig {
        CassandraConfig::new(vec![self.contact_point.clone()])
    }
}
