//! Shared test utilities for domain testing
//!
//! - `TestScylla`: ScyllaDB container with automatic cleanup (feature: "scylla")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Usage
//!
//! Add `features = ["scylla"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["scylla"] }
//! ```
//!
//! Then in your tests:
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestScylla};
//!
//! #[tokio::test]
//! async fn my_scylla_test() {
//!     let scylla = TestScylla::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let keyspace = builder.keyspace("movies");
//!     let customer_id = builder.customer_id();
//! }
//! ```

#[cfg(feature = "scylla")]
mod scylla;

#[cfg(feature = "scylla")]
pub use scylla::TestScylla;

/// Builder for test data with deterministic randomization
///
/// Tests sharing one container stay isolated by writing into their own
/// keyspace and customer partitions.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_batch_insert");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Keyspace name unique to this test, always a valid CQL identifier
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let keyspace = TestDataBuilder::new(42).keyspace("movies");
    /// assert_eq!(keyspace, "movies_42");
    /// ```
    pub fn keyspace(&self, prefix: &str) -> String {
        // 48 char identifier limit: prefix + '_' + up to 20 digits
        let prefix: String = prefix.chars().take(27).collect();
        format!("{}_{}", prefix, self.seed)
    }

    /// Positive customer id derived from the seed
    pub fn customer_id(&self) -> i32 {
        (self.seed % i32::MAX as u64) as i32 + 1
    }

    /// Movie id offset from the seed so tests can make several distinct ones
    pub fn movie_id(&self, n: i32) -> i32 {
        ((self.seed >> 32) % 1_000_000) as i32 * 100 + n
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
