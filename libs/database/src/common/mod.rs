//! Utilities shared by the database connectors

pub mod reconnect;

pub use reconnect::{
    ConstantReconnectionPolicy, DEFAULT_RECONNECT_DELAY_MS, ReconnectionPolicy,
    reconnect_with_policy,
};
