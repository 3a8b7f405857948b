//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use policy_tree::properties::{RouteId, RouteWithId};

/// Full Alertmanager configuration with a four level policy tree.
pub const ALERTMANAGER_YAML: &str = include_str!("../fixtures/alertmanager.yaml");

/// Routing tree resource as served by the per-resource API.
pub const ROUTING_TREE_JSON: &str = include_str!("../fixtures/routing_tree.json");

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times, subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Identity of the first policy (pre-order) whose own receiver is `receiver`.
#[allow(dead_code)]
pub fn id_of(tree: &RouteWithId, receiver: &str) -> RouteId {
    tree.iter()
        .find(|node| node.receiver.as_deref() == Some(receiver))
        .map(|node| node.id)
        .unwrap_or_else(|| panic!("no policy with receiver {receiver}"))
}
