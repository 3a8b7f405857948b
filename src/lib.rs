//! # policy-tree
//!
//! Editing engine for notification policy trees, the routing trees that decide which contact
//! point receives an alert and how alerts are grouped and throttled on the way.
//!
//! ## Overview
//!
//! A policy tree is fetched in its raw, serialized form, given per-node identities, edited with
//! pure functional operations, and committed back only if nobody else changed it in the
//! meantime.
//!
//! ### Key Features
//!
//! - **Matcher normalization**: the four legacy matcher forms (`match`, `match_re`, `matchers`,
//!   `object_matchers`) collapse into one list of `(name, operator, value)` triples
//! - **Stable identities**: every node gets an identity for the lifetime of one editing session
//! - **Immutable edits**: insert, delete and patch return new trees and never touch their input
//! - **Inheritance**: effective receiver, grouping and timing values resolved top-down
//! - **Filtering**: contact point and label matcher filters with ancestor paths for display
//! - **Conflict guard**: commits are refused when the stored tree changed since it was loaded
//!
//! ## Architecture
//!
//! - **[`properties`]**: raw and identified route types, matchers, patches
//! - **[`matchers`]**: matcher string parsing, quoting and normalization
//! - **[`routetree`]**: the tree engine (identity, locate, mutate, inherit, filter, conflict)
//! - **[`codec`]**: Alertmanager configuration and routing tree resource transports
//! - **[`store`]**: fetch / commit boundary with optimistic concurrency
//! - **[`config`]**: fallback defaults for inheritance, read from TOML
//!
//! ## Quick Start
//!
//! ```rust
//! use policy_tree::{
//!     properties::{Route, RoutePatch},
//!     routetree::replace_node,
//!     store::{commit, load, InMemoryTreeStore, RoutingTreeStore},
//! };
//!
//! # fn main() -> Result<(), policy_tree::PolicyError> {
//! let store = InMemoryTreeStore::new(Route {
//!     receiver: Some("default".to_string()),
//!     ..Default::default()
//! })?;
//!
//! let loaded = load(&store)?;
//! let patch = RoutePatch {
//!     group_wait: Some("1m".to_string()),
//!     ..Default::default()
//! };
//! let edited = replace_node(&loaded.tree, &loaded.tree.id, &patch)?;
//! commit(&store, &loaded.tree, &edited)?;
//!
//! let (stored, _) = store.fetch()?;
//! assert_eq!(stored.group_wait.as_deref(), Some("1m"));
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod matchers;
pub mod properties;
pub mod routetree;
pub mod store;
#[cfg(test)]
mod tests;

pub use error::*;
