//! Routing tree engine: pure operations over a [RouteWithId](crate::properties::RouteWithId) tree.
//!
//! Every operation takes the tree by reference and returns a new value. Nothing here performs
//! I/O or holds state, so the functions may be called from any thread.
//!
//! Traversals recurse once per level. Trees deeper than
//! [MAX_TREE_DEPTH](crate::properties::MAX_TREE_DEPTH) are refused with
//! [PolicyError::TreeTooDeep](crate::PolicyError::TreeTooDeep) when identities are assigned and
//! when an insert would exceed the limit.
//!
//! # Module Organization
//!
//! - [`identity`]: assign node identities on fetch, strip them before persisting
//! - [`locate`]: depth-first lookup of a node, its parent and its sibling index
//! - [`mutate`]: insert / delete / patch operations
//! - [`inherit`]: effective (inherited) grouping, timing and receiver values
//! - [`filter`]: contact point and label matcher filtering with ancestor paths
//! - [`conflict`]: concurrent modification guard used at commit time
//!
//! ```rust
//! use policy_tree::{
//!     properties::{MatcherOperator, ObjectMatcher, Route},
//!     routetree::{assign_identities, find_matches, insert_child, resolve, RouteFilters},
//! };
//!
//! # fn main() -> Result<(), policy_tree::PolicyError> {
//! let root = assign_identities(&Route {
//!     receiver: Some("default".to_string()),
//!     ..Default::default()
//! })?;
//! let child = assign_identities(&Route {
//!     receiver: Some("pager".to_string()),
//!     object_matchers: Some(vec![ObjectMatcher::new("sev", MatcherOperator::Equal, "crit")]),
//!     ..Default::default()
//! })?;
//! let tree = insert_child(&root, &root.id, child)?;
//!
//! let filters = RouteFilters {
//!     contact_point: Some("pager".to_string()),
//!     ..Default::default()
//! };
//! let result = find_matches(&resolve(&tree), &filters);
//! assert_eq!(result.matches.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod conflict;
pub mod filter;
pub mod identity;
pub mod inherit;
pub mod locate;
pub mod mutate;

#[cfg(test)]
mod tests;

pub use conflict::assert_unchanged;
pub use filter::{find_matches, find_routes_matching, MatchResult, RouteFilters, RouteMatch};
pub use identity::{assign_identities, strip_identities};
pub use inherit::{
    inherited_properties, resolve, resolve_with_defaults, InheritedProperties, ResolvedRoute,
};
pub use locate::{locate, Located};
pub use mutate::{
    delete_node, insert_above, insert_below, insert_child, insert_route, replace_node,
    InsertPosition,
};
