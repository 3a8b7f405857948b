//! Transport shapes a policy tree travels in.
//!
//! The tree engine only ever sees a raw [Route](crate::properties::Route) plus
//! [TreeMetadata](crate::properties::TreeMetadata). The codecs here translate between that pair
//! and the documents the alerting API serves:
//!
//! - [`alertmanager::AlertmanagerConfig`] - the whole Alertmanager configuration, where the tree
//!   is the `route` field next to receivers and time intervals
//! - [`routing_tree::RoutingTree`] - the per-resource form, with tree-level `defaults` and
//!   structured `{label, type, value}` matchers
//!
//! Implement [TreeCodec] to plug another transport into a
//! [RoutingTreeStore](crate::store::RoutingTreeStore):
//!
//! ```rust
//! use policy_tree::{codec::{routing_tree::RoutingTreeCodec, TreeCodec}, properties::{Route, TreeMetadata}};
//!
//! let codec = RoutingTreeCodec::default();
//! let route = Route { receiver: Some("ops".to_string()), ..Default::default() };
//! let document = codec.encode("", &route, &TreeMetadata::default()).unwrap();
//! let (decoded, _metadata) = codec.decode(&document).unwrap();
//! assert_eq!(decoded.receiver.as_deref(), Some("ops"));
//! ```
pub mod alertmanager;
pub mod routing_tree;

use crate::{
    properties::{Route, TreeMetadata},
    PolicyError,
};

pub use alertmanager::{AlertmanagerCodec, AlertmanagerConfig, UnknownReference};
pub use routing_tree::{RoutingTree, RoutingTreeCodec};

/// Converts between a serialized transport document and a raw tree with its metadata.
pub trait TreeCodec: Send + Sync {
    fn decode(&self, document: &str) -> Result<(Route, TreeMetadata), PolicyError>;

    /// New document carrying `route`. `current` is the document being replaced; sections of it
    /// that do not hold the tree are carried over.
    fn encode(
        &self,
        current: &str,
        route: &Route,
        metadata: &TreeMetadata,
    ) -> Result<String, PolicyError>;
}
