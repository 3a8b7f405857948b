//! Data model of a notification policy tree.
//!
//! - [Route] is the raw, serialized shape exchanged with the alerting API. Label conditions may
//!   be expressed in any of the four legacy forms (`match`, `match_re`, `matchers`,
//!   `object_matchers`).
//! - [RouteWithId] is the working shape: every node carries a [RouteId] and a single normalized
//!   list of [ObjectMatcher] triples. It is produced by
//!   [crate::routetree::assign_identities] and turned back into a [Route] by
//!   [crate::routetree::strip_identities].
use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    str::FromStr,
};
use uuid::Uuid;

use crate::{matchers, PolicyError};

/// Provenance value the API uses for policies that are editable in the UI.
pub const PROVENANCE_NONE: &str = "none";

/// Deepest nesting, root included, that the tree operations accept. They recurse once per
/// level.
pub const MAX_TREE_DEPTH: usize = 128;

/// Identity of a node within one tree snapshot.
///
/// Identities are generated when a tree is fetched and never travel back to the API. Two
/// snapshots of the same logical tree will carry different identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(Uuid);

impl RouteId {
    pub fn new() -> Self {
        RouteId(Uuid::new_v4())
    }
}

impl Default for RouteId {
    fn default() -> Self {
        RouteId::new()
    }
}

impl AsRef<RouteId> for RouteId {
    fn as_ref(&self) -> &RouteId {
        self
    }
}

impl Display for RouteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RouteId {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RouteId(Uuid::parse_str(s)?))
    }
}

/// The four label matching operators understood by Alertmanager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatcherOperator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "=~")]
    Regex,
    #[serde(rename = "!~")]
    NotRegex,
}

impl MatcherOperator {
    /// Ordered so that multi-character operators are tried before their one character prefix.
    pub const ALL: [MatcherOperator; 4] = [
        MatcherOperator::Regex,
        MatcherOperator::NotRegex,
        MatcherOperator::NotEqual,
        MatcherOperator::Equal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatcherOperator::Equal => "=",
            MatcherOperator::NotEqual => "!=",
            MatcherOperator::Regex => "=~",
            MatcherOperator::NotRegex => "!~",
        }
    }
}

impl Display for MatcherOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatcherOperator {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatcherOperator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| PolicyError::InvalidMatcherOperator(s.to_string()))
    }
}

/// Canonical `(label name, operator, value)` matcher. Serializes as a three element array, the
/// `object_matchers` wire form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectMatcher(pub String, pub MatcherOperator, pub String);

impl ObjectMatcher {
    pub fn new(name: impl Into<String>, operator: MatcherOperator, value: impl Into<String>) -> Self {
        ObjectMatcher(name.into(), operator, value.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn operator(&self) -> MatcherOperator {
        self.1
    }

    pub fn value(&self) -> &str {
        &self.2
    }
}

impl Display for ObjectMatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&matchers::matcher_to_string(self))
    }
}

impl FromStr for ObjectMatcher {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        matchers::parse_matcher(s)
    }
}

fn is_false(value: &bool) -> bool {
    !value
}

/// A route as the alerting API serializes it (Alertmanager configuration `route` shape).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_wait: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_interval: Option<String>,
    /// Deprecated equality matchers.
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,
    /// Deprecated regex matchers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_re: Option<BTreeMap<String, String>>,
    /// Matchers in string form, e.g. `severity="critical"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matchers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_matchers: Option<Vec<ObjectMatcher>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mute_time_intervals: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_time_intervals: Option<Vec<String>>,
    #[serde(default, rename = "continue", skip_serializing_if = "is_false")]
    pub continue_matching: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
}

impl Route {
    /// Number of levels in this subtree, counting this node as 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.routes.iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

/// A route node with a stable identity and normalized matchers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteWithId {
    pub id: RouteId,
    pub receiver: Option<String>,
    pub group_by: Option<Vec<String>>,
    pub group_wait: Option<String>,
    pub group_interval: Option<String>,
    pub repeat_interval: Option<String>,
    pub matchers: Vec<ObjectMatcher>,
    pub mute_time_intervals: Vec<String>,
    pub active_time_intervals: Vec<String>,
    pub continue_matching: bool,
    pub provenance: Option<String>,
    pub routes: Vec<RouteWithId>,
}

impl RouteWithId {
    /// Externally managed (file or API provisioned) policies are read-only in the editor.
    pub fn is_provisioned(&self) -> bool {
        self.provenance
            .as_deref()
            .map(|p| !p.is_empty() && p != PROVENANCE_NONE)
            .unwrap_or(false)
    }

    /// Pre-order traversal over this node and all of its descendants.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Number of levels in this subtree, counting this node as 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.routes.iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// Whether the node declares its own value for `property`.
    pub fn overrides(&self, property: InheritableProperty) -> bool {
        match property {
            InheritableProperty::Receiver => self.receiver.is_some(),
            InheritableProperty::GroupBy => self.group_by.as_ref().is_some_and(|g| !g.is_empty()),
            InheritableProperty::GroupWait => self.group_wait.is_some(),
            InheritableProperty::GroupInterval => self.group_interval.is_some(),
            InheritableProperty::RepeatInterval => self.repeat_interval.is_some(),
        }
    }

    /// Set of properties for which the node declares a value.
    pub fn overridden(&self) -> EnumSet<InheritableProperty> {
        EnumSet::all()
            .iter()
            .filter(|p| self.overrides(*p))
            .collect()
    }
}

pub struct PreOrder<'a> {
    stack: Vec<&'a RouteWithId>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a RouteWithId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.routes.iter().rev());
        Some(node)
    }
}

/// Properties a node takes from its nearest ancestor when it does not set them itself.
#[derive(Debug, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
#[enumset(serialize_repr = "list")]
pub enum InheritableProperty {
    Receiver,
    GroupBy,
    GroupWait,
    GroupInterval,
    RepeatInterval,
}

/// Sparse update for a single node, as submitted by a policy edit form.
///
/// Properties listed in `clear` are unset first (so the node inherits them again), then every
/// field that is `Some` replaces the node's value. Identity and children are never touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePatch {
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub group_by: Option<Vec<String>>,
    #[serde(default)]
    pub group_wait: Option<String>,
    #[serde(default)]
    pub group_interval: Option<String>,
    #[serde(default)]
    pub repeat_interval: Option<String>,
    #[serde(default)]
    pub matchers: Option<Vec<ObjectMatcher>>,
    #[serde(default)]
    pub mute_time_intervals: Option<Vec<String>>,
    #[serde(default)]
    pub active_time_intervals: Option<Vec<String>>,
    #[serde(default)]
    pub continue_matching: Option<bool>,
    #[serde(default)]
    pub clear: EnumSet<InheritableProperty>,
}

impl RoutePatch {
    pub fn apply_to(&self, route: &RouteWithId) -> RouteWithId {
        let mut merged = route.clone();
        for property in self.clear {
            match property {
                InheritableProperty::Receiver => merged.receiver = None,
                InheritableProperty::GroupBy => merged.group_by = None,
                InheritableProperty::GroupWait => merged.group_wait = None,
                InheritableProperty::GroupInterval => merged.group_interval = None,
                InheritableProperty::RepeatInterval => merged.repeat_interval = None,
            }
        }
        if let Some(receiver) = &self.receiver {
            merged.receiver = Some(receiver.clone());
        }
        if let Some(group_by) = &self.group_by {
            merged.group_by = Some(group_by.clone());
        }
        if let Some(group_wait) = &self.group_wait {
            merged.group_wait = Some(group_wait.clone());
        }
        if let Some(group_interval) = &self.group_interval {
            merged.group_interval = Some(group_interval.clone());
        }
        if let Some(repeat_interval) = &self.repeat_interval {
            merged.repeat_interval = Some(repeat_interval.clone());
        }
        if let Some(matchers) = &self.matchers {
            merged.matchers = matchers.clone();
        }
        if let Some(intervals) = &self.mute_time_intervals {
            merged.mute_time_intervals = intervals.clone();
        }
        if let Some(intervals) = &self.active_time_intervals {
            merged.active_time_intervals = intervals.clone();
        }
        if let Some(continue_matching) = self.continue_matching {
            merged.continue_matching = continue_matching;
        }
        merged
    }
}

/// Tree level metadata delivered next to the raw tree by the fetch boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeMetadata {
    #[serde(default)]
    pub provenance: Option<String>,
    #[serde(default)]
    pub resource_version: Option<String>,
}
