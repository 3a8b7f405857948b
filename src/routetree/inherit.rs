use enumset::EnumSet;
use serde::{Deserialize, Serialize};

use crate::{
    config::PolicyDefaults,
    properties::{InheritableProperty, ObjectMatcher, RouteId, RouteWithId},
};

/// A policy with every inheritable property replaced by its effective value.
///
/// `mute_time_intervals` and `active_time_intervals` are the node's own lists; they are never
/// inherited. `inherited` records which properties came from an ancestor or the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRoute {
    pub id: RouteId,
    pub receiver: Option<String>,
    pub group_by: Vec<String>,
    pub group_wait: String,
    pub group_interval: String,
    pub repeat_interval: String,
    pub matchers: Vec<ObjectMatcher>,
    pub mute_time_intervals: Vec<String>,
    pub active_time_intervals: Vec<String>,
    pub continue_matching: bool,
    pub provenance: Option<String>,
    pub inherited: EnumSet<InheritableProperty>,
    pub routes: Vec<ResolvedRoute>,
}

impl ResolvedRoute {
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedRoute> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.routes.iter().rev());
            Some(node)
        })
    }

    pub fn find(&self, id: &RouteId) -> Option<&ResolvedRoute> {
        self.iter().find(|node| node.id == *id)
    }
}

/// Values a child takes from its parent, for the properties the child does not set itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritedProperties {
    pub receiver: Option<String>,
    pub group_by: Option<Vec<String>>,
    pub group_wait: Option<String>,
    pub group_interval: Option<String>,
    pub repeat_interval: Option<String>,
}

pub fn inherited_properties(parent: &ResolvedRoute, child: &RouteWithId) -> InheritedProperties {
    let mut inherited = InheritedProperties::default();
    for property in EnumSet::<InheritableProperty>::all() - child.overridden() {
        match property {
            InheritableProperty::Receiver => inherited.receiver = parent.receiver.clone(),
            InheritableProperty::GroupBy => inherited.group_by = Some(parent.group_by.clone()),
            InheritableProperty::GroupWait => inherited.group_wait = Some(parent.group_wait.clone()),
            InheritableProperty::GroupInterval => {
                inherited.group_interval = Some(parent.group_interval.clone())
            }
            InheritableProperty::RepeatInterval => {
                inherited.repeat_interval = Some(parent.repeat_interval.clone())
            }
        }
    }
    inherited
}

/// Effective values of every policy, using the built-in [PolicyDefaults].
pub fn resolve(tree: &RouteWithId) -> ResolvedRoute {
    resolve_with_defaults(tree, &PolicyDefaults::default())
}

/// Effective values of every policy, falling back to `defaults` above the root.
///
/// Resolution is top-down: a child reads its parent's resolved values, never the raw ones.
pub fn resolve_with_defaults(tree: &RouteWithId, defaults: &PolicyDefaults) -> ResolvedRoute {
    let ceiling = Effective {
        receiver: defaults.receiver.as_deref(),
        group_by: &defaults.group_by,
        group_wait: &defaults.group_wait,
        group_interval: &defaults.group_interval,
        repeat_interval: &defaults.repeat_interval,
    };
    resolve_node(tree, &ceiling)
}

struct Effective<'a> {
    receiver: Option<&'a str>,
    group_by: &'a [String],
    group_wait: &'a str,
    group_interval: &'a str,
    repeat_interval: &'a str,
}

fn resolve_node(node: &RouteWithId, parent: &Effective<'_>) -> ResolvedRoute {
    let group_by = node
        .group_by
        .as_deref()
        .filter(|group_by| !group_by.is_empty())
        .unwrap_or(parent.group_by);
    let effective = Effective {
        receiver: node.receiver.as_deref().or(parent.receiver),
        group_by,
        group_wait: node.group_wait.as_deref().unwrap_or(parent.group_wait),
        group_interval: node.group_interval.as_deref().unwrap_or(parent.group_interval),
        repeat_interval: node
            .repeat_interval
            .as_deref()
            .unwrap_or(parent.repeat_interval),
    };
    let routes = node
        .routes
        .iter()
        .map(|child| resolve_node(child, &effective))
        .collect();

    ResolvedRoute {
        id: node.id,
        receiver: effective.receiver.map(str::to_string),
        group_by: effective.group_by.to_vec(),
        group_wait: effective.group_wait.to_string(),
        group_interval: effective.group_interval.to_string(),
        repeat_interval: effective.repeat_interval.to_string(),
        matchers: node.matchers.clone(),
        mute_time_intervals: node.mute_time_intervals.clone(),
        active_time_intervals: node.active_time_intervals.clone(),
        continue_matching: node.continue_matching,
        provenance: node.provenance.clone(),
        inherited: EnumSet::all() - node.overridden(),
        routes,
    }
}
