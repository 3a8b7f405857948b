//! Per-resource routing tree representation.
//!
//! The root policy is flattened into `spec.defaults`, which cannot carry matchers. Sub-routes use
//! structured `{label, type, value}` matchers instead of the string and tuple forms.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::TreeCodec;
use crate::{
    matchers::normalize_matchers,
    properties::{MatcherOperator, ObjectMatcher, Route, RouteWithId, TreeMetadata},
    routetree::assign_identities,
    PolicyError,
};

/// Annotation carrying the provenance of the whole tree.
pub const PROVENANCE_ANNOTATION: &str = "grafana.com/provenance";
pub const DEFAULT_ROUTING_TREE_NAME: &str = "user-defined";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTreeMatcher {
    pub label: String,
    #[serde(rename = "type")]
    pub match_type: String,
    pub value: String,
}

impl TryFrom<&RoutingTreeMatcher> for ObjectMatcher {
    type Error = PolicyError;

    fn try_from(matcher: &RoutingTreeMatcher) -> Result<Self, Self::Error> {
        let operator: MatcherOperator = matcher.match_type.parse()?;
        Ok(ObjectMatcher::new(
            matcher.label.clone(),
            operator,
            matcher.value.clone(),
        ))
    }
}

impl From<&ObjectMatcher> for RoutingTreeMatcher {
    fn from(matcher: &ObjectMatcher) -> Self {
        RoutingTreeMatcher {
            label: matcher.name().to_string(),
            match_type: matcher.operator().as_str().to_string(),
            value: matcher.value().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDefaults {
    pub receiver: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_wait: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_interval: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<RoutingTreeMatcher>,
    #[serde(default, rename = "continue")]
    pub continue_matching: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mute_time_intervals: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_time_intervals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_wait: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<SubRoute>,
}

fn non_empty<T>(items: &[T]) -> Option<Vec<T>>
where
    T: Clone,
{
    (!items.is_empty()).then(|| items.to_vec())
}

impl SubRoute {
    fn to_route(&self) -> Result<Route, PolicyError> {
        let object_matchers = self
            .matchers
            .iter()
            .map(ObjectMatcher::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Route {
            receiver: self.receiver.clone(),
            group_by: self.group_by.clone(),
            group_wait: self.group_wait.clone(),
            group_interval: self.group_interval.clone(),
            repeat_interval: self.repeat_interval.clone(),
            object_matchers: non_empty(&object_matchers),
            mute_time_intervals: non_empty(&self.mute_time_intervals),
            active_time_intervals: non_empty(&self.active_time_intervals),
            continue_matching: self.continue_matching,
            routes: self
                .routes
                .iter()
                .map(SubRoute::to_route)
                .collect::<Result<Vec<_>, _>>()?,
            ..Default::default()
        })
    }

    fn from_route(route: &Route) -> Result<SubRoute, PolicyError> {
        Ok(SubRoute {
            receiver: route.receiver.clone(),
            matchers: normalize_matchers(route)?
                .iter()
                .map(RoutingTreeMatcher::from)
                .collect(),
            continue_matching: route.continue_matching,
            group_by: route.group_by.clone(),
            mute_time_intervals: route.mute_time_intervals.clone().unwrap_or_default(),
            active_time_intervals: route.active_time_intervals.clone().unwrap_or_default(),
            group_wait: route.group_wait.clone(),
            group_interval: route.group_interval.clone(),
            repeat_interval: route.repeat_interval.clone(),
            routes: route
                .routes
                .iter()
                .map(SubRoute::from_route)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTreeSpec {
    pub defaults: RouteDefaults,
    #[serde(default)]
    pub routes: Vec<SubRoute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTree {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: RoutingTreeSpec,
}

impl RoutingTree {
    pub fn from_json(content: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Raw tree plus the metadata carried on the resource.
    ///
    /// Fails with [PolicyError::InvalidMatcherOperator] when a matcher `type` is not one of the
    /// four known operators.
    pub fn to_route(&self) -> Result<(Route, TreeMetadata), PolicyError> {
        let defaults = &self.spec.defaults;
        let provenance = self.metadata.annotations.get(PROVENANCE_ANNOTATION).cloned();
        let route = Route {
            receiver: (!defaults.receiver.is_empty()).then(|| defaults.receiver.clone()),
            group_by: non_empty(&defaults.group_by),
            group_wait: defaults.group_wait.clone(),
            group_interval: defaults.group_interval.clone(),
            repeat_interval: defaults.repeat_interval.clone(),
            provenance: provenance.clone(),
            routes: self
                .spec
                .routes
                .iter()
                .map(SubRoute::to_route)
                .collect::<Result<Vec<_>, _>>()?,
            ..Default::default()
        };
        let metadata = TreeMetadata {
            provenance,
            resource_version: self.metadata.resource_version.clone(),
        };
        Ok((route, metadata))
    }

    pub fn to_tree(&self) -> Result<(RouteWithId, TreeMetadata), PolicyError> {
        let (route, metadata) = self.to_route()?;
        Ok((assign_identities(&route)?, metadata))
    }

    /// Resource form of `route`. Matchers on the root policy have no place in `defaults` and
    /// are dropped.
    pub fn from_route(
        name: &str,
        route: &Route,
        metadata: &TreeMetadata,
    ) -> Result<RoutingTree, PolicyError> {
        if !normalize_matchers(route)?.is_empty() {
            tracing::warn!(
                "[RoutingTree::from_route] root policy of '{}' declares matchers, dropping them",
                name
            );
        }
        let mut annotations = BTreeMap::new();
        if let Some(provenance) = metadata.provenance.as_ref().or(route.provenance.as_ref()) {
            annotations.insert(PROVENANCE_ANNOTATION.to_string(), provenance.clone());
        }
        Ok(RoutingTree {
            metadata: ObjectMeta {
                name: name.to_string(),
                resource_version: metadata.resource_version.clone(),
                annotations,
            },
            spec: RoutingTreeSpec {
                defaults: RouteDefaults {
                    receiver: route.receiver.clone().unwrap_or_default(),
                    group_by: route.group_by.clone().unwrap_or_default(),
                    group_wait: route.group_wait.clone(),
                    group_interval: route.group_interval.clone(),
                    repeat_interval: route.repeat_interval.clone(),
                },
                routes: route
                    .routes
                    .iter()
                    .map(SubRoute::from_route)
                    .collect::<Result<Vec<_>, _>>()?,
            },
        })
    }
}

/// JSON [RoutingTree] transport for the resource named `name`.
#[derive(Debug, Clone)]
pub struct RoutingTreeCodec {
    pub name: String,
}

impl Default for RoutingTreeCodec {
    fn default() -> Self {
        RoutingTreeCodec {
            name: DEFAULT_ROUTING_TREE_NAME.to_string(),
        }
    }
}

impl TreeCodec for RoutingTreeCodec {
    fn decode(&self, document: &str) -> Result<(Route, TreeMetadata), PolicyError> {
        RoutingTree::from_json(document)?.to_route()
    }

    fn encode(
        &self,
        _current: &str,
        route: &Route,
        metadata: &TreeMetadata,
    ) -> Result<String, PolicyError> {
        RoutingTree::from_route(&self.name, route, metadata)?.to_json()
    }
}
