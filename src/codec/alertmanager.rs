//! Full Alertmanager configuration document, where the policy tree is the `route` field next to
//! receivers, templates and time interval definitions.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::TreeCodec;
use crate::{
    properties::{Route, RouteWithId, TreeMetadata},
    PolicyError,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub name: String,
    /// Integration configuration (`email_configs`, `webhook_configs`, ...), carried as is.
    #[serde(flatten)]
    pub integrations: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedTimeInterval {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_intervals: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertmanagerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receivers: Vec<Receiver>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mute_time_intervals: Vec<NamedTimeInterval>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_intervals: Vec<NamedTimeInterval>,
    /// Sections this crate does not interpret (`global`, `inhibit_rules`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Policies in a tree that point at definitions the document does not contain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnknownReference {
    Receiver(String),
    TimeInterval(String),
}

impl AlertmanagerConfig {
    pub fn from_yaml(content: &str) -> Result<Self, PolicyError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String, PolicyError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn receiver_names(&self) -> BTreeSet<&str> {
        self.receivers.iter().map(|r| r.name.as_str()).collect()
    }

    /// Names defined in either `mute_time_intervals` or `time_intervals`.
    pub fn time_interval_names(&self) -> BTreeSet<&str> {
        self.mute_time_intervals
            .iter()
            .chain(self.time_intervals.iter())
            .map(|ti| ti.name.as_str())
            .collect()
    }

    /// A copy of this document with `route` as its policy tree.
    pub fn with_route(&self, route: Route) -> AlertmanagerConfig {
        AlertmanagerConfig {
            route: Some(route),
            ..self.clone()
        }
    }

    pub fn unknown_references(&self, tree: &RouteWithId) -> BTreeSet<UnknownReference> {
        let receivers = self.receiver_names();
        let intervals = self.time_interval_names();
        let mut unknown = BTreeSet::new();
        for node in tree.iter() {
            if let Some(receiver) = node.receiver.as_deref() {
                if !receivers.contains(receiver) {
                    unknown.insert(UnknownReference::Receiver(receiver.to_string()));
                }
            }
            for interval in node
                .mute_time_intervals
                .iter()
                .chain(node.active_time_intervals.iter())
            {
                if !intervals.contains(interval.as_str()) {
                    unknown.insert(UnknownReference::TimeInterval(interval.clone()));
                }
            }
        }
        if !unknown.is_empty() {
            tracing::debug!(
                "[AlertmanagerConfig::unknown_references] {} undefined references",
                unknown.len()
            );
        }
        unknown
    }
}

/// Wrapper the alerting API uses when serving a configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertmanagerConfigDocument {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub template_files: BTreeMap<String, String>,
    pub alertmanager_config: AlertmanagerConfig,
}

/// Reads the tree out of a JSON [AlertmanagerConfigDocument] and writes it back into the
/// document being replaced, leaving every other section untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertmanagerCodec;

impl AlertmanagerCodec {
    fn parse(document: &str) -> Result<AlertmanagerConfigDocument, PolicyError> {
        if document.trim().is_empty() {
            return Ok(AlertmanagerConfigDocument::default());
        }
        Ok(serde_json::from_str(document)?)
    }
}

impl TreeCodec for AlertmanagerCodec {
    fn decode(&self, document: &str) -> Result<(Route, TreeMetadata), PolicyError> {
        let parsed = AlertmanagerCodec::parse(document)?;
        let route = parsed.alertmanager_config.route.unwrap_or_default();
        let metadata = TreeMetadata {
            provenance: route.provenance.clone(),
            resource_version: None,
        };
        Ok((route, metadata))
    }

    fn encode(
        &self,
        current: &str,
        route: &Route,
        _metadata: &TreeMetadata,
    ) -> Result<String, PolicyError> {
        let current = AlertmanagerCodec::parse(current)?;
        let document = AlertmanagerConfigDocument {
            alertmanager_config: current.alertmanager_config.with_route(route.clone()),
            ..current
        };
        Ok(serde_json::to_string(&document)?)
    }
}
