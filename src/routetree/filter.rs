use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::inherit::ResolvedRoute;
use crate::{
    matchers::matchers_equal,
    properties::{ObjectMatcher, RouteId},
};

/// Filters offered by the policy list. Empty values count as "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFilters {
    #[serde(default)]
    pub contact_point: Option<String>,
    #[serde(default)]
    pub label_matchers: Option<Vec<ObjectMatcher>>,
}

impl RouteFilters {
    fn contact_point(&self) -> Option<&str> {
        self.contact_point.as_deref().filter(|cp| !cp.is_empty())
    }

    fn label_matchers(&self) -> Option<&[ObjectMatcher]> {
        self.label_matchers
            .as_deref()
            .filter(|matchers| !matchers.is_empty())
    }
}

/// A matching policy and the identities of its ancestors strictly between the root and itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatch {
    pub id: RouteId,
    pub path: Vec<RouteId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub filters_applied: bool,
    /// Matches in pre-order.
    pub matches: Vec<RouteMatch>,
}

impl MatchResult {
    pub fn get(&self, id: &RouteId) -> Option<&[RouteId]> {
        self.matches
            .iter()
            .find(|m| m.id == *id)
            .map(|m| m.path.as_slice())
    }

    pub fn contains(&self, id: &RouteId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<RouteId> {
        self.matches.iter().map(|m| m.id).collect()
    }
}

/// Policies whose effective receiver is exactly `contact_point`.
pub fn matches_contact_point(route: &ResolvedRoute, contact_point: &str) -> bool {
    route.receiver.as_deref() == Some(contact_point)
}

/// Whether the policy declares, for every filter matcher, an equal matcher of its own.
pub fn matches_label_filters(route: &ResolvedRoute, filters: &[ObjectMatcher]) -> bool {
    filters.iter().all(|filter| {
        route
            .matchers
            .iter()
            .any(|own| matchers_equal(own, filter))
    })
}

/// Every policy of `tree` accepted by `predicate`, in pre-order, with its ancestor path.
/// Descendants of a match are tested like any other policy.
pub fn find_routes_matching<F>(tree: &ResolvedRoute, predicate: F) -> Vec<RouteMatch>
where
    F: Fn(&ResolvedRoute) -> bool,
{
    fn walk<F>(
        node: &ResolvedRoute,
        path: &mut Vec<RouteId>,
        is_root: bool,
        predicate: &F,
        matches: &mut Vec<RouteMatch>,
    ) where
        F: Fn(&ResolvedRoute) -> bool,
    {
        if predicate(node) {
            matches.push(RouteMatch {
                id: node.id,
                path: path.clone(),
            });
        }
        if !is_root {
            path.push(node.id);
        }
        for child in &node.routes {
            walk(child, path, false, predicate, matches);
        }
        if !is_root {
            path.pop();
        }
    }

    let mut matches = Vec::new();
    walk(tree, &mut Vec::new(), true, &predicate, &mut matches);
    matches
}

/// Apply the contact point and label matcher filters to a resolved tree.
///
/// Each supplied filter is evaluated on its own; with both supplied the result is the
/// intersection of the two match sets. With neither, nothing is traversed.
pub fn find_matches(tree: &ResolvedRoute, filters: &RouteFilters) -> MatchResult {
    let contact_point = filters.contact_point();
    let label_matchers = filters.label_matchers();
    if contact_point.is_none() && label_matchers.is_none() {
        return MatchResult::default();
    }

    let by_contact_point = contact_point
        .map(|cp| find_routes_matching(tree, |route| matches_contact_point(route, cp)));
    let by_labels = label_matchers.map(|label_filters| {
        find_routes_matching(tree, |route| matches_label_filters(route, label_filters))
    });

    let matches = match (by_contact_point, by_labels) {
        (Some(mut cp_matches), Some(label_matches)) => {
            let label_ids: BTreeSet<RouteId> = label_matches.iter().map(|m| m.id).collect();
            cp_matches.retain(|m| label_ids.contains(&m.id));
            cp_matches
        }
        (Some(matches), None) | (None, Some(matches)) => matches,
        (None, None) => Vec::new(),
    };
    tracing::debug!(
        "[routetree::find_matches] {} policies match the applied filters",
        matches.len()
    );
    MatchResult {
        filters_applied: true,
        matches,
    }
}
