use std::collections::BTreeSet;

use crate::{
    matchers::normalize_matchers,
    properties::{Route, RouteId, RouteWithId, MAX_TREE_DEPTH},
    PolicyError,
};

/// Give every node of a freshly fetched tree a unique identity and normalized matchers.
///
/// Identities differ from call to call; only their uniqueness within one result is guaranteed.
/// Trees nested deeper than [MAX_TREE_DEPTH] are refused with [PolicyError::TreeTooDeep].
pub fn assign_identities(route: &Route) -> Result<RouteWithId, PolicyError> {
    if route.depth() > MAX_TREE_DEPTH {
        return Err(PolicyError::TreeTooDeep(MAX_TREE_DEPTH));
    }
    let tree = assign_node(route)?;
    tracing::debug!(
        "[routetree::assign_identities] assigned identities to {} policies",
        tree.node_count()
    );
    Ok(tree)
}

fn assign_node(route: &Route) -> Result<RouteWithId, PolicyError> {
    let id = RouteId::new();
    let matchers = normalize_matchers(route)?;
    let routes = route
        .routes
        .iter()
        .map(assign_node)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RouteWithId {
        id,
        receiver: route.receiver.clone(),
        group_by: route.group_by.clone(),
        group_wait: route.group_wait.clone(),
        group_interval: route.group_interval.clone(),
        repeat_interval: route.repeat_interval.clone(),
        matchers,
        mute_time_intervals: route.mute_time_intervals.clone().unwrap_or_default(),
        active_time_intervals: route.active_time_intervals.clone().unwrap_or_default(),
        continue_matching: route.continue_matching,
        provenance: route.provenance.clone(),
        routes,
    })
}

/// Re-identify the nodes of `route` whose identity already appears in `taken`.
pub(crate) fn deconflict_identities(route: RouteWithId, taken: &BTreeSet<RouteId>) -> RouteWithId {
    let id = if taken.contains(&route.id) {
        let fresh = RouteId::new();
        tracing::warn!(
            "[routetree] inserted policy reused identity {}, assigning {}",
            route.id,
            fresh
        );
        fresh
    } else {
        route.id
    };
    RouteWithId {
        id,
        routes: route
            .routes
            .into_iter()
            .map(|child| deconflict_identities(child, taken))
            .collect(),
        ..route
    }
}

/// Raw tree ready for the persist boundary. Matchers are written in the canonical
/// `object_matchers` form; empty lists are omitted.
pub fn strip_identities(route: &RouteWithId) -> Route {
    fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
        if items.is_empty() {
            None
        } else {
            Some(items.to_vec())
        }
    }

    Route {
        receiver: route.receiver.clone(),
        group_by: route.group_by.clone(),
        group_wait: route.group_wait.clone(),
        group_interval: route.group_interval.clone(),
        repeat_interval: route.repeat_interval.clone(),
        match_labels: None,
        match_re: None,
        matchers: None,
        object_matchers: non_empty(&route.matchers),
        mute_time_intervals: non_empty(&route.mute_time_intervals),
        active_time_intervals: non_empty(&route.active_time_intervals),
        continue_matching: route.continue_matching,
        provenance: route.provenance.clone(),
        routes: route.routes.iter().map(strip_identities).collect(),
    }
}
