use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{
    identity::deconflict_identities,
    locate::{index_path, node_at_mut},
};
use crate::{
    properties::{RouteId, RoutePatch, RouteWithId, MAX_TREE_DEPTH},
    PolicyError,
};

/// Where a new policy goes relative to the reference policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Above,
    Below,
    Child,
}

fn reference_not_found(id: &RouteId) -> PolicyError {
    PolicyError::ReferenceNotFound(id.to_string())
}

/// `deepest` is the level the inserted subtree would reach, the root being level 1.
fn ensure_depth(deepest: usize) -> Result<(), PolicyError> {
    if deepest > MAX_TREE_DEPTH {
        Err(PolicyError::TreeTooDeep(MAX_TREE_DEPTH))
    } else {
        Ok(())
    }
}

fn prepare_insert(tree: &RouteWithId, new_route: RouteWithId) -> RouteWithId {
    let taken: BTreeSet<RouteId> = tree.iter().map(|node| node.id).collect();
    if new_route.iter().any(|node| taken.contains(&node.id)) {
        deconflict_identities(new_route, &taken)
    } else {
        new_route
    }
}

pub fn insert_route(
    tree: &RouteWithId,
    position: InsertPosition,
    reference: &RouteId,
    new_route: RouteWithId,
) -> Result<RouteWithId, PolicyError> {
    match position {
        InsertPosition::Above => insert_above(tree, reference, new_route),
        InsertPosition::Below => insert_below(tree, reference, new_route),
        InsertPosition::Child => insert_child(tree, reference, new_route),
    }
}

/// Append `new_route` as the last child of `parent`.
#[tracing::instrument(skip(tree, new_route))]
pub fn insert_child(
    tree: &RouteWithId,
    parent: &RouteId,
    new_route: RouteWithId,
) -> Result<RouteWithId, PolicyError> {
    let path = index_path(tree, parent).ok_or_else(|| reference_not_found(parent))?;
    ensure_depth(path.len() + 1 + new_route.depth())?;
    let new_route = prepare_insert(tree, new_route);
    let mut updated = tree.clone();
    let parent_node = node_at_mut(&mut updated, &path).ok_or_else(|| reference_not_found(parent))?;
    parent_node.routes.push(new_route);
    Ok(updated)
}

/// Insert `new_route` directly before `sibling` among its parent's children.
pub fn insert_above(
    tree: &RouteWithId,
    sibling: &RouteId,
    new_route: RouteWithId,
) -> Result<RouteWithId, PolicyError> {
    insert_sibling(tree, sibling, new_route, 0)
}

/// Insert `new_route` directly after `sibling` among its parent's children.
pub fn insert_below(
    tree: &RouteWithId,
    sibling: &RouteId,
    new_route: RouteWithId,
) -> Result<RouteWithId, PolicyError> {
    insert_sibling(tree, sibling, new_route, 1)
}

#[tracing::instrument(skip(tree, new_route))]
fn insert_sibling(
    tree: &RouteWithId,
    sibling: &RouteId,
    new_route: RouteWithId,
    offset: usize,
) -> Result<RouteWithId, PolicyError> {
    let mut parent_path = index_path(tree, sibling).ok_or_else(|| reference_not_found(sibling))?;
    let index = parent_path.pop().ok_or(PolicyError::RootSiblingForbidden)?;
    ensure_depth(parent_path.len() + 1 + new_route.depth())?;
    let new_route = prepare_insert(tree, new_route);
    let mut updated = tree.clone();
    let parent_node =
        node_at_mut(&mut updated, &parent_path).ok_or_else(|| reference_not_found(sibling))?;
    parent_node.routes.insert(index + offset, new_route);
    Ok(updated)
}

/// Remove `target` and its whole subtree.
///
/// The root can never be removed. An identity that is not in the tree leaves the tree as it was.
#[tracing::instrument(skip(tree))]
pub fn delete_node(tree: &RouteWithId, target: &RouteId) -> Result<RouteWithId, PolicyError> {
    if tree.id == *target {
        return Err(PolicyError::RootDeletionForbidden);
    }
    let Some(mut parent_path) = index_path(tree, target) else {
        tracing::debug!("[routetree::delete_node] no policy with ID {target}, nothing removed");
        return Ok(tree.clone());
    };
    let index = parent_path.pop().ok_or(PolicyError::RootDeletionForbidden)?;
    let mut updated = tree.clone();
    let parent_node =
        node_at_mut(&mut updated, &parent_path).ok_or_else(|| reference_not_found(target))?;
    let removed = parent_node.routes.remove(index);
    tracing::debug!(
        "[routetree::delete_node] removed {} policies",
        removed.node_count()
    );
    Ok(updated)
}

/// Merge `patch` into the node identified by `target`. Children are kept as they are.
#[tracing::instrument(skip(tree, patch))]
pub fn replace_node(
    tree: &RouteWithId,
    target: &RouteId,
    patch: &RoutePatch,
) -> Result<RouteWithId, PolicyError> {
    let path = index_path(tree, target).ok_or_else(|| reference_not_found(target))?;
    let mut updated = tree.clone();
    let node = node_at_mut(&mut updated, &path).ok_or_else(|| reference_not_found(target))?;
    *node = patch.apply_to(node);
    Ok(updated)
}
