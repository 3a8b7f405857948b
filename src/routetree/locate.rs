use crate::properties::{RouteId, RouteWithId};

/// Result of a successful [locate]. The root is reported as its own parent at index 0.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub node: &'a RouteWithId,
    pub parent: &'a RouteWithId,
    pub index: usize,
}

/// Depth-first search for `id`, starting at the root. The first match wins.
pub fn locate<'a>(tree: &'a RouteWithId, id: &RouteId) -> Option<Located<'a>> {
    if tree.id == *id {
        return Some(Located {
            node: tree,
            parent: tree,
            index: 0,
        });
    }
    locate_in_children(tree, id)
}

fn locate_in_children<'a>(parent: &'a RouteWithId, id: &RouteId) -> Option<Located<'a>> {
    for (index, child) in parent.routes.iter().enumerate() {
        if child.id == *id {
            return Some(Located {
                node: child,
                parent,
                index,
            });
        }
        if let Some(found) = locate_in_children(child, id) {
            return Some(found);
        }
    }
    None
}

/// Child indices leading from the root to `id`. The root itself is the empty path.
pub(crate) fn index_path(tree: &RouteWithId, id: &RouteId) -> Option<Vec<usize>> {
    if tree.id == *id {
        return Some(Vec::new());
    }
    tree.routes.iter().enumerate().find_map(|(index, child)| {
        index_path(child, id).map(|mut path| {
            path.insert(0, index);
            path
        })
    })
}

pub(crate) fn node_at_mut<'a>(
    tree: &'a mut RouteWithId,
    path: &[usize],
) -> Option<&'a mut RouteWithId> {
    path.iter()
        .try_fold(tree, |node, index| node.routes.get_mut(*index))
}
