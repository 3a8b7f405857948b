use super::identity::strip_identities;
use crate::{
    properties::{Route, RouteWithId},
    PolicyError,
};

/// Projection used for conflict detection: identities and provenance annotations are dropped,
/// every user editable field stays.
fn comparable(route: &RouteWithId) -> Route {
    fn clear_metadata(route: &mut Route) {
        route.provenance = None;
        route.routes.iter_mut().for_each(clear_metadata);
    }

    let mut stripped = strip_identities(route);
    clear_metadata(&mut stripped);
    stripped
}

/// Refuse a commit when the tree in the system of record (`latest`) no longer equals the tree
/// the edit started from (`snapshot`).
pub fn assert_unchanged(latest: &RouteWithId, snapshot: &RouteWithId) -> Result<(), PolicyError> {
    if comparable(latest) == comparable(snapshot) {
        Ok(())
    } else {
        Err(PolicyError::ConcurrentModification)
    }
}
