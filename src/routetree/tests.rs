//! Tests for the routing tree engine

use super::*;
use crate::{
    config::PolicyDefaults,
    properties::{
        InheritableProperty, MatcherOperator, ObjectMatcher, Route, RouteId, RoutePatch,
        RouteWithId, MAX_TREE_DEPTH,
    },
    tests::helpers::*,
    PolicyError,
};
use enumset::EnumSet;
use std::collections::BTreeSet;
use test_log::test;

fn raw_route(receiver: &str, routes: Vec<Route>) -> Route {
    Route {
        receiver: Some(receiver.to_string()),
        routes,
        ..Default::default()
    }
}

fn subtree_ids(tree: &RouteWithId, id: &RouteId) -> BTreeSet<RouteId> {
    locate(tree, id)
        .map(|found| found.node.iter().map(|node| node.id).collect())
        .unwrap_or_default()
}

#[test]
fn test_assign_identities_gives_every_node_a_distinct_id() {
    let raw = raw_route(
        "root",
        vec![
            raw_route("a", vec![raw_route("a1", vec![]), raw_route("a2", vec![])]),
            raw_route("b", vec![raw_route("b1", vec![raw_route("b11", vec![])])]),
        ],
    );
    let tree = assign_identities(&raw).unwrap();
    let ids: BTreeSet<RouteId> = tree.iter().map(|node| node.id).collect();
    assert_eq!(tree.node_count(), 7);
    assert_eq!(ids.len(), 7);

    let receivers: Vec<_> = tree.iter().filter_map(|n| n.receiver.as_deref()).collect();
    assert_eq!(receivers, vec!["root", "a", "a1", "a2", "b", "b1", "b11"]);

    // A second pass yields a valid tree with a different set of identities.
    let again = assign_identities(&raw).unwrap();
    let again_ids: BTreeSet<RouteId> = again.iter().map(|node| node.id).collect();
    assert_eq!(again_ids.len(), 7);
    assert!(ids.is_disjoint(&again_ids));
}

#[test]
fn test_assign_identities_rejects_unparseable_matchers() {
    let raw = Route {
        routes: vec![Route {
            matchers: Some(vec!["not a matcher".to_string()]),
            ..Default::default()
        }],
        ..Default::default()
    };
    assert!(matches!(
        assign_identities(&raw),
        Err(PolicyError::InvalidMatcher(_))
    ));
}

#[test]
fn test_strip_identities_writes_canonical_matchers() {
    let raw = Route {
        receiver: Some("root".to_string()),
        routes: vec![Route {
            receiver: Some("ops".to_string()),
            matchers: Some(vec!["severity=\"very bad\"".to_string()]),
            mute_time_intervals: Some(vec![]),
            continue_matching: true,
            ..Default::default()
        }],
        ..Default::default()
    };
    let stripped = strip_identities(&assign_identities(&raw).unwrap());
    let child = &stripped.routes[0];
    assert_eq!(child.matchers, None);
    assert_eq!(
        child.object_matchers,
        Some(vec![ObjectMatcher::new(
            "severity",
            MatcherOperator::Equal,
            "very bad"
        )])
    );
    assert_eq!(child.mute_time_intervals, None);
    assert!(child.continue_matching);

    let json = serde_json::to_value(&stripped).unwrap();
    assert!(json.get("id").is_none());
    assert!(json["routes"][0].get("id").is_none());
}

#[test]
fn test_locate_finds_every_node_with_its_parent_and_index() {
    let sample = create_sample_tree();
    let tree = &sample.tree;

    let root = locate(tree, &sample.root).unwrap();
    assert_eq!(root.node.id, sample.root);
    assert_eq!(root.parent.id, sample.root);
    assert_eq!(root.index, 0);

    for (id, parent, index) in [
        (sample.team_a, sample.root, 0),
        (sample.team_a_critical, sample.team_a, 0),
        (sample.team_b, sample.root, 1),
        (sample.team_c, sample.root, 2),
    ] {
        let found = locate(tree, &id).unwrap();
        assert_eq!(found.node.id, id);
        assert_eq!(found.parent.id, parent);
        assert_eq!(found.index, index);
        assert_eq!(found.parent.routes[found.index].id, id);
    }

    assert!(locate(tree, &RouteId::new()).is_none());
}

#[test]
fn test_locate_survives_duplicate_identities() {
    let mut tree = create_sample_tree().tree;
    let duplicate = tree.routes[0].id;
    tree.routes[1].id = duplicate;
    let found = locate(&tree, &duplicate).unwrap();
    assert_eq!(found.index, 0);
}

#[test]
fn test_insert_child_appends_and_leaves_the_input_untouched() {
    let sample = create_sample_tree();
    let before = sample.tree.clone();
    let new_route = create_test_route(Some("new"), &[("env", "prod")]);
    let new_id = new_route.id;

    let updated = insert_child(&sample.tree, &sample.team_a, new_route).unwrap();
    assert_eq!(sample.tree, before);

    let parent = locate(&updated, &sample.team_a).unwrap().node;
    assert_eq!(parent.routes.last().map(|r| r.id), Some(new_id));
    assert_eq!(parent.routes.len(), 2);
    assert_eq!(updated.node_count(), before.node_count() + 1);

    for id in [sample.team_b, sample.team_c] {
        assert_eq!(
            locate(&updated, &id).unwrap().node,
            locate(&before, &id).unwrap().node
        );
    }
}

#[test]
fn test_insert_above_and_below_shift_siblings() {
    let sample = create_sample_tree();
    let above = create_test_route(Some("above"), &[]);
    let below = create_test_route(Some("below"), &[]);
    let (above_id, below_id) = (above.id, below.id);

    let tree = insert_above(&sample.tree, &sample.team_b, above).unwrap();
    let tree = insert_below(&tree, &sample.team_b, below).unwrap();
    let order: Vec<RouteId> = tree.routes.iter().map(|r| r.id).collect();
    assert_eq!(
        order,
        vec![sample.team_a, above_id, sample.team_b, below_id, sample.team_c]
    );

    let nested = create_test_route(Some("nested"), &[]);
    let nested_id = nested.id;
    let tree = insert_route(&tree, InsertPosition::Above, &sample.team_a_critical, nested)
        .unwrap();
    let found = locate(&tree, &nested_id).unwrap();
    assert_eq!(found.parent.id, sample.team_a);
    assert_eq!(found.index, 0);
}

#[test]
fn test_insert_rejects_unknown_reference_and_root_siblings() {
    let sample = create_sample_tree();
    let missing = RouteId::new();
    for position in [
        InsertPosition::Above,
        InsertPosition::Below,
        InsertPosition::Child,
    ] {
        let result = insert_route(
            &sample.tree,
            position,
            &missing,
            create_test_route(None, &[]),
        );
        assert_eq!(
            result,
            Err(PolicyError::ReferenceNotFound(missing.to_string()))
        );
    }
    assert_eq!(
        insert_above(&sample.tree, &sample.root, create_test_route(None, &[])),
        Err(PolicyError::RootSiblingForbidden)
    );
}

#[test]
fn test_insert_reidentifies_colliding_nodes() {
    let sample = create_sample_tree();
    let mut copy = locate(&sample.tree, &sample.team_a).unwrap().node.clone();
    copy.receiver = Some("copy".to_string());
    let updated = insert_child(&sample.tree, &sample.root, copy).unwrap();
    let ids: BTreeSet<RouteId> = updated.iter().map(|node| node.id).collect();
    assert_eq!(ids.len(), updated.node_count());
    assert_eq!(updated.routes.len(), 4);
    assert_eq!(updated.routes[3].receiver.as_deref(), Some("copy"));
}

#[test]
fn test_delete_node_removes_the_subtree_only() {
    let sample = create_sample_tree();
    let removed = subtree_ids(&sample.tree, &sample.team_a);
    assert_eq!(removed.len(), 2);

    let updated = delete_node(&sample.tree, &sample.team_a).unwrap();
    let remaining: BTreeSet<RouteId> = updated.iter().map(|node| node.id).collect();
    assert!(remaining.is_disjoint(&removed));
    assert_eq!(updated.node_count(), sample.tree.node_count() - removed.len());
    assert_eq!(
        updated.routes.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![sample.team_b, sample.team_c]
    );
    assert_eq!(
        locate(&updated, &sample.team_c).unwrap().node,
        locate(&sample.tree, &sample.team_c).unwrap().node
    );
}

#[test]
fn test_delete_root_is_forbidden() {
    let sample = create_sample_tree();
    assert_eq!(
        delete_node(&sample.tree, &sample.root),
        Err(PolicyError::RootDeletionForbidden)
    );
    let lonely = RouteWithId::default();
    assert_eq!(
        delete_node(&lonely, &lonely.id),
        Err(PolicyError::RootDeletionForbidden)
    );
}

#[test]
fn test_delete_unknown_identity_is_a_no_op() {
    let sample = create_sample_tree();
    let updated = delete_node(&sample.tree, &RouteId::new()).unwrap();
    assert_eq!(updated, sample.tree);
}

#[test]
fn test_replace_node_merges_the_patch() {
    let sample = create_sample_tree();
    let patch = RoutePatch {
        receiver: Some("escalation".to_string()),
        continue_matching: Some(true),
        ..Default::default()
    };
    let updated = replace_node(&sample.tree, &sample.team_a, &patch).unwrap();
    let node = locate(&updated, &sample.team_a).unwrap().node;
    let original = locate(&sample.tree, &sample.team_a).unwrap().node;
    assert_eq!(node.receiver.as_deref(), Some("escalation"));
    assert!(node.continue_matching);
    assert_eq!(node.matchers, original.matchers);
    assert_eq!(node.routes, original.routes);
    assert_eq!(node.id, original.id);

    let missing = RouteId::new();
    let err = replace_node(&sample.tree, &missing, &patch).unwrap_err();
    assert_eq!(err, PolicyError::ReferenceNotFound(missing.to_string()));
    assert!(err.to_string().contains("no such route with ID"));
}

#[test]
fn test_resolve_inherits_from_nearest_ancestor() {
    let sample = create_sample_tree();
    let resolved = resolve(&sample.tree);

    let critical = resolved.find(&sample.team_a_critical).unwrap();
    assert_eq!(critical.receiver.as_deref(), Some("team-a"));
    assert_eq!(critical.group_wait, "10s");
    assert_eq!(critical.group_by, vec!["alertname".to_string()]);
    assert_eq!(critical.group_interval, "5m");
    assert_eq!(critical.repeat_interval, "4h");

    let team_a = resolved.find(&sample.team_a).unwrap();
    assert_eq!(team_a.group_wait, "30s");

    let team_c = resolved.find(&sample.team_c).unwrap();
    assert_eq!(team_c.receiver.as_deref(), Some("default"));
    assert_eq!(team_c.mute_time_intervals, vec!["weekends".to_string()]);
}

#[test]
fn test_resolve_does_not_inherit_time_intervals() {
    let sample = create_sample_tree();
    let tree = replace_node(
        &sample.tree,
        &sample.team_a,
        &RoutePatch {
            mute_time_intervals: Some(vec!["nights".to_string()]),
            active_time_intervals: Some(vec!["office-hours".to_string()]),
            ..Default::default()
        },
    )
    .unwrap();
    let resolved = resolve(&tree);
    assert_eq!(
        resolved.find(&sample.team_a).unwrap().mute_time_intervals,
        vec!["nights".to_string()]
    );
    let child = resolved.find(&sample.team_a_critical).unwrap();
    assert!(child.mute_time_intervals.is_empty());
    assert!(child.active_time_intervals.is_empty());
}

#[test]
fn test_resolve_treats_empty_group_by_as_unset() {
    let sample = create_sample_tree();
    let tree = replace_node(
        &sample.tree,
        &sample.team_b,
        &RoutePatch {
            group_by: Some(vec![]),
            ..Default::default()
        },
    )
    .unwrap();
    let resolved = resolve(&tree);
    assert_eq!(
        resolved.find(&sample.team_b).unwrap().group_by,
        vec!["alertname".to_string()]
    );
}

#[test]
fn test_resolve_falls_back_to_defaults_and_tracks_inheritance() {
    let child = create_test_route(None, &[]);
    let child_id = child.id;
    let root = RouteWithId {
        receiver: Some("root".to_string()),
        ..Default::default()
    };
    let tree = insert_child(&root, &root.id, child).unwrap();
    let defaults = PolicyDefaults {
        group_wait: "45s".to_string(),
        group_by: vec!["cluster".to_string()],
        ..Default::default()
    };
    let resolved = resolve_with_defaults(&tree, &defaults);
    assert_eq!(resolved.group_wait, "45s");
    assert_eq!(
        resolved.inherited,
        EnumSet::<InheritableProperty>::all() - InheritableProperty::Receiver
    );

    let child = resolved.find(&child_id).unwrap();
    assert_eq!(child.receiver.as_deref(), Some("root"));
    assert_eq!(child.group_by, vec!["cluster".to_string()]);
    assert_eq!(child.inherited, EnumSet::<InheritableProperty>::all());
}

#[test]
fn test_inherited_properties_reports_parent_values() {
    let sample = create_sample_tree();
    let resolved = resolve(&sample.tree);
    let parent = resolved.find(&sample.team_a).unwrap();
    let child = locate(&sample.tree, &sample.team_a_critical).unwrap().node;
    let inherited = inherited_properties(parent, child);
    assert_eq!(inherited.receiver.as_deref(), Some("team-a"));
    assert_eq!(inherited.group_by, Some(vec!["alertname".to_string()]));
    assert_eq!(inherited.group_wait, None);
    assert_eq!(inherited.repeat_interval.as_deref(), Some("4h"));
}

#[test]
fn test_find_matches_without_filters_is_not_applied() {
    let sample = create_sample_tree();
    let result = find_matches(&resolve(&sample.tree), &RouteFilters::default());
    assert!(!result.filters_applied);
    assert!(result.matches.is_empty());

    let empty = RouteFilters {
        contact_point: Some(String::new()),
        label_matchers: Some(vec![]),
    };
    assert!(!find_matches(&resolve(&sample.tree), &empty).filters_applied);
}

#[test]
fn test_contact_point_filter_uses_effective_receiver() {
    let sample = create_sample_tree();
    let filters = RouteFilters {
        contact_point: Some("team-a".to_string()),
        ..Default::default()
    };
    let result = find_matches(&resolve(&sample.tree), &filters);
    assert!(result.filters_applied);
    assert_eq!(result.ids(), vec![sample.team_a, sample.team_a_critical]);
    assert_eq!(result.get(&sample.team_a), Some(&[][..]));
    assert_eq!(
        result.get(&sample.team_a_critical),
        Some(&[sample.team_a][..])
    );

    let defaults = RouteFilters {
        contact_point: Some("default".to_string()),
        ..Default::default()
    };
    let result = find_matches(&resolve(&sample.tree), &defaults);
    assert_eq!(result.ids(), vec![sample.root, sample.team_c]);
    assert_eq!(result.get(&sample.root), Some(&[][..]));
}

#[test]
fn test_label_filter_compares_quote_insensitively() {
    let sample = create_sample_tree();
    let resolved = resolve(&sample.tree);
    let filters = RouteFilters {
        label_matchers: Some(vec![ObjectMatcher::new(
            "\"team\"",
            MatcherOperator::Equal,
            "c",
        )]),
        ..Default::default()
    };
    assert_eq!(find_matches(&resolved, &filters).ids(), vec![sample.team_c]);

    let severity = RouteFilters {
        label_matchers: Some(vec![ObjectMatcher::new(
            "severity",
            MatcherOperator::Equal,
            "critical",
        )]),
        ..Default::default()
    };
    assert_eq!(
        find_matches(&resolved, &severity).ids(),
        vec![sample.team_a_critical, sample.team_b]
    );

    let wrong_operator = RouteFilters {
        label_matchers: Some(vec![ObjectMatcher::new(
            "severity",
            MatcherOperator::Regex,
            "critical",
        )]),
        ..Default::default()
    };
    assert!(find_matches(&resolved, &wrong_operator).matches.is_empty());
}

#[test]
fn test_both_filters_intersect() {
    let sample = create_sample_tree();
    let resolved = resolve(&sample.tree);
    let filters = RouteFilters {
        contact_point: Some("team-b".to_string()),
        label_matchers: Some(vec![ObjectMatcher::new(
            "severity",
            MatcherOperator::Equal,
            "critical",
        )]),
    };
    let result = find_matches(&resolved, &filters);
    assert_eq!(result.ids(), vec![sample.team_b]);
    assert!(!result.contains(&sample.team_a_critical));
}

#[test]
fn test_end_to_end_insert_then_filter() {
    let root = assign_identities(&Route {
        receiver: Some("default".to_string()),
        ..Default::default()
    })
    .unwrap();
    let child = assign_identities(&Route {
        receiver: Some("B".to_string()),
        object_matchers: Some(vec![ObjectMatcher::new(
            "sev",
            MatcherOperator::Equal,
            "crit",
        )]),
        ..Default::default()
    })
    .unwrap();
    let child_id = child.id;

    let tree = insert_child(&root, &root.id, child).unwrap();
    assert_eq!(tree.routes.len(), 1);
    assert_eq!(tree.routes[0].receiver.as_deref(), Some("B"));

    let result = find_matches(
        &resolve(&tree),
        &RouteFilters {
            contact_point: Some("B".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.get(&child_id), Some(&[][..]));
}

#[test]
fn test_assert_unchanged_ignores_identities_and_provenance() {
    let raw = Route {
        receiver: Some("default".to_string()),
        routes: vec![Route {
            receiver: Some("ops".to_string()),
            matchers: Some(vec!["team=ops".to_string()]),
            ..Default::default()
        }],
        ..Default::default()
    };
    let snapshot = assign_identities(&raw).unwrap();
    assert_eq!(assert_unchanged(&snapshot, &snapshot), Ok(()));

    let mut latest = assign_identities(&raw).unwrap();
    latest.provenance = Some("api".to_string());
    assert_eq!(assert_unchanged(&latest, &snapshot), Ok(()));
}

#[test]
fn test_assert_unchanged_detects_divergence() {
    let sample = create_sample_tree();
    let snapshot = &sample.tree;
    let conflict = Err(PolicyError::ConcurrentModification);

    let receiver = replace_node(
        snapshot,
        &sample.team_b,
        &RoutePatch {
            receiver: Some("someone-else".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(assert_unchanged(&receiver, snapshot), conflict);

    let matchers = replace_node(
        snapshot,
        &sample.team_b,
        &RoutePatch {
            matchers: Some(vec![]),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(assert_unchanged(&matchers, snapshot), conflict);

    let timing = replace_node(
        snapshot,
        &sample.team_c,
        &RoutePatch {
            repeat_interval: Some("1h".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(assert_unchanged(&timing, snapshot), conflict);

    let mut reordered = snapshot.clone();
    reordered.routes.swap(0, 1);
    assert_eq!(assert_unchanged(&reordered, snapshot), conflict);

    let continued = replace_node(
        snapshot,
        &sample.team_c,
        &RoutePatch {
            continue_matching: Some(true),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(assert_unchanged(&continued, snapshot), conflict);
}

/// A single-branch tree with `depth` levels; the leaf carries the `leaf` receiver.
fn raw_chain(depth: usize) -> Route {
    let mut route = Route {
        receiver: Some("leaf".to_string()),
        ..Default::default()
    };
    for level in 1..depth {
        route = Route {
            receiver: Some(format!("level-{level}")),
            routes: vec![route],
            ..Default::default()
        };
    }
    route
}

fn deepest_id(tree: &RouteWithId) -> RouteId {
    let mut node = tree;
    while let Some(child) = node.routes.last() {
        node = child;
    }
    node.id
}

#[test]
fn test_deepest_supported_tree_resolves_and_filters() {
    let tree = assign_identities(&raw_chain(MAX_TREE_DEPTH)).unwrap();
    assert_eq!(tree.depth(), MAX_TREE_DEPTH);

    let leaf = deepest_id(&tree);
    let resolved = resolve(&tree);
    assert_eq!(
        resolved.find(&leaf).and_then(|r| r.receiver.as_deref()),
        Some("leaf")
    );

    let result = find_matches(
        &resolved,
        &RouteFilters {
            contact_point: Some("leaf".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(result.ids(), vec![leaf]);
    assert_eq!(result.get(&leaf).map(<[RouteId]>::len), Some(MAX_TREE_DEPTH - 2));
}

#[test]
fn test_assign_identities_refuses_trees_beyond_the_depth_limit() {
    assert_eq!(
        assign_identities(&raw_chain(MAX_TREE_DEPTH + 1)),
        Err(PolicyError::TreeTooDeep(MAX_TREE_DEPTH))
    );
}

#[test]
fn test_insert_refuses_to_exceed_the_depth_limit() {
    let tree = assign_identities(&raw_chain(MAX_TREE_DEPTH)).unwrap();
    let leaf = deepest_id(&tree);
    let addition = create_test_route(Some("extra"), &[]);

    assert_eq!(
        insert_child(&tree, &leaf, addition.clone()),
        Err(PolicyError::TreeTooDeep(MAX_TREE_DEPTH))
    );
    let nested = RouteWithId {
        routes: vec![create_test_route(Some("nested"), &[])],
        ..Default::default()
    };
    assert_eq!(
        insert_below(&tree, &leaf, nested),
        Err(PolicyError::TreeTooDeep(MAX_TREE_DEPTH))
    );

    let updated = insert_below(&tree, &leaf, addition).unwrap();
    assert_eq!(updated.depth(), MAX_TREE_DEPTH);
    assert_eq!(updated.node_count(), MAX_TREE_DEPTH + 1);
}
