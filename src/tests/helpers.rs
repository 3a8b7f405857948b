//! Shared test utilities for routing tree testing

use crate::{
    properties::{MatcherOperator, ObjectMatcher, RouteId, RouteWithId},
    routetree::insert_child,
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Helper function to create a policy with an optional receiver and `name=value` matchers
pub fn create_test_route(receiver: Option<&str>, matchers: &[(&str, &str)]) -> RouteWithId {
    RouteWithId {
        receiver: receiver.map(str::to_string),
        matchers: matchers
            .iter()
            .map(|(name, value)| ObjectMatcher::new(*name, MatcherOperator::Equal, *value))
            .collect(),
        ..Default::default()
    }
}

pub struct SampleTree {
    pub tree: RouteWithId,
    pub root: RouteId,
    pub team_a: RouteId,
    pub team_a_critical: RouteId,
    pub team_b: RouteId,
    pub team_c: RouteId,
}

/// Create a small policy tree:
///
/// ```text
/// root (default, group_wait 30s, group_by [alertname])
/// ├── team_a (receiver team-a, team=a)
/// │   └── team_a_critical (severity=critical, group_wait 10s)
/// ├── team_b (receiver team-b, team=b, severity=critical)
/// └── team_c (team="c", mute weekends)
/// ```
pub fn create_sample_tree() -> SampleTree {
    init_logging();

    let root = RouteWithId {
        receiver: Some("default".to_string()),
        group_wait: Some("30s".to_string()),
        group_by: Some(vec!["alertname".to_string()]),
        ..Default::default()
    };
    let team_a = create_test_route(Some("team-a"), &[("team", "a")]);
    let mut team_a_critical = create_test_route(None, &[("severity", "critical")]);
    team_a_critical.group_wait = Some("10s".to_string());
    let team_b = create_test_route(Some("team-b"), &[("team", "b"), ("severity", "critical")]);
    let mut team_c = create_test_route(None, &[("team", "\"c\"")]);
    team_c.mute_time_intervals = vec!["weekends".to_string()];

    let ids = SampleTree {
        tree: root.clone(),
        root: root.id,
        team_a: team_a.id,
        team_a_critical: team_a_critical.id,
        team_b: team_b.id,
        team_c: team_c.id,
    };

    let tree = insert_child(&root, &ids.root, team_a).unwrap();
    let tree = insert_child(&tree, &ids.team_a, team_a_critical).unwrap();
    let tree = insert_child(&tree, &ids.root, team_b).unwrap();
    let tree = insert_child(&tree, &ids.root, team_c).unwrap();

    SampleTree { tree, ..ids }
}
