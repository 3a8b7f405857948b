//! Performance benchmarks for routing tree operations
//!
//! These benchmarks run over a generated tree (fan-out 6, depth 4, roughly 1,500 policies):
//! - Identity assignment from the raw form
//! - Inheritance resolution
//! - Filtering by contact point and label matchers
//! - Insert and delete deep in the tree
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use policy_tree::{
    properties::{MatcherOperator, ObjectMatcher, Route, RouteWithId},
    routetree::{
        assign_identities, delete_node, find_matches, insert_below, insert_child, resolve,
        RouteFilters,
    },
};

const FAN_OUT: usize = 6;
const DEPTH: usize = 4;

fn generate_route(depth: usize, path: &str) -> Route {
    let routes = if depth == 0 {
        Vec::new()
    } else {
        (0..FAN_OUT)
            .map(|i| generate_route(depth - 1, &format!("{path}-{i}")))
            .collect()
    };
    Route {
        // Every other level inherits its receiver.
        receiver: (depth % 2 == 0).then(|| format!("receiver{path}")),
        matchers: Some(vec![format!("level{depth}=\"{path}\"")]),
        routes,
        ..Default::default()
    }
}

fn sample_tree() -> RouteWithId {
    assign_identities(&generate_route(DEPTH, "")).unwrap()
}

fn deepest(tree: &RouteWithId) -> &RouteWithId {
    let mut node = tree;
    while let Some(last) = node.routes.last() {
        node = last;
    }
    node
}

fn bench_assign_identities(c: &mut Criterion) {
    let raw = generate_route(DEPTH, "");
    c.bench_function("assign_identities", |b| {
        b.iter(|| assign_identities(black_box(&raw)).unwrap().node_count());
    });
}

fn bench_resolve(c: &mut Criterion) {
    let tree = sample_tree();
    c.bench_function("resolve", |b| {
        b.iter(|| resolve(black_box(&tree)).routes.len());
    });
}

fn bench_filters(c: &mut Criterion) {
    let resolved = resolve(&sample_tree());
    let filters = RouteFilters {
        contact_point: Some("receiver-3-3".to_string()),
        label_matchers: Some(vec![ObjectMatcher::new(
            "level2",
            MatcherOperator::Equal,
            "-3-3",
        )]),
    };
    c.bench_function("find_matches", |b| {
        b.iter(|| find_matches(black_box(&resolved), black_box(&filters)).matches.len());
    });
}

fn bench_mutations(c: &mut Criterion) {
    let tree = sample_tree();
    let target = deepest(&tree).id;
    let addition = assign_identities(&Route {
        receiver: Some("new".to_string()),
        ..Default::default()
    })
    .unwrap();

    c.bench_function("insert_child_deep", |b| {
        b.iter(|| insert_child(&tree, black_box(&target), addition.clone()).unwrap());
    });
    c.bench_function("insert_below_deep", |b| {
        b.iter(|| insert_below(&tree, black_box(&target), addition.clone()).unwrap());
    });
    c.bench_function("delete_node_deep", |b| {
        b.iter(|| delete_node(&tree, black_box(&target)).unwrap());
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(50);
    targets =
        bench_assign_identities,
        bench_resolve,
        bench_filters,
        bench_mutations
}

criterion_main!(benches);
