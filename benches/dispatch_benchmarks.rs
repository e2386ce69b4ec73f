use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fnserve_core::middleware::MiddlewareContext;
use fnserve_core::models::Route;
use fnserve_core::router::{RouteTrie, RouterCache};
use serde_json::json;

fn populated_trie() -> RouteTrie<usize> {
    let mut trie = RouteTrie::new();
    for app in 0..20 {
        for endpoint in 0..10 {
            trie.add_route(&format!("/apps/{app}/endpoints/{endpoint}"), app * 10 + endpoint)
                .unwrap();
        }
        trie.add_route(&format!("/apps/{app}/users/:id"), 1000 + app)
            .unwrap();
    }
    trie.add_route("/static/*path", 9999).unwrap();
    trie
}

fn benchmark_trie_lookup(c: &mut Criterion) {
    let trie = populated_trie();

    c.bench_function("trie_lookup_static", |b| {
        b.iter(|| trie.lookup(black_box("/apps/12/endpoints/7")))
    });
    c.bench_function("trie_lookup_param", |b| {
        b.iter(|| trie.lookup(black_box("/apps/12/users/42")))
    });
    c.bench_function("trie_lookup_wildcard", |b| {
        b.iter(|| trie.lookup(black_box("/static/css/site/main.css")))
    });
    c.bench_function("trie_lookup_miss", |b| {
        b.iter(|| trie.lookup(black_box("/apps/12/unknown/7")))
    });
}

fn benchmark_matcher_rebuild(c: &mut Criterion) {
    let routes: Vec<Route> = (0..100)
        .map(|i| Route {
            app_name: "myapp".to_string(),
            path: format!("/functions/{i}/:id"),
            image: format!("fnserve/fn-{i}"),
            ..Route::default()
        })
        .collect();

    c.bench_function("matcher_rebuild_100_routes", |b| {
        let cache = RouterCache::new();
        b.iter(|| cache.rebuild(black_box("myapp"), black_box(&routes)))
    });
}

fn benchmark_context_layering(c: &mut Criterion) {
    c.bench_function("context_layer_10_frames", |b| {
        b.iter(|| {
            let mut ctx = MiddlewareContext::new();
            for i in 0..10 {
                ctx = ctx.with_value(format!("key-{i}"), json!(i));
            }
            ctx
        })
    });

    let mut ctx = MiddlewareContext::new();
    for i in 0..10 {
        ctx = ctx.with_value(format!("key-{i}"), json!(i));
    }
    c.bench_function("context_lookup_outermost", |b| {
        b.iter(|| ctx.get(black_box("key-0")))
    });
}

criterion_group!(
    benches,
    benchmark_trie_lookup,
    benchmark_matcher_rebuild,
    benchmark_context_layering
);
criterion_main!(benches);
