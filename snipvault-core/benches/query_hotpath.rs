use criterion::{criterion_group, criterion_main, Criterion};
use snipvault_core::{tokenize, NormalizedQuery, PageLimits, SearchRequest};
use std::hint::black_box;

const LIMITS: PageLimits = PageLimits {
    default_page_size: 10,
    max_page_size: 50,
};

fn bench_tokenize(c: &mut Criterion) {
    let body = include_str!("../src/query.rs");

    c.bench_function("tokenize/source_file", |b| {
        b.iter(|| black_box(tokenize(black_box(body))).len());
    });
}

fn bench_normalize_request(c: &mut Criterion) {
    let request = SearchRequest::new()
        .keyword("Quick SORT, quick  merge-sort parse_args")
        .language(" Rust ")
        .tag("Algorithms")
        .page(-2)
        .page_size(500);

    c.bench_function("query/normalize_request", |b| {
        b.iter(|| {
            let query = NormalizedQuery::from_request(black_box(&request), &LIMITS);
            black_box(query.window());
        });
    });
}

criterion_group!(benches, bench_tokenize, bench_normalize_request);
criterion_main!(benches);
