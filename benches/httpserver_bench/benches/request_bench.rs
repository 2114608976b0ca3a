//! Request loading benchmarks
//!
//! Measures the first-access cost of each lazily loaded field group and the
//! cost of repeated reads once a group is loaded.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use httpserver_core::{MemoryConnection, PercentDecoder, Request, RequestConfig};
use std::time::{Duration, Instant};

fn connection_with_headers(count: usize) -> MemoryConnection {
    let conn = MemoryConnection::new()
        .with_header("Host", "bench.local")
        .with_header(
            "Cookie",
            "session=0123456789abcdef; theme=dark; lang=en-US; tracking=a%20b%20c",
        )
        .with_query("page=2&limit=50&sort=name&filter=active%20users&q=rust+http");

    for i in 0..count {
        conn.push_header(format!("X-Custom-{}", i), format!("value-{}", i));
    }
    conn
}

/// First header access against growing header sets
fn bench_header_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_load");

    for count in [4, 16, 64] {
        let conn = connection_with_headers(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &conn, |b, conn| {
            b.iter(|| {
                let mut req = Request::with_connection(conn);
                black_box(req.get_header("host").len())
            })
        });
    }

    group.finish();
}

/// Repeated reads of an already loaded group
fn bench_loaded_reads(c: &mut Criterion) {
    let conn = connection_with_headers(16);
    let mut req = Request::with_connection(&conn).with_unescaper(&PercentDecoder);
    let _ = req.get_headers();
    let _ = req.get_args();

    c.bench_function("loaded_reads", |b| {
        b.iter(|| {
            black_box(req.get_header(black_box("X-CUSTOM-7")).len());
            black_box(req.get_arg(black_box("filter")).len());
        })
    });
}

/// Cookie parsing and argument unescaping
fn bench_cookies_and_args(c: &mut Criterion) {
    let conn = connection_with_headers(4);
    let mut group = c.benchmark_group("derived_groups");

    group.bench_function("cookies", |b| {
        b.iter(|| {
            let mut req = Request::with_connection(&conn).with_unescaper(&PercentDecoder);
            black_box(req.get_cookies().len())
        })
    });

    group.bench_function("args_unescaped", |b| {
        b.iter(|| {
            let mut req = Request::with_connection(&conn).with_unescaper(&PercentDecoder);
            black_box(req.get_args().len())
        })
    });

    group.bench_function("args_raw", |b| {
        b.iter(|| {
            let mut req = Request::with_connection(&conn);
            black_box(req.get_args().len())
        })
    });

    group.finish();
}

/// Body accumulation with and without a size limit
fn bench_grow_content(c: &mut Criterion) {
    let chunk = vec![b'x'; 4096];
    let limited = RequestConfig::new().content_size_limit(64 * 1024);
    let mut group = c.benchmark_group("grow_content");

    group.bench_function("unbounded_256k", |b| {
        b.iter(|| {
            let mut req = Request::new();
            for _ in 0..64 {
                req.grow_content(black_box(&chunk));
            }
            black_box(req.get_content().len())
        })
    });

    group.bench_function("limited_64k", |b| {
        b.iter(|| {
            let mut req = Request::new().with_config(&limited);
            for _ in 0..64 {
                req.grow_content(black_box(&chunk));
            }
            black_box(req.content_too_large())
        })
    });

    group.finish();
}

/// Full Digest verification, including the nonce lookup
fn bench_digest_check(c: &mut Criterion) {
    const HEADER: &str = concat!(
        "Digest username=\"Mufasa\", realm=\"testrealm@host.com\",",
        " nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\", uri=\"/dir/index.html\",",
        " response=\"670fd8c2df070c60b045671b8b24ff02\""
    );

    let conn = MemoryConnection::new().with_header("Authorization", HEADER);
    conn.insert_nonce(
        "dcd98b7102dd2f0e8b11d0f600bfb0c093",
        "testrealm@host.com",
        Instant::now(),
    );

    c.bench_function("digest_check", |b| {
        b.iter(|| {
            let mut req = Request::with_connection(&conn);
            req.set_method("GET");
            black_box(req.check_digest_auth(
                "testrealm@host.com",
                "Circle Of Life",
                Duration::from_secs(300),
            ))
        })
    });
}

criterion_group!(
    benches,
    bench_header_load,
    bench_loaded_reads,
    bench_cookies_and_args,
    bench_grow_content,
    bench_digest_check,
);
criterion_main!(benches);
