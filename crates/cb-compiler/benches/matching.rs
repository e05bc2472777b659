//! Benchmarks for request matching.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cb_compiler::compile_filter_list;
use cb_core::ResourceType;

fn generate_list(size: usize) -> String {
    let mut list = String::from("[Adblock Plus 2.0]\n! Title: Bench\n");
    for i in 0..size {
        let line = match i % 4 {
            0 => format!("||ads{i}.example.com^\n"),
            1 => format!("/banner{i}/*\n"),
            2 => format!("||track{i}.net^$script,third-party\n"),
            _ => format!("example{i}.com##.ad{i}\n"),
        };
        list.push_str(&line);
    }
    list.push_str("@@||ads0.example.com^$domain=trusted.com\n");
    list
}

fn bench_check_url(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_url");

    for size in &[100, 1000, 10000] {
        let index = compile_filter_list(&generate_list(*size)).index;

        group.bench_with_input(BenchmarkId::new("hit", size), &index, |b, index| {
            b.iter(|| {
                index.check_url(
                    black_box("https://news.site/"),
                    black_box("https://ads0.example.com/a.js"),
                    ResourceType::Script,
                )
            });
        });

        group.bench_with_input(BenchmarkId::new("exception", size), &index, |b, index| {
            b.iter(|| {
                index.check_url(
                    black_box("https://trusted.com/"),
                    black_box("https://ads0.example.com/a.js"),
                    ResourceType::Script,
                )
            });
        });

        // Miss: every start offset is tried
        group.bench_with_input(BenchmarkId::new("miss", size), &index, |b, index| {
            b.iter(|| {
                index.check_url(
                    black_box("https://news.site/"),
                    black_box("https://cdn.static-content.org/assets/app.bundle.js?v=12345"),
                    ResourceType::Script,
                )
            });
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for size in &[1000, 10000] {
        let list = generate_list(*size);
        group.bench_with_input(BenchmarkId::new("compile_filter_list", size), &list, |b, list| {
            b.iter(|| compile_filter_list(black_box(list)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_check_url, bench_compile);
criterion_main!(benches);
