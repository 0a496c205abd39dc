use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use datamapper::qb::{self, Select, placeholder};

/// SELECT col0, col1, ... FROM t WHERE (col0 = ?) AND (col1 = ?) ...
fn build_select(n: usize) -> Select {
    let cols: Vec<String> = (0..n).map(|i| format!("col{i}")).collect();
    let mut select = qb::select("t").set_cols(cols);
    for i in 0..n {
        select = select.and_where_one(&format!("col{i} = ?"), i as i64);
    }
    select
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("select/compile");

    for n in [1, 5, 10, 50, 100] {
        let select = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &select, |b, select| {
            b.iter(|| black_box(select.compile()));
        });
    }

    group.finish();
}

fn bench_build_and_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("select/build_and_compile");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_select(n).compile()));
        });
    }

    group.finish();
}

fn bench_subquery(c: &mut Criterion) {
    let mut group = c.benchmark_group("select/subquery");

    for n in [1, 5, 20] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let select = qb::select("users")
                    .and_where_one("active = ?", true)
                    .and_in("id", build_select(n));
                black_box(select.compile())
            });
        });
    }

    group.finish();
}

fn bench_where_in_literals(c: &mut Criterion) {
    let mut group = c.benchmark_group("select/where_in_literals");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let select = qb::select("t").and_in("id", values.clone());
                black_box(select.compile())
            });
        });
    }

    group.finish();
}

fn bench_to_numbered(c: &mut Criterion) {
    let mut group = c.benchmark_group("placeholder/to_numbered");

    for n in [1, 10, 100] {
        let sql = build_select(n).to_string();
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| black_box(placeholder::to_numbered(sql)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compile,
    bench_build_and_compile,
    bench_subquery,
    bench_where_in_literals,
    bench_to_numbered
);
criterion_main!(benches);
