//! Build and integrity-check performance benchmarks.
//!
//! Measures table building from positional and textual rows, and the
//! data type and foreign key checks on collections of growing size.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ticdat::{Builder, DataType, IntegrityChecker, MemorySource, RawTable, Schema, TicDat, Value};

const SIZES: &[usize] = &[100, 1_000, 10_000];

fn schema() -> Schema {
    let mut schema = Schema::new();
    schema.add_table("foods", ["Name"], ["Cost"]).unwrap();
    schema.add_table("categories", ["Name"], ["Min", "Max"]).unwrap();
    schema
        .add_table("nutrition", ["Food", "Category"], ["Quantity"])
        .unwrap();
    schema.set_data_type("foods", "Cost", DataType::number()).unwrap();
    schema
        .set_data_type("nutrition", "Quantity", DataType::number())
        .unwrap();
    schema
        .set_data_type(
            "categories",
            "Max",
            DataType::number().with_max(f64::INFINITY, true).unwrap(),
        )
        .unwrap();
    schema
        .add_foreign_key("nutrition", "foods", &[("Food", "Name")])
        .unwrap();
    schema
        .add_foreign_key("nutrition", "categories", &[("Category", "Name")])
        .unwrap();
    schema
}

/// `n` foods, 10 categories, and one nutrition row per food and category
/// pair up to `n`, a tenth of them pointing at unknown foods.
fn source(n: usize, textual: bool) -> MemorySource {
    let cell = |v: Value| if textual { Value::Text(v.to_string()) } else { v };
    let foods = (0..n).map(|i| vec![cell(Value::Text(format!("food{}", i))), cell(Value::Float(i as f64 * 0.5))]);
    let categories = (0..10).map(|i| {
        vec![
            cell(Value::Text(format!("cat{}", i))),
            cell(Value::Int(i)),
            cell(Value::Float(f64::INFINITY)),
        ]
    });
    let nutrition = (0..n).map(|i| {
        let food = if i % 10 == 0 { format!("ghost{}", i) } else { format!("food{}", i) };
        vec![
            cell(Value::Text(food)),
            cell(Value::Text(format!("cat{}", i % 10))),
            cell(Value::Int(i as i64 % 7)),
        ]
    });
    let wrap = |raw: RawTable| if textual { raw.textual() } else { raw };
    MemorySource::new()
        .with_table("foods", wrap(RawTable::positional(foods)))
        .with_table("categories", wrap(RawTable::positional(categories)))
        .with_table("nutrition", wrap(RawTable::positional(nutrition)))
}

/// Benchmark building collections.
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let schema = schema();
    let builder = Builder::new(&schema);

    for &n in SIZES {
        let typed = source(n, false);
        group.bench_with_input(BenchmarkId::new("typed", n), &typed, |b, s| {
            b.iter(|| black_box(builder.build(s).unwrap()))
        });
        let textual = source(n, true);
        group.bench_with_input(BenchmarkId::new("textual", n), &textual, |b, s| {
            b.iter(|| black_box(builder.build(s).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark the integrity checks.
fn bench_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrity");
    let schema = schema();
    let checker = IntegrityChecker::new(&schema);

    for &n in SIZES {
        let dat: TicDat = Builder::new(&schema).build(&source(n, false)).unwrap();
        group.bench_with_input(BenchmarkId::new("data_types", n), &dat, |b, d| {
            b.iter(|| black_box(checker.find_data_type_failures(d)))
        });
        group.bench_with_input(BenchmarkId::new("foreign_keys", n), &dat, |b, d| {
            b.iter(|| black_box(checker.find_foreign_key_failures(d)))
        });
        group.bench_with_input(BenchmarkId::new("remove_foreign_key_failures", n), &dat, |b, d| {
            b.iter(|| {
                let mut copy = d.clone();
                black_box(checker.remove_foreign_key_failures(&mut copy).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_checks);
criterion_main!(benches);
