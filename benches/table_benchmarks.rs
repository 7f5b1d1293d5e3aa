use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sourcemap_engine::segment::Segment;
use sourcemap_engine::table::MappingTable;

fn build_table(lines: u32, segments_per_line: u32) -> MappingTable {
    let mut table = MappingTable::new();
    for line in 0..lines {
        for col in 0..segments_per_line {
            table.append(Segment::new(
                line,
                col * 4,
                Some(0),
                Some(line),
                Some(col),
                None,
            ));
        }
    }
    table
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");
    for &size in &[1_000u32, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut table = MappingTable::new();
                for line in 0..size {
                    table.append(Segment::new(line, 0, Some(0), Some(line), Some(0), None));
                }
                black_box(table);
            });
        });
    }
    group.finish();
}

fn bench_find_closest(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_closest");
    for &size in &[1_000u32, 10_000, 100_000, 1_000_000] {
        let table = build_table(size, 4);
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, table| {
            b.iter(|| black_box(table.find_closest(size / 2, 2)));
        });
    }
    group.finish();
}

fn bench_to_vlq(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_vlq");
    for &size in &[1_000u32, 10_000, 100_000] {
        let table = build_table(size, 4);
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, table| {
            b.iter(|| black_box(table.to_vlq()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_append, bench_find_closest, bench_to_vlq);
criterion_main!(benches);
