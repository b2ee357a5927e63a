use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use cyto_attr::{AttrDb, AttributeCache};

const CONTAINER: u64 = 1;

// ensure on an already-registered name is the hot path during imports
fn bench_ensure_existing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Ensure");
    group.sample_size(100);

    let sizes: Vec<_> = (1..4).map(|v| 10usize.pow(v)).collect();
    for size in sizes.iter() {
        group.throughput(criterion::Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("Existing", size), size, |b, &size| {
            let (db, _file) = AttrDb::create_temporary().unwrap();
            let cache = AttributeCache::new();

            let names: Vec<String> = (0..size).map(|i| format!("$P{i}N")).collect();
            for name in &names {
                db.ensure_keyword_name(&cache, CONTAINER, None, name).unwrap();
            }

            b.iter(|| {
                for name in &names {
                    let id = db
                        .ensure_keyword_name(&cache, CONTAINER, None, black_box(name))
                        .unwrap();
                    black_box(id);
                }
            });
        });
    }
}

// cached name lookups back every read of a keyword column
fn bench_cached_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("Cache");
    group.sample_size(100);

    let sizes: Vec<_> = (1..5).map(|v| 10usize.pow(v)).collect();
    for size in sizes.iter() {
        group.throughput(criterion::Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("ByName", size), size, |b, &size| {
            let (db, _file) = AttrDb::create_temporary().unwrap();
            let cache = AttributeCache::new();

            let names: Vec<String> = (0..size).map(|i| format!("$P{i}N")).collect();
            for name in &names {
                db.ensure_keyword_name(&cache, CONTAINER, None, name).unwrap();
            }

            // lookups fold case, so query a different casing than stored
            let queries: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
            b.iter(|| {
                for query in &queries {
                    let entry = cache
                        .by_name(
                            &db,
                            CONTAINER,
                            cyto_attr::AttributeType::Keyword,
                            black_box(query),
                        )
                        .unwrap();
                    assert!(entry.is_some());
                }
            });
        });
    }
}

criterion_group!(benches, bench_ensure_existing, bench_cached_lookup);
criterion_main!(benches);
