//! Benchmark SQL assembly and counting over a 1000-row table.

use criterion::{criterion_group, criterion_main, Criterion};
use rowkeep_db::bindings::cache_entries::{self, CacheEntry, CacheEntryBinding};
use rowkeep_db::{RecordManager, SelectQuery, SqliteStore};
use std::hint::black_box;
use std::sync::Arc;

fn setup() -> RecordManager<CacheEntryBinding> {
    let store = SqliteStore::memory().expect("store");
    store.initialize(cache_entries::SCHEMA).expect("schema");
    let manager = RecordManager::new(Arc::new(store), CacheEntryBinding).expect("manager");

    let expires = chrono::DateTime::from_timestamp(2_000_000_000, 0).expect("timestamp");
    for i in 0..1000 {
        let entry = CacheEntry::new(format!("GET /item/{i:04}"), vec![0u8; 256], expires)
            .with_header("Content-Type", "application/json");
        manager.replace(&entry).expect("replace");
    }
    manager
}

fn bench_select_sql(c: &mut Criterion) {
    let query = SelectQuery::new()
        .columns("id, key, local_expires")
        .filter("local_expires > 0")
        .order_by("id DESC")
        .limit(50)
        .offset(100);

    c.bench_function("select_sql", |b| {
        b.iter(|| black_box(query.to_sql(black_box("cache_entries")).unwrap()))
    });
}

fn bench_queries(c: &mut Criterion) {
    let manager = setup();

    c.bench_function("count_1000", |b| {
        b.iter(|| black_box(manager.count().unwrap()))
    });

    let page = SelectQuery::new().order_by("id").limit(50).offset(500);
    c.bench_function("select_page_50", |b| {
        b.iter(|| black_box(manager.select(&page).unwrap()))
    });
}

criterion_group!(benches, bench_select_sql, bench_queries);
criterion_main!(benches);
