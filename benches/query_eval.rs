use std::hint::black_box;
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use portico::api::params::QueryParams;
use portico::cache::CacheService;
use portico::error::{PorticoError, Result};
use portico::query::{FilterSpec, Query, SortDirection, SortSpec};
use portico::remote::RemoteSource;
use portico::storage::DocumentStorage;

fn collection(n: usize) -> Value {
    let statuses = ["open", "closed", "pending", "archived"];
    Value::Array(
        (0..n)
            .map(|i| {
                json!({
                    "_id": {"$oid": format!("{i:024x}")},
                    "name": format!("Customer {i}"),
                    "status": statuses[i % statuses.len()],
                    "total": (i * 37) % 1000,
                    "createdAt": {"$date": {"$numberLong": (1_600_000_000_000i64 + i as i64 * 86_400_000).to_string()}},
                    "tags": ["retail", if i % 2 == 0 { "vip" } else { "standard" }],
                })
            })
            .collect(),
    )
}

fn bench_evaluate(c: &mut Criterion) {
    let docs = collection(5_000);

    let filter_only = Query::new().with_filter(FilterSpec::from_value(
        json!({"status": {"$in": ["open", "pending"]}, "total": {"$gt": 250}}),
    ));
    c.bench_function("query/filter_5k", |b| {
        b.iter(|| black_box(filter_only.evaluate(black_box(&docs))))
    });

    let sorted = Query::new()
        .with_sort(SortSpec::new("name", SortDirection::Asc))
        .with_limit(50);
    c.bench_function("query/sort_name_5k", |b| {
        b.iter(|| black_box(sorted.evaluate(black_box(&docs))))
    });

    let searched = Query::new().with_search("customer 42").with_skip(1).with_limit(10);
    c.bench_function("query/search_5k", |b| {
        b.iter(|| black_box(searched.evaluate(black_box(&docs))))
    });

    let dated = Query::new().with_filter(FilterSpec::from_value(
        json!({"createdAt": {"$gt": "01/01/2021", "$lt": "2022-01-01"}}),
    ));
    c.bench_function("query/date_range_5k", |b| {
        b.iter(|| black_box(dated.evaluate(black_box(&docs))))
    });
}

fn bench_params(c: &mut Criterion) {
    let raw = "ev=acme&status=open&status=pending&total[$gt]=250&tags[]=vip&sort=name:desc&search=customer&skip=10&limit=20";
    c.bench_function("params/parse_to_query", |b| {
        b.iter(|| black_box(QueryParams::parse(Some(black_box(raw))).to_query()))
    });
}

/// Storage that never holds anything.
struct NoStorage;

#[async_trait]
impl DocumentStorage for NoStorage {
    async fn save(&self, _: &str, _: &str, _: &Value) -> Result<()> {
        Ok(())
    }
    async fn load(&self, _: &str, _: &str) -> Result<Option<Value>> {
        Ok(None)
    }
    async fn delete(&self, _: &str, _: &str) -> Result<bool> {
        Ok(false)
    }
}

struct NoRemote;

#[async_trait]
impl RemoteSource for NoRemote {
    async fn fetch(&self, endpoint: &str, _: &[(String, String)]) -> Result<Value> {
        Err(PorticoError::Fetch(format!("no upstream for {endpoint}")))
    }
}

fn bench_warm_get(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let service = CacheService::new(Arc::new(NoStorage), Arc::new(NoRemote), "undefined", vec![]);
    service.store().put("acme", "customers", collection(5_000));
    let query = QueryParams::parse(Some("status=open&sort=total:desc&limit=25")).to_query();

    c.bench_function("cache/warm_get_5k", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(service.get("acme", "customers", &query).await) })
    });
}

criterion_group!(benches, bench_evaluate, bench_params, bench_warm_get);
criterion_main!(benches);
