use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;
use tradeguard_core::cache::{CacheKey, CacheService, LruCache, MemoryBackingStore};
use tradeguard_core::config::CacheConfig;
use tradeguard_core::resilience::{CircuitBreaker, CircuitBreakerConfig};

fn benchmark_lru_set(c: &mut Criterion) {
    let cache = LruCache::new(1000).unwrap();
    let keys: Vec<String> = (0..2000).map(|i| format!("market:quote:SYM{i}")).collect();
    let mut i = 0;

    c.bench_function("lru_set_with_eviction", |b| {
        b.iter(|| {
            cache.set(keys[i % keys.len()].as_str(), black_box(i), Duration::from_secs(60));
            i += 1;
        })
    });
}

fn benchmark_lru_get_hit(c: &mut Criterion) {
    let cache = LruCache::new(1000).unwrap();
    for i in 0..1000 {
        cache.set(format!("market:quote:SYM{i}"), i, Duration::from_secs(60));
    }

    c.bench_function("lru_get_hit", |b| {
        b.iter(|| cache.get(black_box("market:quote:SYM500")))
    });
}

fn benchmark_service_l1_hit(c: &mut Criterion) {
    let service = CacheService::new(
        &CacheConfig::for_test(),
        Arc::new(MemoryBackingStore::new(1000)),
        None,
    )
    .unwrap();
    let key = CacheKey::forex("EURUSD");
    service.set(&key, "1.0842", None);

    c.bench_function("cache_service_l1_hit", |b| b.iter(|| service.get(black_box(&key))));
}

fn benchmark_breaker_call(c: &mut Criterion) {
    let breaker = CircuitBreaker::new("market_data", CircuitBreakerConfig::default()).unwrap();

    c.bench_function("circuit_breaker_closed_call", |b| {
        b.iter(|| breaker.call(|| Ok::<_, ()>(black_box(42))))
    });
}

criterion_group!(
    benches,
    benchmark_lru_set,
    benchmark_lru_get_hit,
    benchmark_service_l1_hit,
    benchmark_breaker_call
);
criterion_main!(benches);
