//! End-to-end wiring: configuration layering into a running context

mod common;

use common::stores::FlakyStore;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tradeguard_core::cache::CacheKey;
use tradeguard_core::config::{TradeguardConfig, CACHE_BACKEND_COMPONENT};
use tradeguard_core::{CircuitState, ResilienceContext};

#[test]
fn test_env_overrides_reach_the_context() {
    env::set_var("TRADEGUARD__CACHE__L1_MAX_SIZE", "77");
    env::set_var("TRADEGUARD__CIRCUIT_BREAKERS__DEFAULT_CONFIG__FAILURE_THRESHOLD", "9");

    let loaded = TradeguardConfig::load_with_env(None, "test");

    env::remove_var("TRADEGUARD__CACHE__L1_MAX_SIZE");
    env::remove_var("TRADEGUARD__CIRCUIT_BREAKERS__DEFAULT_CONFIG__FAILURE_THRESHOLD");

    let config = loaded.unwrap();
    assert_eq!(config.cache.l1_max_size, 77);
    assert_eq!(config.circuit_breakers.default_config.failure_threshold, 9);

    let context = ResilienceContext::from_config(config).unwrap();
    assert_eq!(context.cache.stats().l1.max_size, 77);

    // Unlisted dependencies get the default settings
    let breaker = context.breaker("economic_calendar_v2").unwrap();
    assert_eq!(breaker.config().failure_threshold, 9);
}

#[tokio::test]
async fn test_context_clones_share_cache_and_breakers() {
    let mut config = TradeguardConfig::for_environment("test");
    config.cache.backend_circuit_breaker = true;
    let store = Arc::new(FlakyStore::new());

    let context = ResilienceContext::with_backing_store(config, store.clone()).unwrap();
    let handler_view = context.clone();

    let key = CacheKey::signals("eurusd:h4");
    context.cache.set(&key, "short", Some(Duration::from_millis(30)));
    assert_eq!(handler_view.cache.get(&key).as_deref(), Some("short"));

    let cleanup = context.spawn_cleanup_task();

    store.go_down();
    for _ in 0..3 {
        handler_view.cache.get(&CacheKey::signals("gbpusd:h4"));
    }
    assert_eq!(
        context
            .circuit_breakers
            .component_stats(CACHE_BACKEND_COMPONENT)
            .unwrap()
            .state,
        CircuitState::Open
    );

    cleanup.abort();
}
