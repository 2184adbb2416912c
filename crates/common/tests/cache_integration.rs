//! End-to-end stale-while-revalidate timeline, matching the scenario a
//! `CachedSource` drives against a real clock.

use std::sync::Arc;
use std::time::Duration;

use pulsearc_common::Cache;

#[tokio::test]
async fn swr_timeline_serves_stale_then_refreshed_value() {
    let cache: Arc<Cache<&'static str>> = Arc::new(Cache::new());
    cache.set_with_stale("page".into(), "A", Duration::from_millis(60), Duration::from_millis(400));

    tokio::time::sleep(Duration::from_millis(20)).await;
    match cache.get("page", || true) {
        pulsearc_common::CacheLookup::Hit { value, stale, .. } => {
            assert_eq!(value, "A");
            assert!(!stale);
        }
        pulsearc_common::CacheLookup::Miss => panic!("expected hit"),
    }

    tokio::time::sleep(Duration::from_millis(80)).await;
    let (stale_cache, should_revalidate) = match cache.get("page", || true) {
        pulsearc_common::CacheLookup::Hit { value, stale, should_revalidate, .. } => {
            assert_eq!(value, "A");
            (stale, should_revalidate)
        }
        pulsearc_common::CacheLookup::Miss => panic!("expected hit"),
    };
    assert!(stale_cache);
    assert!(should_revalidate);

    // Simulate the revalidation completing with a fresh value.
    cache.set_with_stale("page".into(), "B", Duration::from_millis(60), Duration::from_millis(400));
    cache.finish_revalidation("page");

    match cache.get("page", || true) {
        pulsearc_common::CacheLookup::Hit { value, stale, .. } => {
            assert_eq!(value, "B");
            assert!(!stale);
        }
        pulsearc_common::CacheLookup::Miss => panic!("expected hit"),
    }
}

#[tokio::test]
async fn invalidate_all_clears_every_key() {
    let cache: Cache<i32> = Cache::new();
    cache.set("a".into(), 1, Duration::from_secs(10));
    cache.set("b".into(), 2, Duration::from_secs(10));
    cache.invalidate_all();
    assert!(matches!(cache.get("a", || false), pulsearc_common::CacheLookup::Miss));
    assert!(matches!(cache.get("b", || false), pulsearc_common::CacheLookup::Miss));
}
