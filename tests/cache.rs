//! Concurrency behavior of `LookupCache` through the public API.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::{Duration, Instant},
};

use lookupcache::{
    cache::{CacheConfig, CacheRegistry},
    header::{Header, FIELD_ID},
    loader::{CacheLoader, CancelToken, FnLoader, LoadContext, LoaderBase},
    Error, LookupCache, LookupTable, Result,
};

/// Counts invocations per instance and sleeps inside every load.
struct SlowLoader {
    types: Vec<&'static str>,
    calls: AtomicUsize,
    delay: Duration,
}

impl SlowLoader {
    fn new(types: Vec<&'static str>, delay: Duration) -> Self {
        SlowLoader {
            types,
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CacheLoader for SlowLoader {
    fn supports(&self, _cache_type: &str, table_type: &str) -> bool {
        self.types.iter().any(|t| *t == table_type)
    }

    fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        let headers = vec![
            Header::new(ctx.table_type(), "1", "A"),
            Header::new(ctx.table_type(), "1", "B"),
        ];
        ctx.store(LookupTable::new(ctx.table_type(), headers, true));
        Ok(())
    }
}

#[test]
fn test_single_flight_load() {
    let loader = Arc::new(SlowLoader::new(vec!["X"], Duration::from_millis(100)));
    let cache = Arc::new(LookupCache::new("global", vec![loader.clone()]));
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get_table("X").unwrap().unwrap()
            })
        })
        .collect();

    let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(loader.calls(), 1);
    assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
}

#[test]
fn test_independent_types_do_not_block() {
    let delay = Duration::from_millis(300);
    let x = Arc::new(SlowLoader::new(vec!["X"], delay));
    let y = Arc::new(SlowLoader::new(vec!["Y"], delay));
    let cache = Arc::new(LookupCache::new("global", vec![x.clone(), y.clone()]));

    let start = Instant::now();
    let handles: Vec<_> = ["X", "Y"]
        .into_iter()
        .map(|table_type| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_table(table_type).unwrap().is_some())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    // serialized loads would take at least twice the delay
    assert!(start.elapsed() < delay * 2);
    assert_eq!(x.calls(), 1);
    assert_eq!(y.calls(), 1);
}

#[test]
fn test_separate_caches_load_separately() {
    let loader = Arc::new(SlowLoader::new(vec!["X"], Duration::ZERO));
    let registry = CacheRegistry::new(vec![loader.clone()]);

    registry.user("one").get_table("X").unwrap();
    registry.user("two").get_table("X").unwrap();
    registry.user("one").get_table("X").unwrap();
    assert_eq!(loader.calls(), 2);
}

#[test]
fn test_grouping_on_duplicate_ids() {
    let loader = Arc::new(SlowLoader::new(vec!["X"], Duration::ZERO));
    let cache = LookupCache::new("global", vec![loader]);
    let table = cache.get_table("X").unwrap().unwrap();

    let first = table.lookup_by_id("1").unwrap();
    assert_eq!(first.text, "A");
    assert_eq!(first.group(FIELD_ID).len(), 1);
    assert_eq!(first.group(FIELD_ID)[0].text, "B");
}

#[test]
fn test_eviction_forces_one_reload() {
    let loader = Arc::new(SlowLoader::new(vec!["X"], Duration::ZERO));
    let cache = LookupCache::new("global", vec![loader.clone()]);

    let before = cache.get_table("X").unwrap().unwrap();
    cache.remove("X");
    let after = cache.get_table("X").unwrap().unwrap();
    cache.get_table("X").unwrap();

    assert_eq!(loader.calls(), 2);
    assert!(!Arc::ptr_eq(&before, &after));
}

#[test]
fn test_failed_load_can_be_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let flaky = FnLoader::new(LoaderBase::with_types(true, ["X"]), move |table_type| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(Error::LoadFailed {
                table_type: table_type.to_string(),
                message: "timeout".to_string(),
            });
        }
        Ok(Some(vec![Header::new(table_type, "1", "one")]))
    });
    let steady = Arc::new(SlowLoader::new(vec!["X", "Other"], Duration::ZERO));
    let cache = LookupCache::with_config(
        "global",
        vec![Arc::new(flaky), steady.clone()],
        CacheConfig::sequential(),
    );

    let err = cache.get_table("X").unwrap_err();
    assert!(err.is_retryable());
    assert!(cache.is_empty());

    let table = cache.get_table("X").unwrap().unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    // the later loader wins the type both of them publish
    assert_eq!(table.lookup_by_id("1").unwrap().text, "A");
}

#[test]
fn test_cancellation_stores_nothing() {
    let cancel = CancelToken::new();
    let loader = Arc::new(SlowLoader::new(vec!["X"], Duration::from_millis(200)));
    let cache = Arc::new(LookupCache::new("global", vec![loader.clone()]));

    let handle = {
        let cache = Arc::clone(&cache);
        let cancel = cancel.clone();
        thread::spawn(move || cache.get_table_with_cancel("X", &cancel))
    };
    thread::sleep(Duration::from_millis(50));
    cancel.cancel();

    assert!(matches!(handle.join().unwrap(), Err(Error::Cancelled(_))));
    assert!(!cache.contains("X"));

    // safe to retry with a fresh token
    assert!(cache.get_table("X").unwrap().is_some());
}
