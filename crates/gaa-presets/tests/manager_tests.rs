//! Integration tests for cache-first initialization and TriLaw gating.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gaa_presets::{
    BuiltinCatalog, MemoryCache, Preset, PresetCache, PresetCatalog, PresetManager, PresetResult,
};

/// Cache wrapper counting store calls.
struct CountingCache {
    inner: MemoryCache,
    stores: AtomicUsize,
}

impl CountingCache {
    fn new() -> Self {
        Self {
            inner: MemoryCache::new(),
            stores: AtomicUsize::new(0),
        }
    }

    fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PresetCache for CountingCache {
    async fn get_all(&self, table: &str) -> PresetResult<Vec<Preset>> {
        self.inner.get_all(table).await
    }

    async fn store(&self, table: &str, preset: &Preset) -> PresetResult<()> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(table, preset).await
    }
}

/// Catalog wrapper counting fetches.
struct CountingCatalog {
    inner: BuiltinCatalog,
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl PresetCatalog for CountingCatalog {
    async fn fetch_catalog(&self) -> PresetResult<Vec<Preset>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_catalog().await
    }
}

#[tokio::test]
async fn load_before_initialize_fails_with_explanation() {
    let manager = PresetManager::new(MemoryCache::new(), BuiltinCatalog);
    let outcome = manager.load_preset("deep-theta").await;
    assert!(!outcome.success);
    assert!(outcome.preset.is_none());
    assert!(outcome.message.unwrap().contains("initialize"));
}

#[tokio::test]
async fn accessible_presets_empty_before_initialize() {
    let manager = PresetManager::new(MemoryCache::new(), BuiltinCatalog);
    assert!(manager.accessible_presets().await.is_empty());
}

#[tokio::test]
async fn store_counts_match_catalog_size_and_warm_cache_skips_fetch() {
    let cache = Arc::new(CountingCache::new());
    let fetches = Arc::new(AtomicUsize::new(0));

    struct SharedCache(Arc<CountingCache>);
    #[async_trait]
    impl PresetCache for SharedCache {
        async fn get_all(&self, table: &str) -> PresetResult<Vec<Preset>> {
            self.0.get_all(table).await
        }
        async fn store(&self, table: &str, preset: &Preset) -> PresetResult<()> {
            self.0.store(table, preset).await
        }
    }

    let catalog = CountingCatalog {
        inner: BuiltinCatalog,
        fetches: fetches.clone(),
    };
    let manager = PresetManager::new(SharedCache(cache.clone()), catalog);
    manager.initialize("user-1").await.unwrap();

    let expected = gaa_presets::catalog::stock_presets().len();
    assert_eq!(cache.store_count(), expected);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    // Second manager over the now-warm cache: hydration only.
    let catalog2 = CountingCatalog {
        inner: BuiltinCatalog,
        fetches: fetches.clone(),
    };
    let manager2 = PresetManager::new(SharedCache(cache.clone()), catalog2);
    manager2.initialize("user-1").await.unwrap();
    assert_eq!(cache.store_count(), expected, "warm cache must not store");
    assert_eq!(fetches.load(Ordering::SeqCst), 1, "warm cache must not fetch");
}

#[tokio::test]
async fn concurrent_initialize_fetches_once() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let catalog = CountingCatalog {
        inner: BuiltinCatalog,
        fetches: fetches.clone(),
    };
    let manager = Arc::new(PresetManager::new(MemoryCache::new(), catalog));

    let a = {
        let m = manager.clone();
        tokio::spawn(async move { m.initialize("user-a").await })
    };
    let b = {
        let m = manager.clone();
        tokio::spawn(async move { m.initialize("user-b").await })
    };
    let (ra, rb) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
    assert_eq!(ra, rb);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tri_law_gate_filters_accessible_presets() {
    let manager = PresetManager::new(MemoryCache::new(), BuiltinCatalog);
    manager.initialize("user-1").await.unwrap();

    let accessible = manager.accessible_presets().await;
    assert!(accessible.iter().all(|p| p.tri_law.safety_compliance));
    assert!(!accessible.iter().any(|p| p.id == "strobe-gamma"));

    let blocked = manager.load_preset("strobe-gamma").await;
    assert!(!blocked.success);
    assert!(blocked.message.unwrap().contains("TriLaw"));

    let ok = manager.load_preset("deep-theta").await;
    assert!(ok.success);
    assert_eq!(ok.preset.unwrap().id, "deep-theta");
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let manager = PresetManager::new(MemoryCache::new(), BuiltinCatalog);
    let first = manager.initialize("user-1").await.unwrap();
    let second = manager.initialize("user-1").await.unwrap();
    assert_eq!(first, second);
    assert!(manager.is_initialized().await);
}
