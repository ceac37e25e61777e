//! Caching decorator for DataAccessLayer
//!
//! Read results are memoized in four independent caches: leaf values, node
//! existence, sorted list elements and unsorted list elements. List lengths are
//! derived from the unsorted cache.
//!
//! Any write clears all four caches, whichever path it touched.

use crate::dal::{DataAccessLayer, PathDump, PathStream, ValueStream};
use crate::error::{Error, Result};
use crate::memory_store::MemoryStore;
use crate::value::{LeafType, Value};
use async_trait::async_trait;
use diagnostics::*;
use futures::TryStreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Caches {
    values: HashMap<String, Option<Value>>,
    exists: HashMap<String, bool>,
    sorted: HashMap<String, Vec<String>>,
    unsorted: HashMap<String, Vec<String>>,
}

impl Caches {
    fn clear(&mut self) {
        self.values.clear();
        self.exists.clear();
        self.sorted.clear();
        self.unsorted.clear();
    }
}

/// Cache counters, for tests and diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub invalidations: u64,
}

/// Caching decorator around any DataAccessLayer implementation
pub struct CachingProxy<D: DataAccessLayer> {
    /// Wrapped backend
    inner: D,

    caches: Arc<Mutex<Caches>>,

    stats: Arc<Mutex<CacheStats>>,
}

impl<D: DataAccessLayer> CachingProxy<D> {
    /// Wrap a backend with caching
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            caches: Arc::new(Mutex::new(Caches::default())),
            stats: Arc::new(Mutex::new(CacheStats::default())),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub async fn cache_stats(&self) -> CacheStats {
        *self.stats.lock().await
    }

    /// Drop every cached answer.
    pub async fn clear_cache(&self) {
        self.caches.lock().await.clear();
        self.stats.lock().await.invalidations += 1;
        debug!("CachingProxy: all caches cleared");
    }

    async fn record_hit(&self) {
        self.stats.lock().await.hits += 1;
    }

    async fn record_miss(&self) {
        self.stats.lock().await.misses += 1;
    }

    async fn record_insert(&self) {
        self.stats.lock().await.inserts += 1;
    }

    /// Clear the caches whatever the outcome of the delegated write.
    async fn after_write<T>(&self, result: Result<T>) -> Result<T> {
        self.clear_cache().await;
        result
    }

    async fn cached_elements(&self, list_path: &str, sorted: bool) -> Result<Vec<String>> {
        {
            let caches = self.caches.lock().await;
            let cache = if sorted { &caches.sorted } else { &caches.unsorted };
            if let Some(elements) = cache.get(list_path) {
                let elements = elements.clone();
                drop(caches);
                self.record_hit().await;
                debug!("CachingProxy: cache HIT for elements of {list_path}", list_path);
                return Ok(elements);
            }
        }

        self.record_miss().await;
        debug!("CachingProxy: cache MISS for elements of {list_path}", list_path);
        let stream = if sorted {
            self.inner.gets_sorted(list_path, true).await?
        } else {
            self.inner.gets_unsorted(list_path, true).await?
        };
        let elements: Vec<String> = stream.try_collect().await?;

        let mut caches = self.caches.lock().await;
        let cache = if sorted {
            &mut caches.sorted
        } else {
            &mut caches.unsorted
        };
        cache.insert(list_path.to_string(), elements.clone());
        drop(caches);
        self.record_insert().await;
        Ok(elements)
    }

    async fn list_elements(
        &self,
        list_path: &str,
        ignore_empty_lists: bool,
        sorted: bool,
    ) -> Result<PathStream> {
        let elements = self.cached_elements(list_path, sorted).await?;
        if elements.is_empty() && !ignore_empty_lists {
            return Err(Error::list_does_not_contain_element(list_path));
        }
        Ok(MemoryStore::path_stream(elements))
    }

    async fn cached_exists(&self, path: &str) -> Option<bool> {
        self.caches.lock().await.exists.get(path).copied()
    }
}

#[async_trait]
impl<D: DataAccessLayer + Send + Sync + 'static> DataAccessLayer for CachingProxy<D> {
    fn id(&self) -> &'static str {
        self.inner.id()
    }

    async fn connect(&self, module: &str) -> Result<()> {
        let result = self.inner.connect(module).await;
        self.after_write(result).await
    }

    async fn disconnect(&self) -> Result<()> {
        let result = self.inner.disconnect().await;
        self.after_write(result).await
    }

    async fn commit(&self) -> Result<()> {
        self.inner.commit().await
    }

    async fn validate(&self) -> Result<()> {
        self.inner.validate().await
    }

    async fn get(&self, path: &str) -> Result<Option<Value>> {
        if let Some(value) = self.caches.lock().await.values.get(path).cloned() {
            self.record_hit().await;
            debug!("CachingProxy: cache HIT for get({path})", path);
            return Ok(value);
        }

        self.record_miss().await;
        debug!("CachingProxy: cache MISS for get({path})", path);
        let value = self.inner.get(path).await?;
        self.caches
            .lock()
            .await
            .values
            .insert(path.to_string(), value.clone());
        self.record_insert().await;
        Ok(value)
    }

    async fn set(&self, path: &str, value: Option<Value>, leaf_type: LeafType) -> Result<()> {
        let result = self.inner.set(path, value, leaf_type).await;
        self.after_write(result).await
    }

    async fn container(&self, path: &str) -> Result<bool> {
        if let Some(exists) = self.cached_exists(path).await {
            self.record_hit().await;
            return Ok(exists);
        }
        self.record_miss().await;
        let exists = self.inner.container(path).await?;
        self.caches
            .lock()
            .await
            .exists
            .insert(path.to_string(), exists);
        self.record_insert().await;
        Ok(exists)
    }

    async fn create_container(&self, path: &str) -> Result<()> {
        let result = self.inner.create_container(path).await;
        self.after_write(result).await
    }

    async fn create(&self, path: &str, keys: &[String], values: &[Value]) -> Result<()> {
        let result = self.inner.create(path, keys, values).await;
        self.after_write(result).await
    }

    async fn uncreate(&self, path: &str) -> Result<()> {
        let result = self.inner.uncreate(path).await;
        self.after_write(result).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let result = self.inner.delete(path).await;
        self.after_write(result).await
    }

    async fn gets_unsorted(&self, list_path: &str, ignore_empty_lists: bool) -> Result<PathStream> {
        self.list_elements(list_path, ignore_empty_lists, false).await
    }

    async fn gets_sorted(&self, list_path: &str, ignore_empty_lists: bool) -> Result<PathStream> {
        self.list_elements(list_path, ignore_empty_lists, true).await
    }

    async fn gets_len(&self, list_path: &str) -> Result<usize> {
        Ok(self.cached_elements(list_path, false).await?.len())
    }

    async fn has_item(&self, path: &str) -> Result<bool> {
        if let Some(exists) = self.cached_exists(path).await {
            self.record_hit().await;
            return Ok(exists);
        }
        self.record_miss().await;
        let exists = self.inner.has_item(path).await?;
        self.caches
            .lock()
            .await
            .exists
            .insert(path.to_string(), exists);
        self.record_insert().await;
        Ok(exists)
    }

    async fn add(&self, path: &str, value: Value, leaf_type: LeafType) -> Result<()> {
        let result = self.inner.add(path, value, leaf_type).await;
        self.after_write(result).await
    }

    async fn remove(&self, path: &str, value: &Value) -> Result<()> {
        let result = self.inner.remove(path, value).await;
        let result = self.after_write(result).await;
        let refreshed = self.inner.refresh().await;
        result.and(refreshed)
    }

    /// Leaf-list contents are not cached.
    async fn gets(&self, path: &str) -> Result<ValueStream> {
        self.inner.gets(path).await
    }

    async fn refresh(&self) -> Result<()> {
        let result = self.inner.refresh().await;
        self.after_write(result).await
    }

    async fn is_dirty(&self) -> Result<bool> {
        self.inner.is_dirty().await
    }

    async fn has_datastore_changed(&self) -> Result<bool> {
        self.inner.has_datastore_changed().await
    }

    async fn empty(&self) -> Result<()> {
        let result = self.inner.empty().await;
        self.after_write(result).await
    }

    async fn dump_paths(&self) -> Result<PathDump> {
        self.inner.dump_paths().await
    }

    async fn dumps(&self) -> Result<String> {
        self.inner.dumps().await
    }

    async fn loads(&self, payload: &str) -> Result<()> {
        let result = self.inner.loads(payload).await;
        self.after_write(result).await
    }

    async fn merges(&self, payload: &str) -> Result<()> {
        let result = self.inner.merges(payload).await;
        self.after_write(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn proxy() -> CachingProxy<MemoryStore> {
        let proxy = CachingProxy::new(MemoryStore::new());
        proxy.connect("m").await.expect("connect");
        proxy
    }

    #[tokio::test]
    async fn test_get_is_cached_until_a_write() {
        let proxy = proxy().await;
        assert_eq!(proxy.get("/m:a").await.expect("get"), None);
        assert_eq!(proxy.get("/m:a").await.expect("get"), None);
        let stats = proxy.cache_stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);

        proxy
            .set("/m:a", Some(Value::Int(1)), LeafType::Int32)
            .await
            .expect("set");
        assert_eq!(proxy.get("/m:a").await.expect("get"), Some(Value::Int(1)));
    }

    #[tokio::test]
    async fn test_len_follows_unsorted_cache() {
        let proxy = proxy().await;
        let keys = vec!["k".to_string()];
        proxy
            .create("/m:l[k='a']", &keys, &[Value::from("a")])
            .await
            .expect("create");
        assert_eq!(proxy.gets_len("/m:l").await.expect("len"), 1);
        proxy
            .create("/m:l[k='b']", &keys, &[Value::from("b")])
            .await
            .expect("create");
        assert_eq!(proxy.gets_len("/m:l").await.expect("len"), 2);
    }

    #[tokio::test]
    async fn test_merges_and_empty_invalidate() {
        let proxy = proxy().await;
        assert_eq!(proxy.get("/m:a").await.expect("get"), None);

        let source = MemoryStore::new();
        source.connect("m").await.expect("connect");
        source
            .set("/m:a", Some(Value::from("merged")), LeafType::String)
            .await
            .expect("set");
        proxy
            .merges(&source.dumps().await.expect("dumps"))
            .await
            .expect("merges");
        assert_eq!(
            proxy.get("/m:a").await.expect("get"),
            Some(Value::from("merged"))
        );
        assert!(proxy.is_dirty().await.expect("dirty"));

        proxy.empty().await.expect("empty");
        assert_eq!(proxy.get("/m:a").await.expect("get"), None);
    }

    #[tokio::test]
    async fn test_failed_write_still_invalidates() {
        let proxy = proxy().await;
        assert!(!proxy.has_item("/m:x").await.expect("has"));
        let before = proxy.cache_stats().await.invalidations;
        assert!(proxy.delete("/m:x").await.is_err());
        assert_eq!(proxy.cache_stats().await.invalidations, before + 1);
    }
}
