//! Bounded, expiring memoization of provider lookups and whole responses.
//!
//! The cache is a capability handed to whoever needs it. [`MokaResultCache`]
//! keeps up to `capacity` entries, evicts the least recently used one when
//! full and forgets entries after `ttl`. [`NoopCache`] stands in when caching
//! is switched off: every lookup misses and nothing is stored.
//!
//! Concurrent misses on the same key are not coalesced; both callers compute
//! and the last write wins.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use tracing::debug;

use crate::model::{Address, BinId, BinType, PropertyBins, PropertyId, Schedule, WorkflowId};
use crate::ports::{AddressPort, BinsGateway, PortError};

/// Default number of entries kept per cache.
pub const DEFAULT_CAPACITY: u64 = 4096;
/// Default lifetime of a cached entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);
/// Longest lifetime a cache entry may be given; longer values are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Sizing and lifetime of the result caches.
pub struct CacheConfig {
    /// When false every cache is a [`NoopCache`].
    pub enabled: bool,
    /// Maximum number of entries per cache.
    pub capacity: u64,
    /// Time after which an entry is treated as absent.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
        }
    }
}

impl CacheConfig {
    /// Configuration with caching switched off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Build a cache for values of type `V` according to this configuration.
    #[must_use]
    pub fn build<V>(&self, name: &str) -> Arc<dyn ResultCache<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        if self.enabled {
            Arc::new(MokaResultCache::new(name, self.capacity, self.ttl))
        } else {
            Arc::new(NoopCache::default())
        }
    }
}

#[async_trait]
/// Key/value store used to memoize lookups.
pub trait ResultCache<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Return the live entry for `key`, if any.
    async fn get(&self, key: &str) -> Option<V>;

    /// Store `value` under `key`, replacing any previous entry.
    async fn put(&self, key: String, value: V);
}

/// Return the cached value for `key`, or run `compute` and cache its result.
///
/// Failed computations are not cached.
///
/// # Errors
///
/// Returns whatever error `compute` produced.
pub async fn get_or_compute<C, V, E, F, Fut>(cache: &C, key: &str, compute: F) -> Result<V, E>
where
    C: ResultCache<V> + ?Sized,
    V: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    if let Some(hit) = cache.get(key).await {
        debug!(key, "cache hit");
        return Ok(hit);
    }

    debug!(key, "cache miss");
    let value = compute().await?;
    cache.put(key.to_owned(), value.clone()).await;
    Ok(value)
}

/// LRU cache with a fixed time-to-live, backed by `moka`.
pub struct MokaResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<String, V>,
}

impl<V> MokaResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `capacity` entries for at most `ttl` each.
    ///
    /// `ttl` is clamped to [`MAX_TTL`].
    #[must_use]
    pub fn new(name: &str, capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .name(name)
            .max_capacity(capacity)
            .time_to_live(ttl.min(MAX_TTL))
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { cache }
    }

    /// Approximate number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Apply pending evictions and expirations now.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[async_trait]
impl<V> ResultCache<V> for MokaResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        self.cache.get(key).await
    }

    async fn put(&self, key: String, value: V) {
        self.cache.insert(key, value).await;
    }
}

/// Cache that never stores anything.
pub struct NoopCache<V> {
    marker: PhantomData<fn() -> V>,
}

impl<V> Default for NoopCache<V> {
    fn default() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

#[async_trait]
impl<V> ResultCache<V> for NoopCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, _key: &str) -> Option<V> {
        None
    }

    async fn put(&self, _key: String, _value: V) {}
}

/// Gateway decorator that memoizes each lookup by its identifier.
pub struct CachedGateway {
    inner: Arc<dyn BinsGateway>,
    properties: Arc<dyn ResultCache<PropertyBins>>,
    bin_types: Arc<dyn ResultCache<BinType>>,
    workflows: Arc<dyn ResultCache<WorkflowId>>,
    schedules: Arc<dyn ResultCache<Schedule>>,
}

impl CachedGateway {
    /// Wrap `inner`, creating one cache per lookup from `config`.
    #[must_use]
    pub fn new(inner: Arc<dyn BinsGateway>, config: &CacheConfig) -> Self {
        Self {
            inner,
            properties: config.build("properties"),
            bin_types: config.build("bin-types"),
            workflows: config.build("workflow-ids"),
            schedules: config.build("schedules"),
        }
    }
}

#[async_trait]
impl BinsGateway for CachedGateway {
    async fn bins_for_property(&self, property: &PropertyId) -> Result<PropertyBins, PortError> {
        get_or_compute(self.properties.as_ref(), &property.0, || {
            self.inner.bins_for_property(property)
        })
        .await
    }

    async fn bin_type(&self, bin: &BinId) -> Result<BinType, PortError> {
        get_or_compute(self.bin_types.as_ref(), &bin.0, || self.inner.bin_type(bin)).await
    }

    async fn workflow_id(&self, bin: &BinId) -> Result<WorkflowId, PortError> {
        get_or_compute(self.workflows.as_ref(), &bin.0, || self.inner.workflow_id(bin)).await
    }

    async fn schedule(&self, workflow: &WorkflowId) -> Result<Schedule, PortError> {
        get_or_compute(self.schedules.as_ref(), &workflow.0, || {
            self.inner.schedule(workflow)
        })
        .await
    }
}

/// Address search decorator keyed by the postcode with spacing and case removed.
pub struct CachedAddresses {
    inner: Arc<dyn AddressPort>,
    results: Arc<dyn ResultCache<Vec<Address>>>,
}

impl CachedAddresses {
    /// Wrap `inner` with a cache built from `config`.
    #[must_use]
    pub fn new(inner: Arc<dyn AddressPort>, config: &CacheConfig) -> Self {
        Self {
            inner,
            results: config.build("addresses"),
        }
    }
}

#[async_trait]
impl AddressPort for CachedAddresses {
    async fn search(&self, postcode: &str) -> Result<Vec<Address>, PortError> {
        let key: String = postcode
            .split_whitespace()
            .flat_map(str::chars)
            .flat_map(char::to_uppercase)
            .collect();
        get_or_compute(self.results.as_ref(), &key, || self.inner.search(postcode)).await
    }
}
