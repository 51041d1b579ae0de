//! Bounded key/value caches deciding which containers stay resident.
//!
//! A policy never owns the cached content. Values are container handles;
//! when an entry leaves the cache the policy reports it through the
//! eviction callback and the store does the write back.

pub mod fifo;
pub mod two_queue;

use std::{collections::BTreeMap, fmt::Debug, hash::Hash};

use serde::{Deserialize, Serialize};

pub use fifo::FifoCache;
pub use two_queue::TwoQueueCache;

use crate::error::{BigListError, Result};

/// Smallest limit a policy accepts
pub const MIN_CACHE_LIMIT: usize = 4;

/// Notification fired once per entry leaving a cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evicted<K, V>
{
    pub key: K,
    pub value: V,
    /// False only when the cache is discarded without flushing
    pub require_write_back: bool,
}

pub trait CacheList<K, V>
{
    fn limit(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    fn contains(&self, key: &K) -> bool;

    /// Insert or update `key`. Returns true when the insert pushed an
    /// entry out, after reporting it to `on_evict`.
    fn set(&mut self, key: K, value: V, on_evict: &mut dyn FnMut(Evicted<K, V>)) -> bool;

    /// Look `key` up. Policies that promote on access may push other
    /// entries out while doing so.
    fn try_get(&mut self, key: &K, on_evict: &mut dyn FnMut(Evicted<K, V>)) -> Option<V>;

    /// Forget `key` without a notification
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Evict every entry in policy order, each with a write back request
    fn flush(&mut self, on_evict: &mut dyn FnMut(Evicted<K, V>));

    /// Drop every entry, reporting them without a write back request
    fn clear(&mut self, on_evict: &mut dyn FnMut(Evicted<K, V>));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CachePolicy
{
    Fifo,
    #[default]
    TwoQueue,
}

impl CachePolicy
{
    pub fn create<K, V>(self, limit: usize) -> Result<Box<dyn CacheList<K, V>>>
    where
        K: Hash + Eq + Clone + Debug + 'static,
        V: Clone + 'static,
    {
        Ok(match self {
            CachePolicy::Fifo => Box::new(FifoCache::new(limit)?),
            CachePolicy::TwoQueue => Box::new(TwoQueueCache::new(limit)?),
        })
    }
}

pub(crate) fn check_limit(limit: usize) -> Result<()>
{
    if limit < MIN_CACHE_LIMIT {
        return Err(BigListError::InvalidConfiguration(format!(
            "cache limit {limit} is below the minimum of {MIN_CACHE_LIMIT}"
        )));
    }
    Ok(())
}

/// Insertion ordered queue of keys with O(log n) removal from the middle.
///
/// Every push hands out a fresh ticket; the oldest ticket is the front.
#[derive(Debug)]
pub(crate) struct Queue<K>
{
    order: BTreeMap<u64, K>,
}

impl<K> Default for Queue<K>
{
    fn default() -> Self
    {
        Queue {
            order: BTreeMap::new(),
        }
    }
}

impl<K> Queue<K>
{
    pub fn push_back(&mut self, ticket: u64, key: K)
    {
        self.order.insert(ticket, key);
    }

    pub fn pop_front(&mut self) -> Option<K>
    {
        self.order.pop_first().map(|(_, key)| key)
    }

    pub fn remove(&mut self, ticket: u64) -> Option<K>
    {
        self.order.remove(&ticket)
    }

    pub fn len(&self) -> usize
    {
        self.order.len()
    }

    pub fn clear(&mut self)
    {
        self.order.clear();
    }
}
