use std::{fmt::Debug, hash::Hash};

use rustc_hash::FxHashMap;

use super::{check_limit, CacheList, Evicted, Queue};
use crate::error::Result;

/// First in, first out. Lookups never reorder; the oldest insert leaves
/// first.
#[derive(Debug)]
pub struct FifoCache<K, V>
{
    limit: usize,
    entries: FxHashMap<K, (V, u64)>,
    queue: Queue<K>,
    next_ticket: u64,
}

impl<K, V> FifoCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    pub fn new(limit: usize) -> Result<Self>
    {
        check_limit(limit)?;
        Ok(FifoCache {
            limit,
            entries: FxHashMap::default(),
            queue: Queue::default(),
            next_ticket: 0,
        })
    }

    fn evict_front(&mut self, require_write_back: bool, on_evict: &mut dyn FnMut(Evicted<K, V>)) -> bool
    {
        while let Some(key) = self.queue.pop_front() {
            if let Some((value, _)) = self.entries.remove(&key) {
                log::trace!("FIFO evicting {:?}", key);
                on_evict(Evicted {
                    key,
                    value,
                    require_write_back,
                });
                return true;
            }
        }
        false
    }
}

impl<K, V> CacheList<K, V> for FifoCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    fn limit(&self) -> usize
    {
        self.limit
    }

    fn len(&self) -> usize
    {
        self.entries.len()
    }

    fn contains(&self, key: &K) -> bool
    {
        self.entries.contains_key(key)
    }

    fn set(&mut self, key: K, value: V, on_evict: &mut dyn FnMut(Evicted<K, V>)) -> bool
    {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.0 = value;
            return false;
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.queue.push_back(ticket, key.clone());
        self.entries.insert(key, (value, ticket));

        if self.entries.len() > self.limit {
            return self.evict_front(true, on_evict);
        }
        false
    }

    fn try_get(&mut self, key: &K, _on_evict: &mut dyn FnMut(Evicted<K, V>)) -> Option<V>
    {
        self.entries.get(key).map(|(value, _)| value.clone())
    }

    fn remove(&mut self, key: &K) -> Option<V>
    {
        let (value, ticket) = self.entries.remove(key)?;
        self.queue.remove(ticket);
        Some(value)
    }

    fn flush(&mut self, on_evict: &mut dyn FnMut(Evicted<K, V>))
    {
        while self.evict_front(true, on_evict) {}
    }

    fn clear(&mut self, on_evict: &mut dyn FnMut(Evicted<K, V>))
    {
        while self.evict_front(false, on_evict) {}
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_evicts_oldest_first()
    {
        let mut cache = FifoCache::new(128).unwrap();
        let mut evicted = Vec::new();

        for key in 1..=200_u32 {
            cache.set(key, key * 10, &mut |e| evicted.push(e));
            assert!(cache.len() <= 128);
        }

        assert_eq!(cache.len(), 128);
        assert_eq!(evicted.len(), 72);
        for (i, e) in evicted.iter().enumerate() {
            assert_eq!(e.key, i as u32 + 1);
            assert_eq!(e.value, e.key * 10);
            assert!(e.require_write_back);
        }
        assert!(!cache.contains(&72));
        assert!(cache.contains(&73));
    }

    #[test]
    fn test_update_keeps_position()
    {
        let mut cache = FifoCache::new(4).unwrap();
        let mut evicted = Vec::new();
        for key in 0..4 {
            cache.set(key, 'a', &mut |e| evicted.push(e));
        }
        assert!(!cache.set(0, 'b', &mut |e| evicted.push(e)));
        assert_eq!(cache.try_get(&0, &mut |e| evicted.push(e)), Some('b'));

        // Key 0 is still the oldest even after the update and the lookup
        assert!(cache.set(4, 'a', &mut |e| evicted.push(e)));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].key, 0);
        assert_eq!(evicted[0].value, 'b');
    }

    #[test]
    fn test_remove_skips_notification()
    {
        let mut cache = FifoCache::new(4).unwrap();
        let mut evicted = Vec::new();
        for key in 0..4 {
            cache.set(key, key, &mut |e| evicted.push(e));
        }
        assert_eq!(cache.remove(&1), Some(1));
        assert_eq!(cache.remove(&1), None);
        cache.set(9, 9, &mut |e| evicted.push(e));
        assert!(evicted.is_empty());
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_flush_is_idempotent()
    {
        let mut cache = FifoCache::new(8).unwrap();
        let mut evicted = Vec::new();
        for key in 0..5 {
            cache.set(key, key, &mut |e| evicted.push(e));
        }
        cache.flush(&mut |e| evicted.push(e));
        assert_eq!(evicted.iter().map(|e| e.key).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(cache.is_empty());

        cache.flush(&mut |e| evicted.push(e));
        assert_eq!(evicted.len(), 5);
    }

    #[test]
    fn test_clear_does_not_request_write_back()
    {
        let mut cache = FifoCache::new(8).unwrap();
        let mut evicted = Vec::new();
        cache.set(1, 1, &mut |e| evicted.push(e));
        cache.set(2, 2, &mut |e| evicted.push(e));
        cache.clear(&mut |e| evicted.push(e));
        assert_eq!(evicted.len(), 2);
        assert!(evicted.iter().all(|e| !e.require_write_back));
    }
}
