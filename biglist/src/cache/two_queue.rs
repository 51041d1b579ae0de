//! 2Q replacement.
//!
//! New keys enter a short FIFO (`in`). Keys pushed out of `in` are not
//! dropped yet, they move to a second FIFO (`out`) which may use all the
//! room the other two partitions leave free. A hit while in `out` proves
//! the key is reused and promotes it to a true LRU partition. Pages that
//! are touched once during a scan therefore never displace the hot set.
//!
//! ```text
//!   set(new) ──► [ in  FIFO ~20% ] ──overflow──► [ out FIFO, headroom ] ──► evicted
//!                                                      │ hit
//!                                                      ▼
//!                                 [ lru ~20% ] ──tail──► evicted
//! ```

use std::{fmt::Debug, hash::Hash};

use rustc_hash::FxHashMap;

use super::{check_limit, CacheList, Evicted, Queue};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Partition
{
    In,
    Out,
    Lru,
}

#[derive(Debug)]
struct Entry<V>
{
    value: V,
    partition: Partition,
    ticket: u64,
}

#[derive(Debug)]
pub struct TwoQueueCache<K, V>
{
    limit: usize,
    in_limit: usize,
    out_limit: usize,
    lru_limit: usize,
    entries: FxHashMap<K, Entry<V>>,
    in_queue: Queue<K>,
    out_queue: Queue<K>,
    lru: Queue<K>,
    next_ticket: u64,
}

impl<K, V> TwoQueueCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    pub fn new(limit: usize) -> Result<Self>
    {
        check_limit(limit)?;

        let in_limit = (limit * 20 / 100).max(1);
        let out_limit = (limit * 60 / 100).max(1);
        let lru_limit = limit.saturating_sub(in_limit + out_limit).max(1);

        Ok(TwoQueueCache {
            limit,
            in_limit,
            out_limit,
            lru_limit,
            entries: FxHashMap::default(),
            in_queue: Queue::default(),
            out_queue: Queue::default(),
            lru: Queue::default(),
            next_ticket: 0,
        })
    }

    /// Nominal partition sizes, `(in, out, lru)`
    pub fn partitions(&self) -> (usize, usize, usize)
    {
        (self.in_limit, self.out_limit, self.lru_limit)
    }

    /// Current partition occupancy, `(in, out, lru)`
    pub fn occupancy(&self) -> (usize, usize, usize)
    {
        (self.in_queue.len(), self.out_queue.len(), self.lru.len())
    }

    fn ticket(&mut self) -> u64
    {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    fn queue_mut(&mut self, partition: Partition) -> &mut Queue<K>
    {
        match partition {
            Partition::In => &mut self.in_queue,
            Partition::Out => &mut self.out_queue,
            Partition::Lru => &mut self.lru,
        }
    }

    fn push(&mut self, key: K, partition: Partition)
    {
        let ticket = self.ticket();
        self.queue_mut(partition).push_back(ticket, key.clone());
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.partition = partition;
            entry.ticket = ticket;
        }
    }

    fn evict_from(
        &mut self,
        partition: Partition,
        require_write_back: bool,
        on_evict: &mut dyn FnMut(Evicted<K, V>),
    ) -> bool
    {
        while let Some(key) = self.queue_mut(partition).pop_front() {
            if let Some(entry) = self.entries.remove(&key) {
                log::trace!("2Q evicting {:?} from {:?}", key, partition);
                on_evict(Evicted {
                    key,
                    value: entry.value,
                    require_write_back,
                });
                return true;
            }
        }
        false
    }

    /// The out queue may grow into whatever the lru partition does not use
    fn out_capacity(&self) -> usize
    {
        self.limit.saturating_sub(self.in_limit + self.lru.len())
    }

    fn drain_all(&mut self, require_write_back: bool, on_evict: &mut dyn FnMut(Evicted<K, V>))
    {
        for partition in [Partition::In, Partition::Out, Partition::Lru] {
            while self.evict_from(partition, require_write_back, on_evict) {}
            self.queue_mut(partition).clear();
        }
    }
}

impl<K, V> CacheList<K, V> for TwoQueueCache<K, V>
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
            entry.value = value;
            return false;
        }

        self.entries.insert(
            key.clone(),
            Entry {
                value,
                partition: Partition::In,
                ticket: 0,
            },
        );
        self.push(key, Partition::In);

        if self.in_queue.len() > self.in_limit {
            if let Some(demoted) = self.in_queue.pop_front() {
                self.push(demoted, Partition::Out);
            }
        }

        let mut evicted = false;
        while self.out_queue.len() > self.out_capacity() {
            if !self.evict_from(Partition::Out, true, on_evict) {
                break;
            }
            evicted = true;
        }

        // Only reachable when every key sits in `in` or `lru`
        while self.entries.len() > self.limit {
            if !self.evict_from(Partition::Lru, true, on_evict) && !self.evict_from(Partition::In, true, on_evict) {
                break;
            }
            evicted = true;
        }

        evicted
    }

    fn try_get(&mut self, key: &K, on_evict: &mut dyn FnMut(Evicted<K, V>)) -> Option<V>
    {
        let (partition, ticket, value) = {
            let entry = self.entries.get(key)?;
            (entry.partition, entry.ticket, entry.value.clone())
        };

        match partition {
            // Correlated references while still in `in` do not count
            Partition::In => {}
            Partition::Out => {
                self.out_queue.remove(ticket);
                if self.lru.len() >= self.lru_limit {
                    self.evict_from(Partition::Lru, true, on_evict);
                }
                log::trace!("2Q promoting {:?} to lru", key);
                self.push(key.clone(), Partition::Lru);
            }
            Partition::Lru => {
                self.lru.remove(ticket);
                self.push(key.clone(), Partition::Lru);
            }
        }

        Some(value)
    }

    fn remove(&mut self, key: &K) -> Option<V>
    {
        let entry = self.entries.remove(key)?;
        self.queue_mut(entry.partition).remove(entry.ticket);
        Some(entry.value)
    }

    fn flush(&mut self, on_evict: &mut dyn FnMut(Evicted<K, V>))
    {
        self.drain_all(true, on_evict);
    }

    fn clear(&mut self, on_evict: &mut dyn FnMut(Evicted<K, V>))
    {
        self.drain_all(false, on_evict);
    }
}
