//! Leaf content virtualisation.
//!
//! A leaf never holds its block directly; it holds a [`ContainerId`]. The
//! store decides where the block lives: resident in memory, serialized to
//! the backing file, or both. Content is only reachable through a
//! [`PinnedContent`] handle, which is an exclusive lease on one container.
//! Releasing the handle hands the block back to the store, which is the
//! write back point for every mutation window.

pub mod disk;
pub mod memory;
pub mod serializer;

use std::{
    mem,
    ops::{Deref, DerefMut},
};

use slotmap::new_key_type;

pub use disk::{DiskStats, DiskStore};
pub use memory::MemoryStore;
pub use serializer::{BincodeSerializer, Serializer};

use crate::{
    block::FixedList,
    error::{BigListError, Result},
};

new_key_type! {
    /// Handle of a container inside its store
    pub struct ContainerId;
}

/// Identity of a container inside the store's cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheIndex(pub u64);

/// Location of a serialized block in the backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskInfo
{
    /// Byte offset, always a multiple of the page size
    pub index: u64,
    /// Bytes reserved for the record, a multiple of the page size
    pub aligned_len: u64,
}

#[derive(Debug)]
pub struct PinnableContainer<T>
{
    /// `None` while the container is not tracked by the cache
    pub(crate) cache_index: Option<CacheIndex>,
    /// `None` while the content has never been written out
    pub(crate) info: Option<DiskInfo>,
    /// `None` while evicted, or while a handle holds the content
    pub(crate) content: Option<FixedList<T>>,
    pub(crate) is_removed: bool,
    /// Resident content differs from what `info` points at
    pub(crate) dirty: bool,
}

impl<T> PinnableContainer<T>
{
    pub fn new(content: FixedList<T>) -> Self
    {
        PinnableContainer {
            cache_index: None,
            info: None,
            content: Some(content),
            is_removed: false,
            dirty: true,
        }
    }

    pub fn cache_index(&self) -> Option<CacheIndex>
    {
        self.cache_index
    }

    pub fn info(&self) -> Option<DiskInfo>
    {
        self.info
    }

    pub fn is_resident(&self) -> bool
    {
        self.content.is_some()
    }

    pub fn is_removed(&self) -> bool
    {
        self.is_removed
    }

    pub fn is_dirty(&self) -> bool
    {
        self.dirty
    }
}

/// Where leaf blocks live.
///
/// Every successful [`ContentStore::try_get`] must be paired with a
/// release of the returned handle, or the store's cache accounting drifts.
/// Dropping the handle releases it; [`PinnedContent::release`] does the same
/// but reports failures directly.
pub trait ContentStore<T>: Sized
{
    /// Wrap `content` into a new container owned by the caller
    fn create_container(&mut self, content: FixedList<T>) -> Result<ContainerId>;

    /// Pin the content of `id`, loading it from the backing storage when
    /// needed. `Ok(None)` when there is nothing to load.
    fn try_get(&mut self, id: ContainerId) -> Result<Option<PinnedContent<'_, T, Self>>>;

    fn get(&mut self, id: ContainerId) -> Result<PinnedContent<'_, T, Self>>
    {
        self.try_get(id)?.ok_or(BigListError::NotFound(id))
    }

    /// Take changed content back from a handle. Called on release.
    fn set(&mut self, id: ContainerId, content: FixedList<T>) -> Result<()>;

    /// Take content back from a handle that only read it
    fn unpin(&mut self, id: ContainerId, content: FixedList<T>) -> Result<()>
    {
        self.set(id, content)
    }

    /// Mark `id` removed and give its cache slot and disk region back
    fn remove(&mut self, id: ContainerId) -> Result<()>;

    /// Write out everything that is dirty
    fn commit(&mut self) -> Result<()>;

    /// Move the cache and disk identity of `id` onto a new container
    /// holding `content`. `id` is retired.
    fn clone_container(&mut self, id: ContainerId, content: FixedList<T>) -> Result<ContainerId>;

    fn container(&self, id: ContainerId) -> Option<&PinnableContainer<T>>;

    /// Number of live containers
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// Park an error raised where it could not be returned. The next
    /// fallible call returns it.
    fn defer_error(&mut self, error: BigListError);
}

/// Exclusive, scoped lease on the content of one container
pub struct PinnedContent<'a, T, S: ContentStore<T>>
{
    store: &'a mut S,
    id: ContainerId,
    content: FixedList<T>,
    modified: bool,
    released: bool,
}

impl<'a, T, S: ContentStore<T>> PinnedContent<'a, T, S>
{
    pub fn new(store: &'a mut S, id: ContainerId, content: FixedList<T>) -> Self
    {
        PinnedContent {
            store,
            id,
            content,
            modified: false,
            released: false,
        }
    }

    pub fn id(&self) -> ContainerId
    {
        self.id
    }

    /// Hand the content back to the store
    pub fn release(mut self) -> Result<()>
    {
        self.released = true;
        self.give_back()
    }

    fn give_back(&mut self) -> Result<()>
    {
        let content = mem::take(&mut self.content);
        if self.modified {
            self.store.set(self.id, content)
        } else {
            self.store.unpin(self.id, content)
        }
    }
}

impl<T, S: ContentStore<T>> Deref for PinnedContent<'_, T, S>
{
    type Target = FixedList<T>;

    fn deref(&self) -> &FixedList<T>
    {
        &self.content
    }
}

impl<T, S: ContentStore<T>> DerefMut for PinnedContent<'_, T, S>
{
    fn deref_mut(&mut self) -> &mut FixedList<T>
    {
        self.modified = true;
        &mut self.content
    }
}

impl<T, S: ContentStore<T>> Drop for PinnedContent<'_, T, S>
{
    fn drop(&mut self)
    {
        if self.released {
            return;
        }
        if let Err(e) = self.give_back() {
            log::error!("Releasing {:?} failed: {}", self.id, e);
            self.store.defer_error(e);
        }
    }
}

/// Parked error from a drop-time release
#[derive(Debug, Default)]
pub(crate) struct Deferred(Option<BigListError>);

impl Deferred
{
    pub fn park(&mut self, error: BigListError)
    {
        if self.0.is_some() {
            log::warn!("Dropping an earlier deferred error in favour of: {}", error);
        }
        self.0 = Some(error);
    }

    pub fn check(&mut self) -> Result<()>
    {
        match self.0.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_dropped_handle_returns_content()
    {
        let mut store = MemoryStore::new();
        let id = store.create_container(FixedList::from_vec(vec![1, 2, 3], 8).unwrap()).unwrap();

        {
            let mut pinned = store.get(id).unwrap();
            pinned.add(4).unwrap();
        }

        let pinned = store.get(id).unwrap();
        assert_eq!(pinned.as_slice(), &[1, 2, 3, 4]);
        pinned.release().unwrap();
        assert!(store.container(id).unwrap().is_resident());
    }

    #[test]
    fn test_deferred_error_surfaces_once()
    {
        let mut deferred = Deferred::default();
        assert!(deferred.check().is_ok());
        deferred.park(BigListError::InvalidState("boom"));
        assert!(matches!(deferred.check(), Err(BigListError::InvalidState("boom"))));
        assert!(deferred.check().is_ok());
    }
}
