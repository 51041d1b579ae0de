//! Disk backed content store.
//!
//! Blocks live in a temporary backing file as length prefixed records:
//!
//! ```text
//! offset (page aligned)
//! ├── u32 LE   payload length
//! └── payload  serialized block, compressed when configured
//! ```
//!
//! Only the containers tracked by the cache keep their content resident.
//! When the cache pushes a container out, its block is written back if it
//! changed since the last write and then dropped from memory. Regions given
//! up by removed or grown records go to a free list and are reused first.

use std::io::{Read, Seek, SeekFrom, Write};

use slotmap::SlotMap;
use tempfile::NamedTempFile;

use libcompression::CompressionConfig;

use super::{
    BincodeSerializer, CacheIndex, ContainerId, ContentStore, Deferred, DiskInfo, PinnableContainer, PinnedContent,
    Serializer,
};
use crate::{
    block::FixedList,
    cache::{CacheList, Evicted},
    config::StoreConfig,
    error::{BigListError, Result},
};

const LENGTH_PREFIX: u64 = 4;

/// Snapshot of a disk store's bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskStats
{
    pub containers: usize,
    pub resident: usize,
    pub cached: usize,
    pub file_len: u64,
    pub free_regions: usize,
    pub free_bytes: u64,
}

pub struct DiskStore<T, Z = BincodeSerializer>
{
    containers: SlotMap<ContainerId, PinnableContainer<T>>,
    cache: Box<dyn CacheList<CacheIndex, ContainerId>>,
    next_cache_index: u64,
    serializer: Z,
    compression: CompressionConfig,
    file: Option<NamedTempFile>,
    file_end: u64,
    free: Vec<DiskInfo>,
    page_size: u64,
    keep_file: bool,
    deferred: Deferred,
}

impl<T> DiskStore<T, BincodeSerializer>
where
    BincodeSerializer: Serializer<T>,
{
    pub fn new(config: &StoreConfig) -> Result<Self>
    {
        Self::with_serializer(config, BincodeSerializer)
    }
}

impl<T, Z: Serializer<T>> DiskStore<T, Z>
{
    pub fn with_serializer(config: &StoreConfig, serializer: Z) -> Result<Self>
    {
        config.validate()?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("biglist-").suffix(".pages");
        let file = match &config.directory {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        log::debug!("Backing file at {}", file.path().display());

        Ok(DiskStore {
            containers: SlotMap::with_key(),
            cache: config.policy.create(config.cache_limit)?,
            next_cache_index: 0,
            serializer,
            compression: config.compression.clone(),
            file: Some(file),
            file_end: 0,
            free: Vec::new(),
            page_size: config.page_size,
            keep_file: config.keep_file,
            deferred: Deferred::default(),
        })
    }

    pub fn stats(&self) -> DiskStats
    {
        DiskStats {
            containers: self.containers.len(),
            resident: self.containers.values().filter(|c| c.is_resident()).count(),
            cached: self.cache.len(),
            file_len: self.file_end,
            free_regions: self.free.len(),
            free_bytes: self.free.iter().map(|r| r.aligned_len).sum(),
        }
    }

    pub fn path(&self) -> Option<&std::path::Path>
    {
        self.file.as_ref().map(|f| f.path())
    }

    fn file_mut(&mut self) -> Result<&mut std::fs::File>
    {
        self.file
            .as_mut()
            .map(|f| f.as_file_mut())
            .ok_or(BigListError::InvalidState("backing file already closed"))
    }

    fn align(&self, len: u64) -> u64
    {
        len.div_ceil(self.page_size) * self.page_size
    }

    /// Best fit from the free list, else grow the file
    fn allocate(&mut self, needed: u64) -> DiskInfo
    {
        let best = self
            .free
            .iter()
            .enumerate()
            .filter(|(_, r)| r.aligned_len >= needed)
            .min_by_key(|(_, r)| r.aligned_len)
            .map(|(i, _)| i);

        if let Some(i) = best {
            let region = self.free.swap_remove(i);
            if region.aligned_len > needed {
                self.free.push(DiskInfo {
                    index: region.index + needed,
                    aligned_len: region.aligned_len - needed,
                });
            }
            log::debug!("Reusing region at {} for {} bytes", region.index, needed);
            return DiskInfo {
                index: region.index,
                aligned_len: needed,
            };
        }

        let info = DiskInfo {
            index: self.file_end,
            aligned_len: needed,
        };
        self.file_end += needed;
        log::debug!("Allocated region at {} for {} bytes", info.index, needed);
        info
    }

    fn free_region(&mut self, info: DiskInfo)
    {
        log::debug!("Freeing region at {} ({} bytes)", info.index, info.aligned_len);
        self.free.push(info);
    }

    fn write(&mut self, id: ContainerId, content: &FixedList<T>) -> Result<()>
    {
        let bytes = self.serializer.serialize(content)?;
        let payload = self.compression.compress(&bytes)?;
        let len = u32::try_from(payload.len()).map_err(|_| BigListError::capacity(payload.len(), u32::MAX as usize))?;
        let needed = self.align(LENGTH_PREFIX + payload.len() as u64);

        let previous = self
            .containers
            .get(id)
            .ok_or(BigListError::InvalidState("write back for an unknown container"))?
            .info;

        let info = match previous {
            Some(info) if info.aligned_len >= needed => info,
            Some(info) => {
                self.free_region(info);
                self.allocate(needed)
            }
            None => self.allocate(needed),
        };

        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(info.index))?;
        file.write_all(&len.to_le_bytes())?;
        file.write_all(&payload)?;

        if let Some(container) = self.containers.get_mut(id) {
            container.info = Some(info);
            container.dirty = false;
        }
        log::trace!("Wrote {:?}: {} bytes at {}", id, payload.len(), info.index);
        Ok(())
    }

    fn read(&mut self, info: DiskInfo) -> Result<FixedList<T>>
    {
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(info.index))?;
        let mut len = [0u8; 4];
        file.read_exact(&mut len)?;
        let len = u32::from_le_bytes(len) as u64;
        if len + LENGTH_PREFIX > info.aligned_len {
            return Err(BigListError::InvalidState("record length exceeds its region"));
        }

        let mut payload = vec![0u8; len as usize];
        file.read_exact(&mut payload)?;
        let bytes = self.compression.decompress(&payload)?;
        self.serializer.deserialize(&bytes)
    }

    /// Track `id` in the cache, giving it a cache index on first use
    fn admit(&mut self, id: ContainerId) -> Result<()>
    {
        let container = self
            .containers
            .get_mut(id)
            .ok_or(BigListError::InvalidState("admitting an unknown container"))?;

        let index = match container.cache_index {
            Some(index) => index,
            None => {
                let index = CacheIndex(self.next_cache_index);
                self.next_cache_index += 1;
                container.cache_index = Some(index);
                index
            }
        };

        let mut evicted = Vec::new();
        self.cache.set(index, id, &mut |e| evicted.push(e));
        self.write_back_all(evicted)
    }

    fn write_back_all(&mut self, evicted: Vec<Evicted<CacheIndex, ContainerId>>) -> Result<()>
    {
        for e in evicted {
            self.evict(e)?;
        }
        Ok(())
    }

    fn evict(&mut self, evicted: Evicted<CacheIndex, ContainerId>) -> Result<()>
    {
        let id = evicted.value;
        let Some(container) = self.containers.get_mut(id) else {
            return Ok(());
        };
        if container.cache_index != Some(evicted.key) {
            return Ok(());
        }
        container.cache_index = None;

        let Some(content) = container.content.take() else {
            return Ok(());
        };
        let needs_write = evicted.require_write_back && (container.dirty || container.info.is_none());

        if needs_write {
            if let Err(e) = self.write(id, &content) {
                if let Some(container) = self.containers.get_mut(id) {
                    container.content = Some(content);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drop the container and give back its cache slot and disk region
    fn release_container(&mut self, id: ContainerId)
    {
        if let Some(container) = self.containers.remove(id) {
            if let Some(index) = container.cache_index {
                self.cache.remove(&index);
            }
            if let Some(info) = container.info {
                self.free_region(info);
            }
        }
    }
}

impl<T, Z: Serializer<T>> ContentStore<T> for DiskStore<T, Z>
{
    fn create_container(&mut self, content: FixedList<T>) -> Result<ContainerId>
    {
        self.deferred.check()?;
        let id = self.containers.insert(PinnableContainer::new(content));
        self.admit(id)?;
        Ok(id)
    }

    fn try_get(&mut self, id: ContainerId) -> Result<Option<PinnedContent<'_, T, Self>>>
    {
        self.deferred.check()?;

        let Some(container) = self.containers.get(id) else {
            return Ok(None);
        };
        if container.is_removed {
            return Ok(None);
        }

        if container.is_resident() {
            match container.cache_index {
                Some(index) => {
                    let mut evicted = Vec::new();
                    self.cache.try_get(&index, &mut |e| evicted.push(e));
                    self.write_back_all(evicted)?;
                }
                None => self.admit(id)?,
            }
        } else {
            let Some(info) = container.info else {
                return Ok(None);
            };
            let content = self.read(info)?;
            log::trace!("Loaded {:?} from {}", id, info.index);
            if let Some(container) = self.containers.get_mut(id) {
                container.content = Some(content);
                container.dirty = false;
            }
            self.admit(id)?;
        }

        let content = self
            .containers
            .get_mut(id)
            .and_then(|c| c.content.take())
            .ok_or(BigListError::InvalidState("content evicted while pinning"))?;
        Ok(Some(PinnedContent::new(self, id, content)))
    }

    fn set(&mut self, id: ContainerId, content: FixedList<T>) -> Result<()>
    {
        let container = self
            .containers
            .get_mut(id)
            .ok_or(BigListError::InvalidState("content released to an unknown container"))?;

        if container.is_removed {
            self.release_container(id);
            return Ok(());
        }
        container.content = Some(content);
        container.dirty = true;

        self.deferred.check()?;
        self.admit(id)
    }

    fn unpin(&mut self, id: ContainerId, content: FixedList<T>) -> Result<()>
    {
        let container = self
            .containers
            .get_mut(id)
            .ok_or(BigListError::InvalidState("content released to an unknown container"))?;

        if container.is_removed {
            self.release_container(id);
            return Ok(());
        }
        container.content = Some(content);
        if container.cache_index.is_none() {
            self.admit(id)?;
        }
        Ok(())
    }

    fn remove(&mut self, id: ContainerId) -> Result<()>
    {
        self.deferred.check()?;
        let container = self.containers.get_mut(id).ok_or(BigListError::NotFound(id))?;
        container.is_removed = true;
        container.content = None;
        self.release_container(id);
        Ok(())
    }

    fn commit(&mut self) -> Result<()>
    {
        self.deferred.check()?;

        let mut evicted = Vec::new();
        self.cache.flush(&mut |e| evicted.push(e));
        let flushed = evicted.len();
        self.write_back_all(evicted)?;

        // Resident content the cache lost track of after a failed write
        let stray: Vec<ContainerId> = self
            .containers
            .iter()
            .filter(|(_, c)| c.is_resident() && (c.dirty || c.info.is_none()))
            .map(|(id, _)| id)
            .collect();
        for id in stray {
            if let Some(content) = self.containers.get_mut(id).and_then(|c| c.content.take()) {
                if let Err(e) = self.write(id, &content) {
                    if let Some(container) = self.containers.get_mut(id) {
                        container.content = Some(content);
                    }
                    return Err(e);
                }
            }
        }

        self.file_mut()?.flush()?;
        log::debug!("Committed {} cached containers", flushed);
        Ok(())
    }

    fn clone_container(&mut self, id: ContainerId, content: FixedList<T>) -> Result<ContainerId>
    {
        self.deferred.check()?;
        let old = self.containers.remove(id).ok_or(BigListError::NotFound(id))?;
        let new_id = self.containers.insert(PinnableContainer {
            cache_index: old.cache_index,
            info: old.info,
            content: Some(content),
            is_removed: false,
            dirty: true,
        });
        // Rebinds the existing cache entry, or admits the container afresh
        self.admit(new_id)?;
        Ok(new_id)
    }

    fn container(&self, id: ContainerId) -> Option<&PinnableContainer<T>>
    {
        self.containers.get(id)
    }

    fn len(&self) -> usize
    {
        self.containers.len()
    }

    fn defer_error(&mut self, error: BigListError)
    {
        self.deferred.park(error);
    }
}

impl<T, Z> Drop for DiskStore<T, Z>
{
    fn drop(&mut self)
    {
        // Content is discarded with the store, nothing is written back
        self.cache.clear(&mut |_| {});

        if let Some(file) = self.file.take() {
            if self.keep_file {
                match file.keep() {
                    Ok((_, path)) => log::warn!("Keeping backing file {}", path.display()),
                    Err(e) => log::error!("Could not keep backing file: {}", e),
                }
            }
        }
    }
}
