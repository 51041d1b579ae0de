use slotmap::SlotMap;

use super::{ContainerId, ContentStore, Deferred, PinnableContainer, PinnedContent};
use crate::{
    block::FixedList,
    error::{BigListError, Result},
};

/// Keeps every block resident. No cache, no backing file.
#[derive(Debug)]
pub struct MemoryStore<T>
{
    containers: SlotMap<ContainerId, PinnableContainer<T>>,
    deferred: Deferred,
}

impl<T> Default for MemoryStore<T>
{
    fn default() -> Self
    {
        MemoryStore {
            containers: SlotMap::with_key(),
            deferred: Deferred::default(),
        }
    }
}

impl<T> MemoryStore<T>
{
    pub fn new() -> Self
    {
        Self::default()
    }
}

impl<T> ContentStore<T> for MemoryStore<T>
{
    fn create_container(&mut self, content: FixedList<T>) -> Result<ContainerId>
    {
        self.deferred.check()?;
        Ok(self.containers.insert(PinnableContainer::new(content)))
    }

    fn try_get(&mut self, id: ContainerId) -> Result<Option<PinnedContent<'_, T, Self>>>
    {
        self.deferred.check()?;
        let content = match self.containers.get_mut(id).and_then(|c| c.content.take()) {
            Some(content) => content,
            None => return Ok(None),
        };
        Ok(Some(PinnedContent::new(self, id, content)))
    }

    fn set(&mut self, id: ContainerId, content: FixedList<T>) -> Result<()>
    {
        let container = self
            .containers
            .get_mut(id)
            .ok_or(BigListError::InvalidState("content released to an unknown container"))?;

        if container.is_removed {
            self.containers.remove(id);
            return Ok(());
        }
        container.content = Some(content);
        Ok(())
    }

    fn remove(&mut self, id: ContainerId) -> Result<()>
    {
        self.deferred.check()?;
        self.containers
            .remove(id)
            .map(|_| ())
            .ok_or(BigListError::NotFound(id))
    }

    fn commit(&mut self) -> Result<()>
    {
        self.deferred.check()
    }

    fn clone_container(&mut self, id: ContainerId, content: FixedList<T>) -> Result<ContainerId>
    {
        self.deferred.check()?;
        self.containers.remove(id).ok_or(BigListError::NotFound(id))?;
        Ok(self.containers.insert(PinnableContainer::new(content)))
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
