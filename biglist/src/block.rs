//! Fixed capacity blocks, the payload of every leaf.
//!
//! A block never grows past the capacity it was created with. Mutations
//! shift the tail in place; the cost is bounded by the leaf block size.

use crate::error::{BigListError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedList<T>
{
    items: Vec<T>,
    capacity: usize,
}

impl<T> Default for FixedList<T>
{
    fn default() -> Self
    {
        FixedList {
            items: Vec::new(),
            capacity: 0,
        }
    }
}

impl<T> FixedList<T>
{
    /// Create an empty block that can hold at most `capacity` items
    pub fn new(capacity: usize) -> Self
    {
        Self::with_capacity(capacity, capacity)
    }

    /// Create an empty block with `init_capacity` items preallocated and
    /// room for at most `max_capacity`
    pub fn with_capacity(init_capacity: usize, max_capacity: usize) -> Self
    {
        FixedList {
            items: Vec::with_capacity(init_capacity.min(max_capacity)),
            capacity: max_capacity,
        }
    }

    pub fn from_vec(items: Vec<T>, capacity: usize) -> Result<Self>
    {
        if items.len() > capacity {
            return Err(BigListError::capacity(items.len(), capacity));
        }
        Ok(FixedList { items, capacity })
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize
    {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool
    {
        self.items.len() >= self.capacity
    }

    /// Number of items that still fit
    #[inline]
    pub fn spare(&self) -> usize
    {
        self.capacity - self.items.len()
    }

    fn ensure_room(&self, additional: usize) -> Result<()>
    {
        let requested = self.items.len() + additional;
        if requested > self.capacity {
            return Err(BigListError::capacity(requested, self.capacity));
        }
        Ok(())
    }

    pub fn add(&mut self, item: T) -> Result<()>
    {
        self.ensure_room(1)?;
        self.items.push(item);
        Ok(())
    }

    pub fn add_range(&mut self, items: Vec<T>) -> Result<()>
    {
        self.ensure_room(items.len())?;
        self.items.extend(items);
        Ok(())
    }

    pub fn insert(&mut self, index: usize, item: T) -> Result<()>
    {
        if index > self.items.len() {
            return Err(BigListError::index(index, self.items.len()));
        }
        self.ensure_room(1)?;
        self.items.insert(index, item);
        Ok(())
    }

    /// Insert `items` before `index`, shifting the tail right
    pub fn insert_range(&mut self, index: usize, items: Vec<T>) -> Result<()>
    {
        if index > self.items.len() {
            return Err(BigListError::index(index, self.items.len()));
        }
        self.ensure_room(items.len())?;
        self.items.splice(index..index, items);
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Result<T>
    {
        if index >= self.items.len() {
            return Err(BigListError::index(index, self.items.len()));
        }
        Ok(self.items.remove(index))
    }

    /// Remove `count` items starting at `index`, shifting the tail left
    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<()>
    {
        let end = index
            .checked_add(count)
            .ok_or(BigListError::index(index, self.items.len()))?;
        if end > self.items.len() {
            return Err(BigListError::index(end, self.items.len()));
        }
        self.items.drain(index..end);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&T>
    {
        self.items
            .get(index)
            .ok_or(BigListError::index(index, self.items.len()))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T>
    {
        let len = self.items.len();
        self.items.get_mut(index).ok_or(BigListError::index(index, len))
    }

    /// Replace the item at `index`, returning the old one
    pub fn set(&mut self, index: usize, item: T) -> Result<T>
    {
        let slot = self.get_mut(index)?;
        Ok(std::mem::replace(slot, item))
    }

    /// Split the block at `at`. The returned block holds `[at, len)` and
    /// keeps the same capacity.
    pub fn split_off(&mut self, at: usize) -> Result<FixedList<T>>
    {
        if at > self.items.len() {
            return Err(BigListError::index(at, self.items.len()));
        }
        let mut tail = Vec::with_capacity(self.capacity);
        tail.extend(self.items.drain(at..));
        Ok(FixedList {
            items: tail,
            capacity: self.capacity,
        })
    }

    pub fn clear(&mut self)
    {
        self.items.clear();
    }

    #[inline]
    pub fn as_slice(&self) -> &[T]
    {
        &self.items
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T]
    {
        &mut self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T>
    {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T>
    {
        self.items
    }
}

impl<T: PartialEq> FixedList<T>
{
    pub fn index_of(&self, item: &T) -> Option<usize>
    {
        self.items.iter().position(|x| x == item)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_add_until_full()
    {
        let mut block = FixedList::new(4);
        for i in 0..4 {
            block.add(i).unwrap();
        }
        assert!(block.is_full());
        assert_eq!(block.spare(), 0);

        match block.add(4) {
            Err(BigListError::CapacityExceeded { requested, capacity }) => {
                assert_eq!(requested, 5);
                assert_eq!(capacity, 4);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(block.as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_insert_range_shifts_tail()
    {
        let mut block = FixedList::with_capacity(2, 8);
        block.add_range(vec!['a', 'b', 'e']).unwrap();
        block.insert_range(2, vec!['c', 'd']).unwrap();
        assert_eq!(block.as_slice(), &['a', 'b', 'c', 'd', 'e']);

        // 5 + 4 does not fit into 8
        assert!(block.insert_range(0, vec!['x'; 4]).is_err());
        assert_eq!(block.len(), 5);

        assert!(block.insert_range(6, vec!['z']).is_err());
    }

    #[test]
    fn test_remove_range_shifts_tail()
    {
        let mut block = FixedList::from_vec((0..10).collect(), 16).unwrap();
        block.remove_range(2, 3).unwrap();
        assert_eq!(block.as_slice(), &[0, 1, 5, 6, 7, 8, 9]);
        assert_eq!(block.remove_at(0).unwrap(), 0);
        assert!(block.remove_range(4, 3).is_err());
        assert!(block.remove_range(usize::MAX, 2).is_err());
        block.remove_range(0, block.len()).unwrap();
        assert!(block.is_empty());
    }

    #[test]
    fn test_split_off_keeps_capacity()
    {
        let mut block = FixedList::from_vec(vec![1, 2, 3, 4, 5], 8).unwrap();
        let tail = block.split_off(3).unwrap();
        assert_eq!(block.as_slice(), &[1, 2, 3]);
        assert_eq!(tail.as_slice(), &[4, 5]);
        assert_eq!(tail.capacity(), 8);
        assert_eq!(block.index_of(&2), Some(1));
        assert_eq!(tail.index_of(&2), None);
    }

    #[test]
    fn test_from_vec_rejects_oversized()
    {
        assert!(FixedList::from_vec(vec![0u8; 9], 8).is_err());
    }

    #[test]
    fn test_set_and_get()
    {
        let mut block = FixedList::from_vec(vec![10, 20, 30], 3).unwrap();
        assert_eq!(block.set(1, 25).unwrap(), 20);
        assert_eq!(*block.get(1).unwrap(), 25);
        assert!(block.get(3).is_err());
    }
}
