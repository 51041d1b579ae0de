//! Rows with both a length and a height, e.g. wrapped lines in a viewer.
//!
//! Works like [`crate::range`] with a second running total. `start` and
//! `top` are relative to the leaf and rewritten on every update.

use bincode::{Decode, Encode};

use crate::{
    biglist::BigList,
    builder::CustomBuilder,
    config::BigListConfig,
    error::Result,
    store::{ContentStore, MemoryStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct HeightRecord
{
    pub start: u64,
    pub length: u64,
    pub top: u64,
    pub height: u64,
}

impl HeightRecord
{
    pub fn new(length: u64, height: u64) -> Self
    {
        HeightRecord {
            start: 0,
            length,
            top: 0,
            height,
        }
    }

    pub fn end(&self) -> u64
    {
        self.start + self.length
    }

    pub fn bottom(&self) -> u64
    {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeightAggregate
{
    pub total_length: u64,
    pub total_height: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeightBuilder;

impl CustomBuilder<HeightRecord> for HeightBuilder
{
    type Aggregate = HeightAggregate;

    fn leaf_aggregate(&self, items: &[HeightRecord]) -> HeightAggregate
    {
        items.iter().fold(HeightAggregate::default(), |acc, r| HeightAggregate {
            total_length: acc.total_length + r.length,
            total_height: acc.total_height + r.height,
        })
    }

    fn concat_aggregate(&self, left: &HeightAggregate, right: &HeightAggregate) -> HeightAggregate
    {
        HeightAggregate {
            total_length: left.total_length + right.total_length,
            total_height: left.total_height + right.total_height,
        }
    }

    fn notify_update(
        &self,
        aggregate: &mut HeightAggregate,
        items: &mut [HeightRecord],
        start_index: usize,
        _delta: isize,
    )
    {
        let from = start_index.min(items.len());
        let (mut start, mut top) = match from {
            0 => (0, 0),
            i => (items[i - 1].end(), items[i - 1].bottom()),
        };
        for record in &mut items[from..] {
            record.start = start;
            record.top = top;
            start += record.length;
            top += record.height;
        }
        *aggregate = HeightAggregate {
            total_length: start,
            total_height: top,
        };
    }
}

pub struct HeightList<S = MemoryStore<HeightRecord>>
{
    list: BigList<HeightRecord, S, HeightBuilder>,
}

impl HeightList
{
    pub fn new(config: BigListConfig) -> Result<Self>
    {
        Self::with_store(config, MemoryStore::new())
    }
}

impl<S: ContentStore<HeightRecord>> HeightList<S>
{
    pub fn with_store(config: BigListConfig, store: S) -> Result<Self>
    {
        Ok(HeightList {
            list: BigList::with_store(config, store, HeightBuilder)?,
        })
    }

    pub fn len(&self) -> usize
    {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.list.is_empty()
    }

    pub fn total_length(&self) -> u64
    {
        self.list.root_aggregate().total_length
    }

    pub fn total_height(&self) -> u64
    {
        self.list.root_aggregate().total_height
    }

    pub fn add(&mut self, length: u64, height: u64) -> Result<()>
    {
        self.list.add(HeightRecord::new(length, height))
    }

    pub fn insert(&mut self, index: usize, length: u64, height: u64) -> Result<()>
    {
        self.list.insert(index, HeightRecord::new(length, height))
    }

    pub fn add_range(&mut self, records: impl IntoIterator<Item = HeightRecord>) -> Result<()>
    {
        self.list.add_range(records)
    }

    pub fn insert_range(&mut self, index: usize, records: impl IntoIterator<Item = HeightRecord>) -> Result<()>
    {
        self.list.insert_range(index, records)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<()>
    {
        self.list.remove_range(index, 1)
    }

    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<()>
    {
        self.list.remove_range(index, count)
    }

    /// Resize a row, shifting every later start and top
    pub fn set(&mut self, index: usize, length: u64, height: u64) -> Result<()>
    {
        self.list.set(index, HeightRecord::new(length, height)).map(|_| ())
    }

    /// Row at `index` with absolute start and top
    pub fn get(&mut self, index: usize) -> Result<HeightRecord>
    {
        let (record, prefix) = self.list.get_with_prefix(index)?;
        Ok(HeightRecord {
            start: prefix.total_length + record.start,
            length: record.length,
            top: prefix.total_height + record.top,
            height: record.height,
        })
    }

    /// Index of the row covering vertical offset `y`
    pub fn index_of_height(&mut self, y: u64) -> Result<Option<usize>>
    {
        let Some(seek) = self.list.seek(y, |a| a.total_height)? else {
            return Ok(None);
        };
        let within = self
            .list
            .with_leaf_at(seek.leaf_start, |rows, _| rows.partition_point(|r| r.bottom() <= seek.residual))?;
        Ok(Some(seek.leaf_start + within))
    }

    /// Index of the row covering text offset `offset`
    pub fn index_of_offset(&mut self, offset: u64) -> Result<Option<usize>>
    {
        let Some(seek) = self.list.seek(offset, |a| a.total_length)? else {
            return Ok(None);
        };
        let within = self
            .list
            .with_leaf_at(seek.leaf_start, |rows, _| rows.partition_point(|r| r.end() <= seek.residual))?;
        Ok(Some(seek.leaf_start + within))
    }

    pub fn commit(&mut self) -> Result<()>
    {
        self.list.commit()
    }

    pub fn as_list(&mut self) -> &mut BigList<HeightRecord, S, HeightBuilder>
    {
        &mut self.list
    }
}
