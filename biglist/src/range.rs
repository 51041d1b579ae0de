//! Cumulative ranges, e.g. the line index of a text buffer.
//!
//! Records are contiguous: each one starts where the previous one ends.
//! Inside a leaf `start` is relative to the leaf; the absolute value comes
//! from the lengths of every record before the leaf, which the tree keeps
//! as a running total. Starts handed in by callers are not trusted; they are
//! rewritten from the preceding lengths on every update.

use bincode::{Decode, Encode};

use crate::{
    biglist::BigList,
    builder::CustomBuilder,
    config::BigListConfig,
    error::Result,
    store::{ContentStore, MemoryStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct Range
{
    pub start: u64,
    pub length: u64,
}

impl Range
{
    pub fn new(start: u64, length: u64) -> Self
    {
        Range { start, length }
    }

    pub fn with_length(length: u64) -> Self
    {
        Range { start: 0, length }
    }

    #[inline]
    pub fn end(&self) -> u64
    {
        self.start + self.length
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeAggregate
{
    pub total_length: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RangeBuilder;

impl CustomBuilder<Range> for RangeBuilder
{
    type Aggregate = RangeAggregate;

    fn leaf_aggregate(&self, items: &[Range]) -> RangeAggregate
    {
        RangeAggregate {
            total_length: items.iter().map(|r| r.length).sum(),
        }
    }

    fn concat_aggregate(&self, left: &RangeAggregate, right: &RangeAggregate) -> RangeAggregate
    {
        RangeAggregate {
            total_length: left.total_length + right.total_length,
        }
    }

    fn notify_update(&self, aggregate: &mut RangeAggregate, items: &mut [Range], start_index: usize, _delta: isize)
    {
        let from = start_index.min(items.len());
        let mut start = match from {
            0 => 0,
            i => items[i - 1].end(),
        };
        for range in &mut items[from..] {
            range.start = start;
            start += range.length;
        }
        aggregate.total_length = start;
    }
}

pub struct RangeList<S = MemoryStore<Range>>
{
    list: BigList<Range, S, RangeBuilder>,
}

impl RangeList
{
    pub fn new(config: BigListConfig) -> Result<Self>
    {
        Self::with_store(config, MemoryStore::new())
    }
}

impl<S: ContentStore<Range>> RangeList<S>
{
    pub fn with_store(config: BigListConfig, store: S) -> Result<Self>
    {
        Ok(RangeList {
            list: BigList::with_store(config, store, RangeBuilder)?,
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

    /// Sum of every record's length
    pub fn total_length(&self) -> u64
    {
        self.list.root_aggregate().total_length
    }

    pub fn add(&mut self, range: Range) -> Result<()>
    {
        self.list.add(range)
    }

    pub fn insert(&mut self, index: usize, range: Range) -> Result<()>
    {
        self.list.insert(index, range)
    }

    pub fn add_range(&mut self, ranges: impl IntoIterator<Item = Range>) -> Result<()>
    {
        self.list.add_range(ranges)
    }

    pub fn insert_range(&mut self, index: usize, ranges: impl IntoIterator<Item = Range>) -> Result<()>
    {
        self.list.insert_range(index, ranges)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<()>
    {
        self.list.remove_range(index, 1)
    }

    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<()>
    {
        self.list.remove_range(index, count)
    }

    /// Change the length of a record, shifting every later start
    pub fn set_length(&mut self, index: usize, length: u64) -> Result<()>
    {
        self.list.set(index, Range::with_length(length)).map(|_| ())
    }

    /// Record at `index` with its absolute start
    pub fn get(&mut self, index: usize) -> Result<Range>
    {
        let (range, prefix) = self.list.get_with_prefix(index)?;
        Ok(Range::new(prefix.total_length + range.start, range.length))
    }

    /// Index of the record covering `offset`
    pub fn index_of_offset(&mut self, offset: u64) -> Result<Option<usize>>
    {
        let Some(seek) = self.list.seek(offset, |a| a.total_length)? else {
            return Ok(None);
        };
        let within = self
            .list
            .with_leaf_at(seek.leaf_start, |items, _| items.partition_point(|r| r.end() <= seek.residual))?;
        Ok(Some(seek.leaf_start + within))
    }

    pub fn commit(&mut self) -> Result<()>
    {
        self.list.commit()
    }

    pub fn as_list(&mut self) -> &mut BigList<Range, S, RangeBuilder>
    {
        &mut self.list
    }
}
