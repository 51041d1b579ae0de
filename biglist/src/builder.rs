use std::fmt::Debug;

use crate::block::FixedList;

/// Extension point for lists that carry per subtree statistics.
///
/// The tree never looks inside an aggregate. It asks the builder for a
/// leaf's aggregate after every change to that leaf's block, and for a
/// concat node's aggregate whenever the node is created or its children
/// are replaced. Aggregates therefore always describe the current content.
pub trait CustomBuilder<T>
{
    type Aggregate: Clone + Default + Debug;

    /// Allocate the block backing a new leaf
    fn create_block(&self, init_capacity: usize, max_capacity: usize) -> FixedList<T>
    {
        FixedList::with_capacity(init_capacity, max_capacity)
    }

    /// Aggregate of a leaf holding exactly `items`
    fn leaf_aggregate(&self, items: &[T]) -> Self::Aggregate;

    /// Combine the aggregates of two adjacent subtrees, `left` first
    fn concat_aggregate(&self, left: &Self::Aggregate, right: &Self::Aggregate) -> Self::Aggregate;

    /// Called exactly once after a leaf's block changed.
    ///
    /// Items before `start_index` are untouched; `delta` is the change in
    /// item count. Builders may rewrite items from `start_index` on, for
    /// example to keep relative offsets contiguous.
    fn notify_update(&self, aggregate: &mut Self::Aggregate, items: &mut [T], start_index: usize, delta: isize)
    {
        let _ = (start_index, delta);
        *aggregate = self.leaf_aggregate(items);
    }
}

/// Plain lists
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAggregate;

impl<T> CustomBuilder<T> for NoAggregate
{
    type Aggregate = ();

    fn leaf_aggregate(&self, _items: &[T]) {}

    fn concat_aggregate(&self, _left: &(), _right: &()) {}

    fn notify_update(&self, _aggregate: &mut (), _items: &mut [T], _start_index: usize, _delta: isize) {}
}
