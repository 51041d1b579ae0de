//! The rope: a balanced binary tree of concat nodes over leaf blocks.
//!
//! Every mutating walk returns the handle that should take the place of the
//! node it was called on. Most of the time that is the node itself, updated
//! in place; a full leaf turns into a new concat node, and a subtree whose
//! items were all removed returns `None`. Parents overwrite their child
//! slots with whatever comes back and recompute their own count, depth and
//! aggregate.
//!
//! Depth is kept in check with the rebalancing scheme of Boehm, Atkinson and
//! Plass: a node of depth `d` is balanced when it holds at least
//! `FIBONACCI[d]` items. When the root drifts too far from that bound the
//! tree is taken apart into maximal balanced subtrees and glued back
//! together smallest first.

use std::{marker::PhantomData, mem};

use slotmap::SlotMap;

use crate::{
    block::FixedList,
    builder::CustomBuilder,
    chain::LeafChain,
    config::BigListConfig,
    error::{BigListError, Result},
    node::{ConcatNode, LeafNode, Node, NodeId, FIBONACCI, MAX_FIB},
    store::ContentStore,
};

type Slots = [Option<NodeId>; MAX_FIB + 1];

pub(crate) struct Tree<T, S, B: CustomBuilder<T>>
{
    pub nodes: SlotMap<NodeId, Node<B::Aggregate>>,
    pub chain: LeafChain<NodeId>,
    pub store: S,
    pub builder: B,
    pub root: Option<NodeId>,
    pub block_size: usize,
    pub balance_factor: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S, B> Tree<T, S, B>
where
    S: ContentStore<T>,
    B: CustomBuilder<T>,
{
    pub fn new(config: &BigListConfig, store: S, builder: B) -> Self
    {
        Tree {
            nodes: SlotMap::with_key(),
            chain: LeafChain::new(),
            store,
            builder,
            root: None,
            block_size: config.block_size,
            balance_factor: config.balance_factor,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize
    {
        self.root
            .and_then(|root| self.nodes.get(root))
            .map_or(0, |node| node.count())
    }

    pub fn depth(&self) -> usize
    {
        self.root
            .and_then(|root| self.nodes.get(root))
            .map_or(0, |node| node.depth())
    }

    pub fn node(&self, id: NodeId) -> Result<&Node<B::Aggregate>>
    {
        self.nodes.get(id).ok_or(BigListError::InvalidState("dangling node handle"))
    }

    pub fn count(&self, id: NodeId) -> Result<usize>
    {
        Ok(self.node(id)?.count())
    }

    pub fn leaf(&self, id: NodeId) -> Result<&LeafNode<B::Aggregate>>
    {
        match self.node(id)? {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Concat(_) => Err(BigListError::InvalidState("expected a leaf node")),
        }
    }

    pub fn children(&self, id: NodeId) -> Result<Option<(NodeId, NodeId)>>
    {
        Ok(match self.node(id)? {
            Node::Leaf(_) => None,
            Node::Concat(concat) => Some((concat.left, concat.right)),
        })
    }

    // Leaf content

    /// Pin a leaf's block, run `f` on it, then tell the builder what changed.
    /// `f` returns its result with the first touched index and the count
    /// delta.
    pub fn update_leaf<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut FixedList<T>) -> Result<(R, usize, isize)>,
    ) -> Result<R>
    {
        let container = self.leaf(id)?.container;
        let mut pinned = self.store.get(container)?;
        let (result, start, delta) = f(&mut *pinned)?;
        let count = pinned.len();

        match self.nodes.get_mut(id) {
            Some(Node::Leaf(leaf)) => {
                self.builder
                    .notify_update(&mut leaf.aggregate, pinned.as_mut_slice(), start, delta);
                leaf.count = count;
            }
            _ => return Err(BigListError::InvalidState("expected a leaf node")),
        }

        pinned.release()?;
        Ok(result)
    }

    pub fn read_leaf<R>(&mut self, id: NodeId, f: impl FnOnce(&FixedList<T>) -> R) -> Result<R>
    {
        let container = self.leaf(id)?.container;
        let pinned = self.store.get(container)?;
        let result = f(&*pinned);
        pinned.release()?;
        Ok(result)
    }

    /// Move a leaf's whole block out, leaving it empty
    fn take_leaf(&mut self, id: NodeId) -> Result<FixedList<T>>
    {
        let container = self.leaf(id)?.container;
        let mut pinned = self.store.get(container)?;
        let taken = mem::take(&mut *pinned);
        pinned.release()?;
        Ok(taken)
    }

    // Node construction

    pub fn create_leaf(&mut self, items: Vec<T>) -> Result<NodeId>
    {
        let mut block = self.builder.create_block(items.len(), self.block_size);
        block.add_range(items)?;
        self.leaf_from_block(block)
    }

    fn leaf_from_block(&mut self, mut block: FixedList<T>) -> Result<NodeId>
    {
        let count = block.len();
        let mut aggregate = B::Aggregate::default();
        self.builder
            .notify_update(&mut aggregate, block.as_mut_slice(), 0, count as isize);
        let container = self.store.create_container(block)?;
        Ok(self.nodes.insert(Node::Leaf(LeafNode {
            container,
            count,
            aggregate,
        })))
    }

    fn concat_of(&self, left: NodeId, right: NodeId) -> Result<ConcatNode<B::Aggregate>>
    {
        let l = self.node(left)?;
        let r = self.node(right)?;
        Ok(ConcatNode {
            left,
            right,
            count: l.count() + r.count(),
            depth: 1 + l.depth().max(r.depth()),
            aggregate: self.builder.concat_aggregate(l.aggregate(), r.aggregate()),
        })
    }

    pub fn new_concat(&mut self, left: NodeId, right: NodeId) -> Result<NodeId>
    {
        let concat = self.concat_of(left, right)?;
        Ok(self.nodes.insert(Node::Concat(concat)))
    }

    /// Point the concat `id` at new children, recomputing what derives
    /// from them
    fn new_node_in_place(&mut self, id: NodeId, left: NodeId, right: NodeId) -> Result<NodeId>
    {
        let concat = self.concat_of(left, right)?;
        match self.nodes.get_mut(id) {
            Some(node @ Node::Concat(_)) => {
                *node = Node::Concat(concat);
                Ok(id)
            }
            _ => Err(BigListError::InvalidState("expected a concat node")),
        }
    }

    /// Unlink a leaf and give its container back to the store
    fn free_leaf(&mut self, id: NodeId) -> Result<()>
    {
        let container = self.leaf(id)?.container;
        self.chain.remove(id)?;
        self.store.remove(container)?;
        self.nodes.remove(id);
        Ok(())
    }

    /// Link freshly built leaves right after `after`, in order
    fn link_after(&mut self, after: NodeId, leaves: &[NodeId]) -> Result<()>
    {
        let mut prev = after;
        for leaf in leaves {
            self.chain.add_next(prev, *leaf)?;
            prev = *leaf;
        }
        Ok(())
    }

    /// Chunk `items` into leaves and join them pairwise. The leaves are
    /// returned unlinked, in order.
    pub fn build_subtree(&mut self, items: Vec<T>) -> Result<(NodeId, Vec<NodeId>)>
    {
        let mut leaves = Vec::with_capacity(items.len().div_ceil(self.block_size));
        let mut items = items.into_iter();
        loop {
            let chunk: Vec<T> = items.by_ref().take(self.block_size).collect();
            if chunk.is_empty() {
                break;
            }
            leaves.push(self.create_leaf(chunk)?);
        }

        let mut level = leaves.clone();
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                match *pair {
                    [left, right] => next.push(self.new_concat(left, right)?),
                    [single] => next.push(single),
                    _ => {}
                }
            }
            level = next;
        }

        let root = level
            .first()
            .copied()
            .ok_or(BigListError::InvalidState("subtree built from no items"))?;
        Ok((root, leaves))
    }

    // Mutating walks

    pub fn append(&mut self, id: NodeId, item: T) -> Result<NodeId>
    {
        if let Some((left, right)) = self.children(id)? {
            let right = self.append(right, item)?;
            return self.new_node_in_place(id, left, right);
        }

        if self.count(id)? < self.block_size {
            self.update_leaf(id, |block| {
                let at = block.len();
                block.add(item)?;
                Ok(((), at, 1))
            })?;
            return Ok(id);
        }

        let leaf = self.create_leaf(vec![item])?;
        self.chain.add_next(id, leaf)?;
        self.new_concat(id, leaf)
    }

    pub fn prepend(&mut self, id: NodeId, item: T) -> Result<NodeId>
    {
        if let Some((left, right)) = self.children(id)? {
            let left = self.prepend(left, item)?;
            return self.new_node_in_place(id, left, right);
        }

        if self.count(id)? < self.block_size {
            self.update_leaf(id, |block| {
                block.insert(0, item)?;
                Ok(((), 0, 1))
            })?;
            return Ok(id);
        }

        let leaf = self.create_leaf(vec![item])?;
        self.chain.add_before(id, leaf)?;
        self.new_concat(leaf, id)
    }

    pub fn insert(&mut self, id: NodeId, index: usize, item: T) -> Result<NodeId>
    {
        if let Some((left, right)) = self.children(id)? {
            let left_count = self.count(left)?;
            return if index <= left_count {
                let left = self.insert(left, index, item)?;
                self.new_node_in_place(id, left, right)
            } else {
                let right = self.insert(right, index - left_count, item)?;
                self.new_node_in_place(id, left, right)
            };
        }

        let count = self.count(id)?;
        if count < self.block_size {
            self.update_leaf(id, |block| {
                block.insert(index, item)?;
                Ok(((), index, 1))
            })?;
            Ok(id)
        } else if index == count {
            let leaf = self.create_leaf(vec![item])?;
            self.chain.add_next(id, leaf)?;
            self.new_concat(id, leaf)
        } else if index == 0 {
            let leaf = self.create_leaf(vec![item])?;
            self.chain.add_before(id, leaf)?;
            self.new_concat(leaf, id)
        } else {
            self.split_leaf(id, index, item)
        }
    }

    /// Split a full leaf at `index`, `item` closing the left half
    fn split_leaf(&mut self, id: NodeId, index: usize, item: T) -> Result<NodeId>
    {
        let container = self.leaf(id)?.container;
        let mut left = self.take_leaf(id)?;
        let right = left.split_off(index)?;
        left.add(item)?;

        // Left half keeps the cache and disk identity of the old block
        let count = left.len();
        let mut aggregate = B::Aggregate::default();
        self.builder
            .notify_update(&mut aggregate, left.as_mut_slice(), 0, count as isize);
        let container = self.store.clone_container(container, left)?;
        let left = self.nodes.insert(Node::Leaf(LeafNode {
            container,
            count,
            aggregate,
        }));
        self.chain.replace(id, left)?;
        self.nodes.remove(id);

        let right = self.leaf_from_block(right)?;
        self.chain.add_next(left, right)?;
        log::debug!("Split full leaf at {}", index);
        self.new_concat(left, right)
    }

    pub fn insert_range(&mut self, id: NodeId, index: usize, items: Vec<T>) -> Result<NodeId>
    {
        if let Some((left, right)) = self.children(id)? {
            let left_count = self.count(left)?;
            return if index <= left_count {
                let left = self.insert_range(left, index, items)?;
                self.new_node_in_place(id, left, right)
            } else {
                let right = self.insert_range(right, index - left_count, items)?;
                self.new_node_in_place(id, left, right)
            };
        }

        let count = self.count(id)?;
        let added = items.len();
        if count + added <= self.block_size {
            self.update_leaf(id, |block| {
                block.insert_range(index, items)?;
                Ok(((), index, added as isize))
            })?;
            return Ok(id);
        }

        let (sub, leaves) = self.build_subtree(items)?;
        if index == 0 {
            for leaf in &leaves {
                self.chain.add_before(id, *leaf)?;
            }
            return self.new_concat(sub, id);
        }
        if index == count {
            self.link_after(id, &leaves)?;
            return self.new_concat(id, sub);
        }

        let tail = self.update_leaf(id, |block| {
            let len = block.len();
            let tail = block.split_off(index)?;
            Ok((tail, index, index as isize - len as isize))
        })?;
        let right = self.leaf_from_block(tail)?;
        self.chain.add_next(id, right)?;
        self.link_after(id, &leaves)?;
        let left = self.new_concat(id, sub)?;
        self.new_concat(left, right)
    }

    pub fn set(&mut self, id: NodeId, index: usize, item: T) -> Result<T>
    {
        if let Some((left, right)) = self.children(id)? {
            let left_count = self.count(left)?;
            let old = if index < left_count {
                self.set(left, index, item)?
            } else {
                self.set(right, index - left_count, item)?
            };
            self.new_node_in_place(id, left, right)?;
            return Ok(old);
        }

        self.update_leaf(id, |block| Ok((block.set(index, item)?, index, 0)))
    }

    /// Remove the items `first..=last`, both relative to `id`
    pub fn remove_range(&mut self, id: NodeId, first: usize, last: usize) -> Result<Option<NodeId>>
    {
        let Some((left, right)) = self.children(id)? else {
            let count = self.count(id)?;
            if first == 0 && last + 1 >= count {
                self.free_leaf(id)?;
                return Ok(None);
            }
            let removed = last - first + 1;
            self.update_leaf(id, |block| {
                block.remove_range(first, removed)?;
                Ok(((), first, -(removed as isize)))
            })?;
            return Ok(Some(id));
        };

        let left_count = self.count(left)?;
        let new_left = if first < left_count {
            self.remove_range(left, first, last.min(left_count - 1))?
        } else {
            Some(left)
        };
        let new_right = if last >= left_count {
            self.remove_range(right, first.saturating_sub(left_count), last - left_count)?
        } else {
            Some(right)
        };

        match (new_left, new_right) {
            (Some(left), Some(right)) => Ok(Some(self.new_node_in_place(id, left, right)?)),
            (Some(only), None) | (None, Some(only)) => {
                self.nodes.remove(id);
                Ok(Some(only))
            }
            (None, None) => {
                self.nodes.remove(id);
                Ok(None)
            }
        }
    }

    /// Drop every node and container
    pub fn clear(&mut self) -> Result<()>
    {
        let leaves: Vec<NodeId> = self.chain.iter().collect();
        for leaf in leaves {
            let container = self.leaf(leaf)?.container;
            self.store.remove(container)?;
        }
        self.nodes.clear();
        self.chain.clear();
        self.root = None;
        Ok(())
    }

    // Lookups

    /// Leaf holding `index` and the absolute index of its first item
    pub fn locate(&self, mut index: usize) -> Result<(NodeId, usize)>
    {
        let mut id = self.root.ok_or(BigListError::index(index, 0))?;
        let mut start = 0;
        loop {
            match self.node(id)? {
                Node::Leaf(_) => return Ok((id, start)),
                Node::Concat(concat) => {
                    let left_count = self.count(concat.left)?;
                    if index < left_count {
                        id = concat.left;
                    } else {
                        index -= left_count;
                        start += left_count;
                        id = concat.right;
                    }
                }
            }
        }
    }

    /// Like [`Tree::locate`], also combining the aggregates of every leaf
    /// left of the one found
    pub fn locate_with_prefix(&self, mut index: usize) -> Result<(NodeId, usize, B::Aggregate)>
    {
        let mut id = self.root.ok_or(BigListError::index(index, 0))?;
        let mut start = 0;
        let mut prefix = B::Aggregate::default();
        loop {
            match self.node(id)? {
                Node::Leaf(_) => return Ok((id, start, prefix)),
                Node::Concat(concat) => {
                    let left = self.node(concat.left)?;
                    if index < left.count() {
                        id = concat.left;
                    } else {
                        index -= left.count();
                        start += left.count();
                        prefix = self.builder.concat_aggregate(&prefix, left.aggregate());
                        id = concat.right;
                    }
                }
            }
        }
    }

    /// Descend by an additive metric over aggregates. Returns the leaf,
    /// its first absolute index and what is left of `target` inside it.
    pub fn seek<M>(&self, mut target: u64, metric: M) -> Result<Option<(NodeId, usize, u64)>>
    where
        M: Fn(&B::Aggregate) -> u64,
    {
        let Some(mut id) = self.root else {
            return Ok(None);
        };
        if target >= metric(self.node(id)?.aggregate()) {
            return Ok(None);
        }

        let mut start = 0;
        loop {
            match self.node(id)? {
                Node::Leaf(_) => return Ok(Some((id, start, target))),
                Node::Concat(concat) => {
                    let left = self.node(concat.left)?;
                    let measure = metric(left.aggregate());
                    if target < measure {
                        id = concat.left;
                    } else {
                        target -= measure;
                        start += left.count();
                        id = concat.right;
                    }
                }
            }
        }
    }

    // Balance

    /// Rebalance when the root is deeper than its item count allows
    pub fn check_balance(&mut self) -> Result<()>
    {
        let Some(root) = self.root else {
            return Ok(());
        };
        let node = self.node(root)?;
        let (depth, count) = (node.depth(), node.count());
        let slack = self.balance_factor;

        if depth > slack && !(depth - slack <= MAX_FIB && count >= FIBONACCI[depth - slack]) {
            self.rebalance()?;
        }
        Ok(())
    }

    pub fn rebalance(&mut self) -> Result<()>
    {
        let Some(root) = self.root else {
            return Ok(());
        };
        let node = self.node(root)?;
        let (depth, count) = (node.depth(), node.count());
        if depth <= 1 || (depth - 2 <= MAX_FIB && count >= FIBONACCI[depth - 2]) {
            return Ok(());
        }

        let mut slots: Slots = [None; MAX_FIB + 1];
        self.add_node_to_rebalance_array(&mut slots, root)?;

        let mut result = None;
        for slot in slots.iter_mut() {
            if let Some(node) = slot.take() {
                result = Some(match result {
                    None => node,
                    Some(acc) => self.prepend_node(acc, node)?,
                });
            }
        }
        self.root = result;

        log::debug!("Rebalanced {} items from depth {} to {}", count, depth, self.depth());
        Ok(())
    }

    fn add_node_to_rebalance_array(&mut self, slots: &mut Slots, id: NodeId) -> Result<()>
    {
        if self.node(id)?.is_balanced() {
            return self.add_balanced_node(slots, id);
        }
        match self.children(id)? {
            Some((left, right)) => {
                self.nodes.remove(id);
                self.add_node_to_rebalance_array(slots, left)?;
                self.add_node_to_rebalance_array(slots, right)
            }
            None => self.add_balanced_node(slots, id),
        }
    }

    fn add_balanced_node(&mut self, slots: &mut Slots, mut balanced: NodeId) -> Result<()>
    {
        let count = self.count(balanced)?;
        let mut slot = 0;
        let mut accum = None;
        while count >= FIBONACCI[slot + 1] {
            if let Some(node) = slots[slot].take() {
                accum = Some(match accum {
                    None => node,
                    Some(acc) => self.prepend_node(acc, node)?,
                });
            }
            slot += 1;
        }

        if let Some(acc) = accum {
            balanced = self.prepend_node(balanced, acc)?;
        }

        loop {
            if let Some(node) = slots[slot].take() {
                balanced = self.prepend_node(balanced, node)?;
            }
            if self.count(balanced)? < FIBONACCI[slot + 1] {
                slots[slot] = Some(balanced);
                return Ok(());
            }
            slot += 1;
        }
    }

    /// Put `other`, which ends right where `id` starts, in front of `id`.
    /// Small neighbouring leaves are merged instead of concatenated.
    fn prepend_node(&mut self, id: NodeId, other: NodeId) -> Result<NodeId>
    {
        let other_node = self.node(other)?;
        if other_node.is_leaf() {
            let other_count = other_node.count();
            match self.children(id)? {
                None if self.count(id)? + other_count <= self.block_size => {
                    self.merge_leaves(other, id)?;
                    return Ok(id);
                }
                Some((left, right)) if self.node(left)?.is_leaf() && self.count(left)? + other_count <= self.block_size => {
                    let left = self.prepend_node(left, other)?;
                    return self.new_node_in_place(id, left, right);
                }
                _ => {}
            }
        }
        self.new_concat(other, id)
    }

    /// Move the items of leaf `from` to the front of the next leaf `into`
    fn merge_leaves(&mut self, from: NodeId, into: NodeId) -> Result<()>
    {
        let items = self.take_leaf(from)?.into_vec();
        self.free_leaf(from)?;
        let added = items.len();
        self.update_leaf(into, |block| {
            block.insert_range(0, items)?;
            Ok(((), 0, added as isize))
        })
    }
}
