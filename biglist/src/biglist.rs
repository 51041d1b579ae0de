use crate::{
    builder::{CustomBuilder, NoAggregate},
    config::{BigListConfig, Profile},
    error::{BigListError, Result},
    node::NodeId,
    store::{BincodeSerializer, ContentStore, DiskStore, MemoryStore, Serializer},
    tree::Tree,
};

/// Most items a list may hold
pub const MAX_ITEMS: usize = i32::MAX as usize - 1;

/// Last leaf found by index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Memo
{
    leaf: NodeId,
    start: usize,
    count: usize,
}

impl Memo
{
    fn covers(&self, index: usize) -> bool
    {
        index >= self.start && index < self.start + self.count
    }
}

/// Where a [`BigList::seek`] landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seek
{
    /// Absolute index of the first item in the leaf
    pub leaf_start: usize,
    /// Items in the leaf
    pub leaf_count: usize,
    /// Part of the target left inside the leaf
    pub residual: u64,
}

/// A sequence of `T` stored as a rope of fixed size blocks.
///
/// `S` decides where the blocks live and `B` which statistics are kept per
/// subtree. Every access may need to load a block, so even reads take
/// `&mut self` and return `Result`.
///
/// ```
/// use libbiglist::prelude::*;
///
/// let mut list = BigList::with_config(BigListConfig::default().with_block_size(4)).unwrap();
/// list.add_range(0..10).unwrap();
/// list.insert(3, 99).unwrap();
/// assert_eq!(list.get(3).unwrap(), 99);
/// assert_eq!(list.len(), 11);
/// ```
pub struct BigList<T, S = MemoryStore<T>, B = NoAggregate>
where
    B: CustomBuilder<T>,
{
    tree: Tree<T, S, B>,
    memo: Option<Memo>,
}

impl<T: Clone> BigList<T>
{
    pub fn new() -> Self
    {
        BigList {
            tree: Tree::new(&BigListConfig::default(), MemoryStore::new(), NoAggregate),
            memo: None,
        }
    }

    pub fn with_config(config: BigListConfig) -> Result<Self>
    {
        Self::with_store(config, MemoryStore::new(), NoAggregate)
    }
}

impl<T: Clone> Default for BigList<T>
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl<T: Clone> BigList<T, DiskStore<T>>
where
    BincodeSerializer: Serializer<T>,
{
    /// List with blocks paged to a temporary file
    pub fn on_disk(profile: &Profile) -> Result<Self>
    {
        profile.validate()?;
        let store = DiskStore::new(&profile.store)?;
        Self::with_store(profile.list.clone(), store, NoAggregate)
    }
}

impl<T, S, B> BigList<T, S, B>
where
    T: Clone,
    S: ContentStore<T>,
    B: CustomBuilder<T>,
{
    pub fn with_store(config: BigListConfig, store: S, builder: B) -> Result<Self>
    {
        config.validate()?;
        Ok(BigList {
            tree: Tree::new(&config, store, builder),
            memo: None,
        })
    }

    pub fn len(&self) -> usize
    {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.tree.root.is_none()
    }

    pub fn depth(&self) -> usize
    {
        self.tree.depth()
    }

    pub fn config(&self) -> BigListConfig
    {
        BigListConfig {
            block_size: self.tree.block_size,
            balance_factor: self.tree.balance_factor,
        }
    }

    pub fn store(&self) -> &S
    {
        &self.tree.store
    }

    pub fn builder(&self) -> &B
    {
        &self.tree.builder
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize
    {
        self.tree.chain.len()
    }

    /// Aggregate of the whole list
    pub fn root_aggregate(&self) -> B::Aggregate
    {
        self.tree
            .root
            .and_then(|root| self.tree.nodes.get(root))
            .map(|node| node.aggregate().clone())
            .unwrap_or_default()
    }

    fn reserve(&self, additional: usize) -> Result<()>
    {
        let requested = self.len().saturating_add(additional);
        if requested > MAX_ITEMS {
            return Err(BigListError::capacity(requested, MAX_ITEMS));
        }
        Ok(())
    }

    fn check_index(&self, index: usize, len: usize) -> Result<()>
    {
        if index >= len {
            return Err(BigListError::index(index, len));
        }
        Ok(())
    }

    /// Structural change done; drop the memo and restore the depth bound
    fn settle(&mut self, root: Option<NodeId>) -> Result<()>
    {
        self.memo = None;
        self.tree.root = root;
        self.tree.check_balance()
    }

    fn first_leaf(&mut self, items: Vec<T>) -> Result<NodeId>
    {
        let (root, leaves) = self.tree.build_subtree(items)?;
        for leaf in leaves {
            self.tree.chain.add_last(leaf)?;
        }
        Ok(root)
    }

    pub fn add(&mut self, item: T) -> Result<()>
    {
        self.reserve(1)?;
        let root = match self.tree.root {
            Some(root) => self.tree.append(root, item)?,
            None => self.first_leaf(vec![item])?,
        };
        self.settle(Some(root))
    }

    pub fn prepend(&mut self, item: T) -> Result<()>
    {
        self.reserve(1)?;
        let root = match self.tree.root {
            Some(root) => self.tree.prepend(root, item)?,
            None => self.first_leaf(vec![item])?,
        };
        self.settle(Some(root))
    }

    pub fn insert(&mut self, index: usize, item: T) -> Result<()>
    {
        let len = self.len();
        if index > len {
            return Err(BigListError::index(index, len));
        }
        self.reserve(1)?;
        let root = match self.tree.root {
            Some(root) => self.tree.insert(root, index, item)?,
            None => self.first_leaf(vec![item])?,
        };
        self.settle(Some(root))
    }

    pub fn add_range(&mut self, items: impl IntoIterator<Item = T>) -> Result<()>
    {
        self.insert_range(self.len(), items)
    }

    pub fn insert_range(&mut self, index: usize, items: impl IntoIterator<Item = T>) -> Result<()>
    {
        let len = self.len();
        if index > len {
            return Err(BigListError::index(index, len));
        }
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(());
        }
        self.reserve(items.len())?;

        let root = match self.tree.root {
            Some(root) => self.tree.insert_range(root, index, items)?,
            None => self.first_leaf(items)?,
        };
        self.settle(Some(root))
    }

    pub fn remove_at(&mut self, index: usize) -> Result<T>
    {
        let item = self.get(index)?;
        self.remove_range(index, 1)?;
        Ok(item)
    }

    /// Remove `count` items starting at `index`
    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<()>
    {
        let len = self.len();
        let end = index.checked_add(count).ok_or(BigListError::index(index, len))?;
        if end > len {
            return Err(BigListError::index(end, len));
        }
        let Some(root) = self.tree.root else {
            return Ok(());
        };
        if count == 0 {
            return Ok(());
        }

        let root = self.tree.remove_range(root, index, end - 1)?;
        self.settle(root)
    }

    pub fn clear(&mut self) -> Result<()>
    {
        self.memo = None;
        self.tree.clear()
    }

    fn find_leaf(&mut self, index: usize) -> Result<Memo>
    {
        if let Some(memo) = self.memo.filter(|m| m.covers(index)) {
            return Ok(memo);
        }
        let (leaf, start) = self.tree.locate(index)?;
        let memo = Memo {
            leaf,
            start,
            count: self.tree.count(leaf)?,
        };
        self.memo = Some(memo);
        Ok(memo)
    }

    pub fn get(&mut self, index: usize) -> Result<T>
    {
        self.check_index(index, self.len())?;
        let memo = self.find_leaf(index)?;
        self.tree
            .read_leaf(memo.leaf, |block| block.get(index - memo.start).cloned())?
    }

    /// Run `f` over the block holding `index`, with `index`'s offset in it
    pub fn with_leaf_at<R>(&mut self, index: usize, f: impl FnOnce(&[T], usize) -> R) -> Result<R>
    {
        self.check_index(index, self.len())?;
        let memo = self.find_leaf(index)?;
        self.tree
            .read_leaf(memo.leaf, |block| f(block.as_slice(), index - memo.start))
    }

    /// Replace the item at `index`, returning the old one
    pub fn set(&mut self, index: usize, item: T) -> Result<T>
    {
        self.check_index(index, self.len())?;
        let root = self.tree.root.ok_or(BigListError::index(index, 0))?;
        self.tree.set(root, index, item)
    }

    /// The item at `index` and the combined aggregate of all leaves before
    /// the one holding it
    pub fn get_with_prefix(&mut self, index: usize) -> Result<(T, B::Aggregate)>
    {
        self.check_index(index, self.len())?;
        let (leaf, start, prefix) = self.tree.locate_with_prefix(index)?;
        let item = self
            .tree
            .read_leaf(leaf, |block| block.get(index - start).cloned())??;
        Ok((item, prefix))
    }

    /// Find the leaf where an additive `metric` over aggregates reaches
    /// `target`. `None` when `target` lies past the end.
    pub fn seek<M>(&self, target: u64, metric: M) -> Result<Option<Seek>>
    where
        M: Fn(&B::Aggregate) -> u64,
    {
        let Some((leaf, start, residual)) = self.tree.seek(target, metric)? else {
            return Ok(None);
        };
        Ok(Some(Seek {
            leaf_start: start,
            leaf_count: self.tree.count(leaf)?,
            residual,
        }))
    }

    pub fn index_of(&mut self, item: &T) -> Result<Option<usize>>
    where
        T: PartialEq,
    {
        let leaves: Vec<NodeId> = self.tree.chain.iter().collect();
        let mut start = 0;
        for leaf in leaves {
            if let Some(i) = self.tree.read_leaf(leaf, |block| block.index_of(item))? {
                return Ok(Some(start + i));
            }
            start += self.tree.count(leaf)?;
        }
        Ok(None)
    }

    pub fn contains(&mut self, item: &T) -> Result<bool>
    where
        T: PartialEq,
    {
        Ok(self.index_of(item)?.is_some())
    }

    /// Walk the items in order, one leaf resident at a time
    pub fn iter(&mut self) -> Iter<'_, T, S, B>
    {
        let next_leaf = self.tree.chain.first();
        Iter {
            list: self,
            next_leaf,
            buffer: Vec::new().into_iter(),
            failed: false,
        }
    }

    pub fn to_vec(&mut self) -> Result<Vec<T>>
    {
        let mut out = Vec::with_capacity(self.len());
        for item in self.iter() {
            out.push(item?);
        }
        Ok(out)
    }

    /// Force a full rebalance, even if the depth bound still holds
    pub fn rebalance(&mut self) -> Result<()>
    {
        self.memo = None;
        self.tree.rebalance()
    }

    /// Write every dirty block to the store's backing storage
    pub fn commit(&mut self) -> Result<()>
    {
        self.tree.store.commit()
    }

    /// Re-chunk every item into leaves of `block_size`
    pub fn rebuild(&mut self, block_size: usize) -> Result<()>
    {
        let config = self.config().with_block_size(block_size);
        config.validate()?;

        let leaves: Vec<NodeId> = self.tree.chain.iter().collect();
        let stale: Vec<NodeId> = self.tree.nodes.keys().collect();
        let mut blocks = Vec::with_capacity(leaves.len());
        for leaf in &leaves {
            blocks.push(self.tree.leaf(*leaf)?.container);
        }

        self.tree.root = None;
        self.tree.chain.clear();
        self.tree.block_size = block_size;
        self.memo = None;

        for container in blocks {
            let items = {
                let mut pinned = self.tree.store.get(container)?;
                let taken = std::mem::take(&mut *pinned);
                pinned.release()?;
                taken.into_vec()
            };
            self.tree.store.remove(container)?;
            self.add_range(items)?;
        }

        for id in stale {
            self.tree.nodes.remove(id);
        }
        log::debug!("Rebuilt {} items into blocks of {}", self.len(), block_size);
        Ok(())
    }
}

pub struct Iter<'a, T, S, B>
where
    B: CustomBuilder<T>,
{
    list: &'a mut BigList<T, S, B>,
    next_leaf: Option<NodeId>,
    buffer: std::vec::IntoIter<T>,
    failed: bool,
}

impl<T, S, B> Iterator for Iter<'_, T, S, B>
where
    T: Clone,
    S: ContentStore<T>,
    B: CustomBuilder<T>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>>
    {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }
            if self.failed {
                return None;
            }
            let leaf = self.next_leaf?;
            self.next_leaf = self.list.tree.chain.next(leaf);
            match self.list.tree.read_leaf(leaf, |block| block.as_slice().to_vec()) {
                Ok(items) => self.buffer = items.into_iter(),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use rand::prelude::*;

    use super::*;
    use crate::{
        block::FixedList,
        cache::CachePolicy,
        config::StoreConfig,
        node::{Node, FIBONACCI, MAX_FIB},
    };

    fn init()
    {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn small(block_size: usize) -> BigList<u32>
    {
        BigList::with_config(BigListConfig::default().with_block_size(block_size)).unwrap()
    }

    /// Walk the tree and the chain, checking every structural invariant
    fn check<S, B>(list: &mut BigList<u32, S, B>)
    where
        S: ContentStore<u32>,
        B: CustomBuilder<u32>,
    {
        let tree = &list.tree;
        let mut in_order = Vec::new();
        if let Some(root) = tree.root {
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                match tree.node(id).unwrap() {
                    Node::Leaf(leaf) => {
                        assert!(leaf.count > 0, "empty leaf left in the tree");
                        assert!(leaf.count <= tree.block_size);
                        in_order.push(id);
                    }
                    Node::Concat(concat) => {
                        let (l, r) = (tree.node(concat.left).unwrap(), tree.node(concat.right).unwrap());
                        assert_eq!(concat.count, l.count() + r.count());
                        assert_eq!(concat.depth, 1 + l.depth().max(r.depth()));
                        stack.push(concat.right);
                        stack.push(concat.left);
                    }
                }
            }
        }

        let forward: Vec<NodeId> = tree.chain.iter().collect();
        assert_eq!(forward, in_order);
        let mut backward: Vec<NodeId> = tree.chain.iter().rev().collect();
        backward.reverse();
        assert_eq!(backward, in_order);

        // Every node in the arena is reachable, every container is live
        let reachable = in_order.len() + in_order.len().saturating_sub(1);
        assert_eq!(tree.nodes.len(), reachable);
        assert_eq!(tree.store.len(), in_order.len());

        let mut total = 0;
        for leaf in in_order {
            let count = list.tree.count(leaf).unwrap();
            let block_len = list.tree.read_leaf(leaf, |b| b.len()).unwrap();
            assert_eq!(count, block_len);
            total += count;
        }
        assert_eq!(total, list.len());
    }

    fn assert_balanced<S, B>(list: &BigList<u32, S, B>)
    where
        S: ContentStore<u32>,
        B: CustomBuilder<u32>,
    {
        let depth = list.depth();
        let slack = list.config().balance_factor;
        if depth > slack {
            assert!(depth - slack <= MAX_FIB);
            assert!(list.len() >= FIBONACCI[depth - slack], "depth {} for {} items", depth, list.len());
        }
    }

    #[test]
    fn test_sequential_appends_stay_balanced()
    {
        init();
        let mut list = small(2);
        for i in 0..5000 {
            list.add(i).unwrap();
            assert_balanced(&list);
        }
        check(&mut list);
        assert_eq!(list.len(), 5000);
        // log2(2500 leaves) is about 11
        assert!(list.depth() < 24, "depth {}", list.depth());
        assert_eq!(list.to_vec().unwrap(), (0..5000).collect::<Vec<_>>());
    }

    #[test]
    fn test_prepends_stay_balanced()
    {
        let mut list = small(3);
        for i in 0..3000 {
            list.prepend(i).unwrap();
        }
        assert_balanced(&list);
        check(&mut list);
        assert_eq!(list.get(0).unwrap(), 2999);
        assert_eq!(list.get(2999).unwrap(), 0);
    }

    #[test]
    fn test_index_errors()
    {
        let mut list = small(4);
        assert!(matches!(list.get(0), Err(BigListError::IndexOutOfRange { index: 0, len: 0 })));
        assert!(list.insert(1, 5).is_err());
        list.add_range(0..10).unwrap();
        assert!(list.get(10).is_err());
        assert!(list.set(10, 0).is_err());
        assert!(list.remove_range(8, 3).is_err());
        assert!(list.remove_range(usize::MAX, 2).is_err());
        assert!(list.insert_range(11, vec![1]).is_err());
        assert_eq!(list.len(), 10);

        // Empty ranges are no-ops
        list.remove_range(10, 0).unwrap();
        list.insert_range(3, Vec::new()).unwrap();
        assert_eq!(list.len(), 10);
    }

    #[test]
    fn test_memo_follows_sequential_reads()
    {
        let mut list = small(8);
        list.add_range(0..64).unwrap();
        assert!(list.memo.is_none());

        assert_eq!(list.get(17).unwrap(), 17);
        let memo = list.memo.unwrap();
        assert_eq!((memo.start, memo.count), (16, 8));

        assert_eq!(list.get(18).unwrap(), 18);
        assert_eq!(list.memo, Some(memo));

        assert_eq!(list.get(40).unwrap(), 40);
        assert_eq!(list.memo.unwrap().start, 40);

        // Structural changes forget the memo, item replacement does not
        list.set(41, 1000).unwrap();
        assert!(list.memo.is_some());
        list.insert(0, 7).unwrap();
        assert!(list.memo.is_none());
        assert_eq!(list.get(42).unwrap(), 1000);
    }

    #[test]
    fn test_randomised_against_vec()
    {
        init();
        let mut rng = StdRng::seed_from_u64(0x5eed_b16);
        for block_size in [2, 3, 7, 64] {
            let mut list = small(block_size);
            let mut reference: Vec<u32> = Vec::new();
            let mut next = 0u32;

            for step in 0..2000 {
                match rng.gen_range(0..10) {
                    0..=2 => {
                        list.add(next).unwrap();
                        reference.push(next);
                        next += 1;
                    }
                    3 => {
                        list.prepend(next).unwrap();
                        reference.insert(0, next);
                        next += 1;
                    }
                    4..=5 => {
                        let index = rng.gen_range(0..=reference.len());
                        list.insert(index, next).unwrap();
                        reference.insert(index, next);
                        next += 1;
                    }
                    6 => {
                        let index = rng.gen_range(0..=reference.len());
                        let n = rng.gen_range(0..3 * block_size as u32);
                        let items: Vec<u32> = (next..next + n).collect();
                        next += n;
                        list.insert_range(index, items.clone()).unwrap();
                        reference.splice(index..index, items);
                    }
                    7..=8 if !reference.is_empty() => {
                        let index = rng.gen_range(0..reference.len());
                        let n = rng.gen_range(1..=(reference.len() - index).min(2 * block_size));
                        list.remove_range(index, n).unwrap();
                        reference.drain(index..index + n);
                    }
                    9 if !reference.is_empty() => {
                        let index = rng.gen_range(0..reference.len());
                        assert_eq!(list.set(index, next).unwrap(), reference[index]);
                        reference[index] = next;
                        next += 1;
                    }
                    _ => {}
                }

                assert_eq!(list.len(), reference.len());
                assert_balanced(&list);
                if step % 97 == 0 {
                    check(&mut list);
                    for (i, expected) in reference.iter().enumerate() {
                        assert_eq!(list.get(i).unwrap(), *expected);
                    }
                }
            }

            check(&mut list);
            assert_eq!(list.to_vec().unwrap(), reference);
            list.rebalance().unwrap();
            check(&mut list);
            assert_eq!(list.to_vec().unwrap(), reference);
        }
    }

    #[test]
    fn test_remove_at_and_clear()
    {
        let mut list = small(4);
        list.add_range(0..20).unwrap();
        assert_eq!(list.remove_at(5).unwrap(), 5);
        assert_eq!(list.remove_at(0).unwrap(), 0);
        assert_eq!(list.len(), 18);
        check(&mut list);

        list.remove_range(0, 18).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.depth(), 0);
        check(&mut list);

        list.add_range(0..9).unwrap();
        list.clear().unwrap();
        assert!(list.is_empty());
        assert_eq!(list.leaf_count(), 0);
        assert!(list.store().is_empty());
        list.add(1).unwrap();
        assert_eq!(list.to_vec().unwrap(), vec![1]);
    }

    #[test]
    fn test_index_of_and_contains()
    {
        let mut list = small(3);
        list.add_range([5, 6, 7, 8, 9, 6]).unwrap();
        assert_eq!(list.index_of(&6).unwrap(), Some(1));
        assert_eq!(list.index_of(&9).unwrap(), Some(4));
        assert!(list.contains(&8).unwrap());
        assert!(!list.contains(&42).unwrap());
    }

    #[test]
    fn test_capacity_limit()
    {
        let mut list = small(4);
        list.add(1).unwrap();
        match list.reserve(MAX_ITEMS) {
            Err(BigListError::CapacityExceeded { requested, capacity }) => {
                assert_eq!(requested, MAX_ITEMS + 1);
                assert_eq!(capacity, MAX_ITEMS);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_rebuild_rechunks()
    {
        let mut list = small(4);
        list.add_range(0..100).unwrap();
        let leaves = list.leaf_count();

        list.rebuild(16).unwrap();
        assert_eq!(list.config().block_size, 16);
        assert!(list.leaf_count() < leaves);
        check(&mut list);
        assert_eq!(list.to_vec().unwrap(), (0..100).collect::<Vec<_>>());

        list.rebuild(2).unwrap();
        check(&mut list);
        assert_eq!(list.leaf_count(), 50);
        assert_eq!(list.to_vec().unwrap(), (0..100).collect::<Vec<_>>());

        assert!(list.rebuild(1).is_err());
    }

    #[test]
    fn test_invalid_config()
    {
        assert!(BigList::<u8>::with_config(BigListConfig::default().with_block_size(1)).is_err());
        assert!(BigList::<u8>::with_config(BigListConfig::default().with_balance_factor(2)).is_err());
    }

    #[test]
    fn test_disk_backed_list()
    {
        init();
        let dir = tempfile::tempdir().unwrap();
        let profile = Profile {
            list: BigListConfig::default().with_block_size(16),
            store: StoreConfig::default()
                .with_cache_limit(4)
                .with_page_size(256)
                .with_policy(CachePolicy::TwoQueue)
                .with_directory(dir.path()),
        };
        let mut list: BigList<u32, DiskStore<u32>> = BigList::on_disk(&profile).unwrap();
        let mut reference = Vec::new();
        let mut rng = StdRng::seed_from_u64(7);

        for i in 0..2000 {
            let index = rng.gen_range(0..=reference.len());
            list.insert(index, i).unwrap();
            reference.insert(index, i);
        }
        list.remove_range(100, 300).unwrap();
        reference.drain(100..400);

        check(&mut list);
        assert!(list.store().stats().resident <= 4);
        assert_eq!(list.to_vec().unwrap(), reference);

        list.commit().unwrap();
        let stats = list.store().stats();
        assert_eq!(stats.resident, 0);
        assert_eq!(stats.containers, list.leaf_count());
        for i in (0..reference.len()).step_by(37) {
            assert_eq!(list.get(i).unwrap(), reference[i]);
        }
    }

    #[test]
    fn test_custom_block_factory()
    {
        struct Counting;

        impl CustomBuilder<u32> for Counting
        {
            type Aggregate = u64;

            fn create_block(&self, _init: usize, max: usize) -> FixedList<u32>
            {
                FixedList::with_capacity(max, max)
            }

            fn leaf_aggregate(&self, items: &[u32]) -> u64
            {
                items.iter().map(|&x| x as u64).sum()
            }

            fn concat_aggregate(&self, left: &u64, right: &u64) -> u64
            {
                left + right
            }
        }

        let mut list = BigList::with_store(
            BigListConfig::default().with_block_size(5),
            MemoryStore::new(),
            Counting,
        )
        .unwrap();
        list.add_range(1..=100).unwrap();
        assert_eq!(list.root_aggregate(), 5050);
        list.remove_range(0, 10).unwrap();
        assert_eq!(list.root_aggregate(), 5050 - 55);
        list.set(0, 0).unwrap();
        assert_eq!(list.root_aggregate(), 5050 - 55 - 11);

        let (item, prefix) = list.get_with_prefix(7).unwrap();
        assert_eq!(item, 18);
        assert_eq!(prefix, 12 + 13 + 14 + 15);
        check(&mut list);
    }
}
