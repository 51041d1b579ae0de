//! Doubly linked chain threading the leaves in document order.
//!
//! Links are kept beside the node arena, keyed by node handle, so the chain
//! never owns a node. Every operation is O(1).

use slotmap::{Key, SecondaryMap};

use crate::error::{BigListError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link<K>
{
    prev: Option<K>,
    next: Option<K>,
}

#[derive(Debug)]
pub struct LeafChain<K: Key>
{
    links: SecondaryMap<K, Link<K>>,
    head: Option<K>,
    tail: Option<K>,
}

impl<K: Key> Default for LeafChain<K>
{
    fn default() -> Self
    {
        LeafChain {
            links: SecondaryMap::new(),
            head: None,
            tail: None,
        }
    }
}

impl<K: Key> LeafChain<K>
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn len(&self) -> usize
    {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.links.is_empty()
    }

    pub fn first(&self) -> Option<K>
    {
        self.head
    }

    pub fn last(&self) -> Option<K>
    {
        self.tail
    }

    pub fn contains(&self, node: K) -> bool
    {
        self.links.contains_key(node)
    }

    pub fn next(&self, node: K) -> Option<K>
    {
        self.links.get(node).and_then(|l| l.next)
    }

    pub fn prev(&self, node: K) -> Option<K>
    {
        self.links.get(node).and_then(|l| l.prev)
    }

    fn ensure_unlinked(&self, node: K) -> Result<()>
    {
        if self.links.contains_key(node) {
            return Err(BigListError::AlreadyLinked);
        }
        Ok(())
    }

    fn link(&self, node: K) -> Result<Link<K>>
    {
        self.links
            .get(node)
            .copied()
            .ok_or(BigListError::InvalidState("leaf is not linked into the chain"))
    }

    fn set_next(&mut self, node: Option<K>, next: Option<K>)
    {
        match node {
            Some(node) => {
                if let Some(link) = self.links.get_mut(node) {
                    link.next = next;
                }
            }
            None => self.head = next,
        }
    }

    fn set_prev(&mut self, node: Option<K>, prev: Option<K>)
    {
        match node {
            Some(node) => {
                if let Some(link) = self.links.get_mut(node) {
                    link.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    pub fn add_last(&mut self, node: K) -> Result<()>
    {
        self.ensure_unlinked(node)?;
        let prev = self.tail;
        self.links.insert(node, Link { prev, next: None });
        self.set_next(prev, Some(node));
        self.tail = Some(node);
        Ok(())
    }

    pub fn add_first(&mut self, node: K) -> Result<()>
    {
        self.ensure_unlinked(node)?;
        let next = self.head;
        self.links.insert(node, Link { prev: None, next });
        self.set_prev(next, Some(node));
        self.head = Some(node);
        Ok(())
    }

    /// Link `node` right after `target`
    pub fn add_next(&mut self, target: K, node: K) -> Result<()>
    {
        self.ensure_unlinked(node)?;
        let next = self.link(target)?.next;
        self.links.insert(
            node,
            Link {
                prev: Some(target),
                next,
            },
        );
        self.set_next(Some(target), Some(node));
        self.set_prev(next, Some(node));
        Ok(())
    }

    /// Link `node` right before `target`
    pub fn add_before(&mut self, target: K, node: K) -> Result<()>
    {
        self.ensure_unlinked(node)?;
        let prev = self.link(target)?.prev;
        self.links.insert(
            node,
            Link {
                prev,
                next: Some(target),
            },
        );
        self.set_prev(Some(target), Some(node));
        self.set_next(prev, Some(node));
        Ok(())
    }

    pub fn remove(&mut self, node: K) -> Result<()>
    {
        let link = self.link(node)?;
        self.links.remove(node);
        self.set_next(link.prev, link.next);
        self.set_prev(link.next, link.prev);
        Ok(())
    }

    /// Put `replacement` where `target` is and unlink `target`
    pub fn replace(&mut self, target: K, replacement: K) -> Result<()>
    {
        self.ensure_unlinked(replacement)?;
        let link = self.link(target)?;
        self.links.remove(target);
        self.links.insert(replacement, link);
        self.set_next(link.prev, Some(replacement));
        self.set_prev(link.next, Some(replacement));
        Ok(())
    }

    pub fn clear(&mut self)
    {
        self.links.clear();
        self.head = None;
        self.tail = None;
    }

    pub fn iter(&self) -> Iter<'_, K>
    {
        Iter {
            chain: self,
            front: self.head,
            back: self.tail,
            remaining: self.len(),
        }
    }
}

/// Walks the chain from either end
pub struct Iter<'a, K: Key>
{
    chain: &'a LeafChain<K>,
    front: Option<K>,
    back: Option<K>,
    remaining: usize,
}

impl<K: Key> Iterator for Iter<'_, K>
{
    type Item = K;

    fn next(&mut self) -> Option<K>
    {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front?;
        self.front = self.chain.next(node);
        self.remaining -= 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>)
    {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Key> DoubleEndedIterator for Iter<'_, K>
{
    fn next_back(&mut self) -> Option<K>
    {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back?;
        self.back = self.chain.prev(node);
        self.remaining -= 1;
        Some(node)
    }
}

impl<K: Key> ExactSizeIterator for Iter<'_, K> {}

#[cfg(test)]
mod tests
{
    use slotmap::{DefaultKey, SlotMap};

    use super::*;

    fn keys(n: usize) -> Vec<DefaultKey>
    {
        let mut map = SlotMap::new();
        (0..n).map(|i| map.insert(i)).collect()
    }

    fn assert_order(chain: &LeafChain<DefaultKey>, expected: &[DefaultKey])
    {
        assert_eq!(chain.iter().collect::<Vec<_>>(), expected);
        let mut reversed = expected.to_vec();
        reversed.reverse();
        assert_eq!(chain.iter().rev().collect::<Vec<_>>(), reversed);
        assert_eq!(chain.first(), expected.first().copied());
        assert_eq!(chain.last(), expected.last().copied());
        assert_eq!(chain.len(), expected.len());
    }

    #[test]
    fn test_add_next_and_before()
    {
        let k = keys(5);
        let mut chain = LeafChain::new();
        chain.add_last(k[1]).unwrap();
        chain.add_next(k[1], k[3]).unwrap();
        chain.add_before(k[3], k[2]).unwrap();
        chain.add_before(k[1], k[0]).unwrap();
        chain.add_next(k[3], k[4]).unwrap();
        assert_order(&chain, &k);
        assert_eq!(chain.next(k[2]), Some(k[3]));
        assert_eq!(chain.prev(k[0]), None);
    }

    #[test]
    fn test_already_linked()
    {
        let k = keys(2);
        let mut chain = LeafChain::new();
        chain.add_last(k[0]).unwrap();
        assert!(matches!(chain.add_last(k[0]), Err(BigListError::AlreadyLinked)));
        assert!(matches!(chain.add_next(k[0], k[0]), Err(BigListError::AlreadyLinked)));
        assert!(matches!(chain.add_next(k[1], k[1]), Err(BigListError::InvalidState(_))));
        chain.add_first(k[1]).unwrap();
        assert!(matches!(chain.replace(k[0], k[1]), Err(BigListError::AlreadyLinked)));
        assert_order(&chain, &[k[1], k[0]]);
    }

    #[test]
    fn test_remove_boundaries()
    {
        let k = keys(4);
        let mut chain = LeafChain::new();
        for key in &k[..3] {
            chain.add_last(*key).unwrap();
        }

        chain.remove(k[1]).unwrap();
        assert_order(&chain, &[k[0], k[2]]);
        chain.remove(k[0]).unwrap();
        assert_order(&chain, &[k[2]]);
        chain.remove(k[2]).unwrap();
        assert_order(&chain, &[]);
        assert!(chain.remove(k[2]).is_err());

        // Chain is reusable after running empty
        chain.add_first(k[3]).unwrap();
        assert_order(&chain, &[k[3]]);
    }

    #[test]
    fn test_replace_boundaries()
    {
        let k = keys(6);
        let mut chain = LeafChain::new();
        chain.add_last(k[0]).unwrap();
        chain.replace(k[0], k[1]).unwrap();
        assert_order(&chain, &[k[1]]);
        assert!(!chain.contains(k[0]));

        chain.add_last(k[2]).unwrap();
        chain.add_last(k[3]).unwrap();
        chain.replace(k[1], k[4]).unwrap();
        chain.replace(k[3], k[5]).unwrap();
        assert_order(&chain, &[k[4], k[2], k[5]]);

        // Old key can be linked again once replaced
        chain.add_next(k[2], k[1]).unwrap();
        assert_order(&chain, &[k[4], k[2], k[1], k[5]]);
    }
}
