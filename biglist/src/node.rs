use slotmap::new_key_type;

use crate::store::ContainerId;

new_key_type! {
    /// Handle of a node in the tree arena
    pub struct NodeId;
}

/// Deepest depth the balance table covers
pub const MAX_FIB: usize = 44;

/// `FIBONACCI[d]` is the least item count a balanced node of depth `d`
/// holds. The last entry caps the table.
pub const FIBONACCI: [usize; MAX_FIB + 2] = fibonacci_table();

const fn fibonacci_table() -> [usize; MAX_FIB + 2]
{
    let mut table = [0usize; MAX_FIB + 2];
    table[0] = 1;
    table[1] = 2;
    let mut i = 2;
    while i <= MAX_FIB {
        table[i] = table[i - 1] + table[i - 2];
        i += 1;
    }
    table[MAX_FIB + 1] = i32::MAX as usize;
    table
}

#[derive(Debug, Clone)]
pub struct LeafNode<A>
{
    pub container: ContainerId,
    pub count: usize,
    pub aggregate: A,
}

#[derive(Debug, Clone)]
pub struct ConcatNode<A>
{
    pub left: NodeId,
    pub right: NodeId,
    pub count: usize,
    pub depth: usize,
    pub aggregate: A,
}

#[derive(Debug, Clone)]
pub enum Node<A>
{
    Leaf(LeafNode<A>),
    Concat(ConcatNode<A>),
}

impl<A> Node<A>
{
    #[inline]
    pub fn count(&self) -> usize
    {
        match self {
            Node::Leaf(leaf) => leaf.count,
            Node::Concat(concat) => concat.count,
        }
    }

    #[inline]
    pub fn depth(&self) -> usize
    {
        match self {
            Node::Leaf(_) => 0,
            Node::Concat(concat) => concat.depth,
        }
    }

    pub fn aggregate(&self) -> &A
    {
        match self {
            Node::Leaf(leaf) => &leaf.aggregate,
            Node::Concat(concat) => &concat.aggregate,
        }
    }

    pub fn is_leaf(&self) -> bool
    {
        matches!(self, Node::Leaf(_))
    }

    /// Deep enough nodes must hold at least a Fibonacci number of items
    pub fn is_balanced(&self) -> bool
    {
        let depth = self.depth();
        depth <= MAX_FIB && self.count() >= FIBONACCI[depth]
    }
}
