//! Compressed radix bit-trie over the full `i32` key space.
//!
//! Every node consumes five bits of the key, uses a 32-bit presence bitmap, and stores only
//! the children that exist in a compacted array ordered by slot. Chains of single-child nodes
//! are never materialised: a node remembers the prefix bits it already matched, and a new key
//! that diverges from that prefix splices a parent in at the first differing bit group.
//!
//! Keys are turned into radix paths by flipping the sign bit, so iteration is in ascending
//! signed order.

use std::fmt;
use std::mem;

use tracing::trace;

use crate::int_map::IntKeyMap;
use crate::Result;

// =============================================================================
// Bit utilities
// =============================================================================

const BITS: u32 = 5;
const SLOT_MASK: u32 = (1 << BITS) - 1;
const SIGN_FLIP: u32 = 0x8000_0000;

#[inline]
fn path_of(key: i32) -> u32 {
    key as u32 ^ SIGN_FLIP
}

#[inline]
fn key_of(path: u32) -> i32 {
    (path ^ SIGN_FLIP) as i32
}

/// Mask of the bits above the slot decided at `shift`.
#[inline]
fn prefix_mask(shift: u8) -> u32 {
    let covered = shift as u32 + BITS;
    if covered >= u32::BITS {
        0
    } else {
        u32::MAX << covered
    }
}

#[inline]
fn slot_of(path: u32, shift: u8) -> u32 {
    (path >> shift) & SLOT_MASK
}

/// Shift of the level that owns the highest bit set in `diff`.
#[inline]
fn divergence_shift(diff: u32) -> u8 {
    debug_assert_ne!(diff, 0);
    let highest = u32::BITS - 1 - diff.leading_zeros();
    ((highest / BITS) * BITS) as u8
}

fn insert_at<T>(items: &mut Vec<T>, idx: usize, item: T) {
    items.reserve_exact(1);
    items.insert(idx, item);
}

fn remove_at<T>(items: &mut Vec<T>, idx: usize) -> T {
    let item = items.remove(idx);
    items.shrink_to_fit();
    item
}

// =============================================================================
// Node
// =============================================================================

#[derive(Clone)]
enum Slots<V> {
    /// Values of a `shift == 0` node, one per set bitmap bit.
    Leaf(Vec<V>),
    /// Child nodes, one per set bitmap bit.
    Internal(Vec<Node<V>>),
}

#[derive(Clone)]
struct Node<V> {
    /// Path bits above this node's slot bits; every key below shares them.
    prefix: u32,
    /// Number of low bits below this node's slot bits. Zero for leaves.
    shift: u8,
    bitmap: u32,
    slots: Slots<V>,
}

impl<V> Node<V> {
    fn empty() -> Self {
        Self {
            prefix: 0,
            shift: 0,
            bitmap: 0,
            slots: Slots::Leaf(Vec::new()),
        }
    }

    fn leaf(path: u32, value: V) -> Self {
        Self {
            prefix: path & !SLOT_MASK,
            shift: 0,
            bitmap: 1 << (path & SLOT_MASK),
            slots: Slots::Leaf(vec![value]),
        }
    }

    /// Builds the parent that routes `existing` and `leaf` apart at `shift`.
    fn join(existing: Node<V>, leaf: Node<V>, path: u32, shift: u8) -> Self {
        let existing_slot = slot_of(existing.prefix, shift);
        let leaf_slot = slot_of(path, shift);
        debug_assert_ne!(existing_slot, leaf_slot);

        let children = if existing_slot < leaf_slot {
            vec![existing, leaf]
        } else {
            vec![leaf, existing]
        };
        Self {
            prefix: path & prefix_mask(shift),
            shift,
            bitmap: (1 << existing_slot) | (1 << leaf_slot),
            slots: Slots::Internal(children),
        }
    }

    #[inline]
    fn matches(&self, path: u32) -> bool {
        path & prefix_mask(self.shift) == self.prefix
    }

    #[inline]
    fn has(&self, slot: u32) -> bool {
        self.bitmap & (1 << slot) != 0
    }

    /// Position of `slot` in the compacted array.
    #[inline]
    fn rank(&self, slot: u32) -> usize {
        (self.bitmap & ((1 << slot) - 1)).count_ones() as usize
    }

    fn get(&self, path: u32) -> Option<&V> {
        let mut node = self;
        loop {
            if !node.matches(path) {
                return None;
            }
            let slot = slot_of(path, node.shift);
            if !node.has(slot) {
                return None;
            }
            let rank = node.rank(slot);
            match &node.slots {
                Slots::Leaf(values) => return values.get(rank),
                Slots::Internal(children) => node = &children[rank],
            }
        }
    }

    fn get_mut(&mut self, path: u32) -> Option<&mut V> {
        if !self.matches(path) {
            return None;
        }
        let slot = slot_of(path, self.shift);
        if !self.has(slot) {
            return None;
        }
        let rank = self.rank(slot);
        match &mut self.slots {
            Slots::Leaf(values) => values.get_mut(rank),
            Slots::Internal(children) => children[rank].get_mut(path),
        }
    }

    fn insert(&mut self, path: u32, value: V) -> Option<V> {
        if !self.matches(path) {
            let shift = divergence_shift((path & prefix_mask(self.shift)) ^ self.prefix);
            trace!(shift, below = self.shift, "splitting radix trie path");
            let existing = mem::replace(self, Node::empty());
            *self = Node::join(existing, Node::leaf(path, value), path, shift);
            return None;
        }

        let slot = slot_of(path, self.shift);
        let present = self.has(slot);
        let rank = self.rank(slot);
        match &mut self.slots {
            Slots::Leaf(values) => {
                if present {
                    return Some(mem::replace(&mut values[rank], value));
                }
                insert_at(values, rank, value);
            }
            Slots::Internal(children) => {
                if present {
                    return children[rank].insert(path, value);
                }
                insert_at(children, rank, Node::leaf(path, value));
            }
        }
        self.bitmap |= 1 << slot;
        None
    }

    /// Removes `path` below this node. An emptied child is unlinked, and a node left with a
    /// single child is replaced by that child.
    fn remove(&mut self, path: u32) -> Option<V> {
        if !self.matches(path) {
            return None;
        }
        let slot = slot_of(path, self.shift);
        if !self.has(slot) {
            return None;
        }
        let rank = self.rank(slot);

        let removed = match &mut self.slots {
            Slots::Leaf(values) => {
                self.bitmap &= !(1 << slot);
                return Some(remove_at(values, rank));
            }
            Slots::Internal(children) => {
                let removed = children[rank].remove(path)?;
                if children[rank].bitmap == 0 {
                    remove_at(children, rank);
                    self.bitmap &= !(1 << slot);
                }
                removed
            }
        };

        let only_child = match &mut self.slots {
            Slots::Internal(children) if children.len() == 1 => children.pop(),
            _ => None,
        };
        if let Some(child) = only_child {
            *self = child;
        }
        Some(removed)
    }

    fn first(&self) -> Option<(i32, &V)> {
        let slot = self.bitmap.trailing_zeros();
        match &self.slots {
            Slots::Leaf(values) => values.first().map(|v| (key_of(self.prefix | slot), v)),
            Slots::Internal(children) => children.first()?.first(),
        }
    }

    fn last(&self) -> Option<(i32, &V)> {
        let slot = u32::BITS - 1 - self.bitmap.leading_zeros();
        match &self.slots {
            Slots::Leaf(values) => values.last().map(|v| (key_of(self.prefix | slot), v)),
            Slots::Internal(children) => children.last()?.last(),
        }
    }

    fn memory_usage(&self) -> usize {
        match &self.slots {
            Slots::Leaf(values) => values.capacity() * mem::size_of::<V>(),
            Slots::Internal(children) => {
                children.capacity() * mem::size_of::<Node<V>>()
                    + children.iter().map(Node::memory_usage).sum::<usize>()
            }
        }
    }
}

// =============================================================================
// RadixTrie
// =============================================================================

/// An ordered map from `i32` to `V` built on a path-compressed 32-way bit-trie.
///
/// Depth tracks how dispersed the stored keys are rather than the full key width: keys that
/// cluster in a small range live in one or two levels.
///
/// ```
/// use dualkey::RadixTrie;
///
/// let mut trie = RadixTrie::new();
/// trie.insert(32, "b");
/// trie.insert(-7, "z");
/// trie.insert(31, "a");
///
/// let keys: Vec<i32> = trie.keys().collect();
/// assert_eq!(keys, vec![-7, 31, 32]);
/// ```
#[derive(Clone)]
pub struct RadixTrie<V> {
    root: Option<Node<V>>,
    len: usize,
}

impl<V> RadixTrie<V> {
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, key: i32) -> Option<&V> {
        self.root.as_ref()?.get(path_of(key))
    }

    pub fn get_mut(&mut self, key: i32) -> Option<&mut V> {
        self.root.as_mut()?.get_mut(path_of(key))
    }

    #[inline]
    pub fn contains_key(&self, key: i32) -> bool {
        self.get(key).is_some()
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn insert(&mut self, key: i32, value: V) -> Option<V> {
        let path = path_of(key);
        let previous = match &mut self.root {
            Some(root) => root.insert(path, value),
            None => {
                self.root = Some(Node::leaf(path, value));
                None
            }
        };
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    pub fn remove(&mut self, key: i32) -> Option<V> {
        let root = self.root.as_mut()?;
        let removed = root.remove(path_of(key))?;
        if root.bitmap == 0 {
            self.root = None;
        }
        self.len -= 1;
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(i32, &V)> {
        self.root.as_ref()?.first()
    }

    /// Entry with the largest key.
    pub fn last_key_value(&self) -> Option<(i32, &V)> {
        self.root.as_ref()?.last()
    }

    pub fn iter(&self) -> Iter<'_, V> {
        let mut stack = Vec::new();
        if let Some(root) = &self.root {
            stack.push(Frame::new(root));
        }
        Iter {
            stack,
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn memory_usage(&self) -> usize {
        mem::size_of::<Self>() + self.root.as_ref().map_or(0, Node::memory_usage)
    }

    /// Number of levels on the deepest path, zero when empty.
    pub fn depth(&self) -> usize {
        fn depth_of<V>(node: &Node<V>) -> usize {
            match &node.slots {
                Slots::Leaf(_) => 1,
                Slots::Internal(children) => {
                    1 + children.iter().map(depth_of).max().unwrap_or(0)
                }
            }
        }
        self.root.as_ref().map_or(0, depth_of)
    }

    /// Panics if any structural invariant of the trie is broken.
    #[cfg(test)]
    pub(crate) fn validate(&self) {
        fn walk<V>(node: &Node<V>, parent: Option<&Node<V>>) -> usize {
            assert_ne!(node.bitmap, 0, "reachable node must not be empty");
            assert_eq!(
                node.prefix & !prefix_mask(node.shift),
                0,
                "prefix must not carry undecided bits"
            );
            if let Some(parent) = parent {
                assert!(node.shift < parent.shift, "child must sit below its parent");
                assert_eq!(
                    node.prefix & prefix_mask(parent.shift),
                    parent.prefix,
                    "child prefix must extend the parent prefix"
                );
                assert!(parent.has(slot_of(node.prefix, parent.shift)));
            }
            match &node.slots {
                Slots::Leaf(values) => {
                    assert_eq!(node.shift, 0, "values only live at shift 0");
                    assert_eq!(values.len(), node.bitmap.count_ones() as usize);
                    values.len()
                }
                Slots::Internal(children) => {
                    assert_ne!(node.shift, 0, "internal nodes cannot sit at shift 0");
                    assert_eq!(node.shift as u32 % BITS, 0);
                    assert_eq!(children.len(), node.bitmap.count_ones() as usize);
                    assert!(children.len() >= 2, "single-child internal node");
                    children.iter().map(|c| walk(c, Some(node))).sum()
                }
            }
        }
        let counted = self.root.as_ref().map_or(0, |root| walk(root, None));
        assert_eq!(counted, self.len, "reachable values must match len");
    }
}

impl<V> IntKeyMap for RadixTrie<V> {
    type Value = V;
    type Iter<'a>
        = Iter<'a, V>
    where
        Self: 'a;

    #[inline]
    fn insert(&mut self, key: i32, value: V) -> Result<Option<V>> {
        Ok(RadixTrie::insert(self, key, value))
    }

    #[inline]
    fn get(&self, key: i32) -> Option<&V> {
        RadixTrie::get(self, key)
    }

    #[inline]
    fn get_mut(&mut self, key: i32) -> Option<&mut V> {
        RadixTrie::get_mut(self, key)
    }

    #[inline]
    fn remove(&mut self, key: i32) -> Option<V> {
        RadixTrie::remove(self, key)
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        RadixTrie::clear(self)
    }

    fn iter(&self) -> Iter<'_, V> {
        RadixTrie::iter(self)
    }

    fn memory_usage(&self) -> usize {
        RadixTrie::memory_usage(self)
    }
}

impl<V> Default for RadixTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: PartialEq> PartialEq for RadixTrie<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<V: Eq> Eq for RadixTrie<V> {}

impl<V: fmt::Debug> fmt::Debug for RadixTrie<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V> FromIterator<(i32, V)> for RadixTrie<V> {
    fn from_iter<I: IntoIterator<Item = (i32, V)>>(iter: I) -> Self {
        let mut trie = Self::new();
        trie.extend(iter);
        trie
    }
}

impl<V> Extend<(i32, V)> for RadixTrie<V> {
    fn extend<I: IntoIterator<Item = (i32, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, V> IntoIterator for &'a RadixTrie<V> {
    type Item = (i32, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Iteration
// =============================================================================

struct Frame<'a, V> {
    node: &'a Node<V>,
    /// Bitmap bits not yet visited.
    pending: u32,
    /// Compacted-array position of the lowest pending bit.
    rank: usize,
}

impl<'a, V> Frame<'a, V> {
    fn new(node: &'a Node<V>) -> Self {
        Self {
            node,
            pending: node.bitmap,
            rank: 0,
        }
    }
}

/// Ascending iterator over a [`RadixTrie`].
///
/// Depth-first and leftmost-first with one frame per level on an explicit stack.
pub struct Iter<'a, V> {
    stack: Vec<Frame<'a, V>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (i32, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            if frame.pending == 0 {
                self.stack.pop();
                continue;
            }
            let slot = frame.pending.trailing_zeros();
            frame.pending &= frame.pending - 1;
            let rank = frame.rank;
            frame.rank += 1;

            let node: &'a Node<V> = frame.node;
            match &node.slots {
                Slots::Leaf(values) => {
                    self.remaining -= 1;
                    return Some((key_of(node.prefix | slot), &values[rank]));
                }
                Slots::Internal(children) => self.stack.push(Frame::new(&children[rank])),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
