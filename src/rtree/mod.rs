//! Dynamic R-tree over 6-dimensional boxes.
//!
//! The tree stores [`Entry`] values (a [`Range`] plus an opaque handle) and
//! answers "which stored ranges strictly contain this point". It is a classic
//! Guttman R-tree:
//!
//! ```text
//!                 +---------------------------+
//!   root          | bbox | child | child | .. |   between 2 and M children
//!                 +---------------------------+
//!                        /           \
//!   internal   +-----------------+  +-----------------+
//!              | bbox | children |  | bbox | children |   between m and M
//!              +-----------------+  +-----------------+
//!                     |                     |
//!   leaves       [entry .. entry]     [entry .. entry]      all at the same depth
//! ```
//!
//! - insert descends by least volume enlargement and splits overfull nodes
//!   with the quadratic heuristic, growing the tree at the root;
//! - remove finds the exact (range, handle) pair, detaches underfull nodes,
//!   collapses a single-child root and re-inserts the orphaned entries;
//! - every node's box is always the minimal cover of its subtree.
//!
//! The tree is single-writer: mutation takes `&mut self`, queries `&self`.

mod node;
mod split;


use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tuple::{Coordinate, Range, Tuple};
use node::{Node, NodeKind};

/// Default maximum fan-out.
pub const DEFAULT_MAX_ENTRIES: usize = 16;

/// Default minimum fan-out of non-root nodes.
pub const DEFAULT_MIN_ENTRIES: usize = DEFAULT_MAX_ENTRIES / 2;

/// Node fan-out limits.
///
/// When deserialized without `min_entries`, the minimum defaults to half of
/// `max_entries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ParamsDef")]
pub struct RTreeParams {
    /// Maximum number of children per node (`M`).
    pub max_entries: usize,
    /// Minimum number of children per non-root node (`m`).
    pub min_entries: usize,
}

impl Default for RTreeParams {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            min_entries: DEFAULT_MIN_ENTRIES,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct ParamsDef {
    max_entries: usize,
    min_entries: Option<usize>,
}

impl Default for ParamsDef {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            min_entries: None,
        }
    }
}

impl From<ParamsDef> for RTreeParams {
    fn from(def: ParamsDef) -> Self {
        Self {
            max_entries: def.max_entries,
            min_entries: def.min_entries.unwrap_or(def.max_entries / 2),
        }
    }
}

impl RTreeParams {
    /// Create validated parameters.
    pub fn new(max_entries: usize, min_entries: usize) -> Result<Self> {
        let params = Self {
            max_entries,
            min_entries,
        };
        params.validate()?;
        Ok(params)
    }

    /// Parameters with `m = M / 2`.
    pub fn with_max_entries(max_entries: usize) -> Result<Self> {
        Self::new(max_entries, max_entries / 2)
    }

    /// Check `M >= 4` and `1 <= m <= M / 2`.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries < 4 || self.min_entries == 0 || self.min_entries > self.max_entries / 2 {
            return Err(Error::InvalidParams {
                max_entries: self.max_entries,
                min_entries: self.min_entries,
            });
        }
        Ok(())
    }
}

/// A stored range and the caller's handle for it.
///
/// The handle is never interpreted by the tree; it is only compared for
/// equality when an entry is removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry<C, H> {
    pub range: Range<C>,
    pub handle: H,
}

impl<C, H> Entry<C, H> {
    pub fn new(range: Range<C>, handle: H) -> Self {
        Self { range, handle }
    }
}

/// R-tree of [`Entry`] values with coordinate type `C` and handle type `H`.
pub struct RTree<C, H> {
    root: Option<Node<C, H>>,
    len: usize,
    params: RTreeParams,
}

impl<C: Coordinate, H> Default for RTree<C, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Coordinate, H> RTree<C, H> {
    /// Create an empty tree with default fan-out.
    pub fn new() -> Self {
        Self::with_params(RTreeParams::default())
    }

    /// Create an empty tree with the given fan-out.
    ///
    /// # Panics
    /// Panics if `params` fails [`RTreeParams::validate`].
    pub fn with_params(params: RTreeParams) -> Self {
        assert!(params.validate().is_ok(), "invalid tree parameters: {:?}", params);
        Self {
            root: None,
            len: 0,
            params,
        }
    }

    /// Fan-out limits of this tree.
    pub fn params(&self) -> RTreeParams {
        self.params
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bounding box of everything stored, `None` when empty.
    pub fn bounds(&self) -> Option<&Range<C>> {
        self.root.as_ref().map(|n| &n.bbox)
    }

    /// Number of levels, 0 for an empty tree.
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, Node::depth)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Insert an entry.
    ///
    /// # Panics
    /// Panics if the entry's range has `min > max` in some dimension.
    pub fn insert(&mut self, entry: Entry<C, H>) {
        assert_well_formed(&entry.range);
        self.insert_entry(entry);
        self.len += 1;
    }

    fn insert_entry(&mut self, entry: Entry<C, H>) {
        let Some(root) = self.root.as_mut() else {
            self.root = Some(Node::single(entry));
            return;
        };
        let Some(sibling) = root.insert(entry, &self.params) else {
            return;
        };
        if let Some(old) = self.root.take() {
            self.root = Some(Node::join(old, sibling));
            log::trace!("rtree root split, depth now {}", self.depth());
        }
    }

    /// Remove the entry equal to `entry` (same range and same handle).
    ///
    /// Returns `false`, leaving the tree untouched, when no such entry exists.
    ///
    /// # Panics
    /// Panics if the entry's range has `min > max` in some dimension.
    pub fn remove(&mut self, entry: &Entry<C, H>) -> bool
    where
        H: PartialEq,
    {
        assert_well_formed(&entry.range);

        let Some(root) = self.root.as_mut() else {
            return false;
        };
        if !root.bbox.covers(&entry.range) {
            return false;
        }
        let mut orphans = Vec::new();
        if !root.remove(entry, self.params.min_entries, &mut orphans) {
            return false;
        }
        self.len -= 1;
        self.condense_root();

        if !orphans.is_empty() {
            log::trace!("rtree re-inserting {} orphaned entries", orphans.len());
        }
        for orphan in orphans {
            self.insert_entry(orphan);
        }
        true
    }

    /// Collapse single-child internal roots and drop an empty root.
    fn condense_root(&mut self) {
        loop {
            match self.root.take() {
                Some(Node {
                    kind: NodeKind::Internal(mut children),
                    ..
                }) if children.len() <= 1 => {
                    self.root = children.pop();
                }
                Some(Node {
                    kind: NodeKind::Leaf(entries),
                    ..
                }) if entries.is_empty() => {
                    self.root = None;
                    return;
                }
                other => {
                    self.root = other;
                    return;
                }
            }
        }
    }

    /// All entries whose range strictly contains `point`, in no particular order.
    pub fn query(&self, point: &Tuple<C>) -> Vec<&Entry<C, H>> {
        let mut out = Vec::new();
        let n = self.query_with(point, |e| out.push(e));
        debug_assert_eq!(n, out.len(), "query count mismatch");
        out
    }

    /// Call `f` for every entry whose range strictly contains `point`.
    /// Returns the number of matches.
    pub fn query_with<'a, F>(&'a self, point: &Tuple<C>, mut f: F) -> usize
    where
        F: FnMut(&'a Entry<C, H>),
    {
        match &self.root {
            Some(root) if root.bbox.contains(point) => root.query(point, &mut f),
            _ => 0,
        }
    }

    /// Every stored entry.
    pub fn dump(&self) -> Vec<&Entry<C, H>> {
        self.iter().collect()
    }

    /// Iterate over every stored entry in tree order.
    pub fn iter(&self) -> Iter<'_, C, H> {
        Iter {
            stack: self.root.iter().collect(),
            leaf: Default::default(),
            remaining: self.len,
        }
    }

    /// Assert every structural invariant and the entry count.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let mut leaf_level = None;
        let counted = match &self.root {
            Some(root) => {
                if let NodeKind::Internal(children) = &root.kind {
                    assert!(children.len() >= 2, "internal root with {} children", children.len());
                }
                root.check(true, &self.params, 0, &mut leaf_level)
            }
            None => 0,
        };
        assert_eq!(counted, self.len, "entry count mismatch");
    }
}

impl<'a, C: Coordinate, H> IntoIterator for &'a RTree<C, H> {
    type Item = &'a Entry<C, H>;
    type IntoIter = Iter<'a, C, H>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over every entry of an [`RTree`].
pub struct Iter<'a, C, H> {
    stack: Vec<&'a Node<C, H>>,
    leaf: std::slice::Iter<'a, Entry<C, H>>,
    remaining: usize,
}

impl<'a, C, H> Iterator for Iter<'a, C, H> {
    type Item = &'a Entry<C, H>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.leaf.next() {
                self.remaining -= 1;
                return Some(entry);
            }
            let node = self.stack.pop()?;
            match &node.kind {
                NodeKind::Leaf(entries) => self.leaf = entries.iter(),
                NodeKind::Internal(children) => self.stack.extend(children.iter()),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<C, H> ExactSizeIterator for Iter<'_, C, H> {}

fn assert_well_formed<C: Coordinate>(range: &Range<C>) {
    if let Some(dim) = range.first_inverted() {
        panic!(
            "malformed range: min > max in {} ({:?} > {:?})",
            dim.name(),
            range.min().get(dim),
            range.max().get(dim)
        );
    }
}
