//! Tree nodes and the recursive insert/remove/query walks.

use std::mem;

use super::split;
use super::{Entry, RTreeParams};
use crate::tuple::{Coordinate, Range, Tuple};

/// Anything with a bounding box the split heuristic can work on.
pub(crate) trait Bounded<C> {
    fn bounds(&self) -> &Range<C>;
}

impl<C, H> Bounded<C> for Entry<C, H> {
    fn bounds(&self) -> &Range<C> {
        &self.range
    }
}

impl<C, H> Bounded<C> for Node<C, H> {
    fn bounds(&self) -> &Range<C> {
        &self.bbox
    }
}

/// A tree node: its minimal bounding box plus either entries or child nodes.
pub(crate) struct Node<C, H> {
    pub(crate) bbox: Range<C>,
    pub(crate) kind: NodeKind<C, H>,
}

pub(crate) enum NodeKind<C, H> {
    Leaf(Vec<Entry<C, H>>),
    Internal(Vec<Node<C, H>>),
}

impl<C: Coordinate, H> Node<C, H> {
    /// A leaf holding a single entry.
    pub(crate) fn single(entry: Entry<C, H>) -> Self {
        Self {
            bbox: entry.range.clone(),
            kind: NodeKind::Leaf(vec![entry]),
        }
    }

    /// An internal node over two children (used when the root splits).
    pub(crate) fn join(left: Node<C, H>, right: Node<C, H>) -> Self {
        Self {
            bbox: left.bbox.union(&right.bbox),
            kind: NodeKind::Internal(vec![left, right]),
        }
    }

    /// Number of direct children (entries for a leaf).
    pub(crate) fn len(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(entries) => entries.len(),
            NodeKind::Internal(children) => children.len(),
        }
    }

    /// Levels from this node down to its leaves, inclusive.
    pub(crate) fn depth(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(_) => 1,
            NodeKind::Internal(children) => 1 + children.first().map_or(0, Node::depth),
        }
    }

    /// Shrink the bounding box back to the minimal cover of the children.
    /// An empty node keeps its stale box; callers detach it right away.
    fn recompute_bbox(&mut self) {
        let bbox = match &self.kind {
            NodeKind::Leaf(entries) => Range::union_all(entries.iter().map(|e| &e.range)),
            NodeKind::Internal(children) => Range::union_all(children.iter().map(|n| &n.bbox)),
        };
        if let Some(bbox) = bbox {
            self.bbox = bbox;
        }
    }

    /// Insert `entry` below this node. Returns the new right sibling when
    /// this node overflowed and had to split.
    pub(crate) fn insert(&mut self, entry: Entry<C, H>, params: &RTreeParams) -> Option<Node<C, H>> {
        self.bbox.expand(&entry.range);

        match &mut self.kind {
            NodeKind::Leaf(entries) => {
                entries.push(entry);
                if entries.len() <= params.max_entries {
                    return None;
                }
                let (keep, moved) = split::quadratic(mem::take(entries), params.min_entries);
                *entries = keep.items;
                self.bbox = keep.bbox;
                Some(Node {
                    bbox: moved.bbox,
                    kind: NodeKind::Leaf(moved.items),
                })
            }
            NodeKind::Internal(children) => {
                let idx = choose_subtree(children, &entry.range);
                let sibling = children[idx].insert(entry, params)?;
                children.push(sibling);
                if children.len() <= params.max_entries {
                    return None;
                }
                let (keep, moved) = split::quadratic(mem::take(children), params.min_entries);
                *children = keep.items;
                self.bbox = keep.bbox;
                Some(Node {
                    bbox: moved.bbox,
                    kind: NodeKind::Internal(moved.items),
                })
            }
        }
    }

    /// Remove the entry equal to `target` from this subtree.
    ///
    /// Children left with fewer than `min` members are detached and their
    /// entries pushed onto `orphans` for re-insertion by the caller.
    pub(crate) fn remove(
        &mut self,
        target: &Entry<C, H>,
        min: usize,
        orphans: &mut Vec<Entry<C, H>>,
    ) -> bool
    where
        H: PartialEq,
    {
        match &mut self.kind {
            NodeKind::Leaf(entries) => {
                let Some(pos) = entries.iter().position(|e| e == target) else {
                    return false;
                };
                entries.swap_remove(pos);
            }
            NodeKind::Internal(children) => {
                let hit = children.iter_mut().position(|child| {
                    child.bbox.covers(&target.range) && child.remove(target, min, orphans)
                });
                let Some(i) = hit else {
                    return false;
                };
                if children[i].len() < min {
                    children.swap_remove(i).collect_entries(orphans);
                }
            }
        }
        self.recompute_bbox();
        true
    }

    /// Move every entry of this subtree into `out`.
    pub(crate) fn collect_entries(self, out: &mut Vec<Entry<C, H>>) {
        match self.kind {
            NodeKind::Leaf(entries) => out.extend(entries),
            NodeKind::Internal(children) => {
                for child in children {
                    child.collect_entries(out);
                }
            }
        }
    }

    /// Call `f` for every entry strictly containing `point`; returns the count.
    pub(crate) fn query<'a, F>(&'a self, point: &Tuple<C>, f: &mut F) -> usize
    where
        F: FnMut(&'a Entry<C, H>),
    {
        match &self.kind {
            NodeKind::Leaf(entries) => {
                let mut n = 0;
                for entry in entries {
                    if entry.range.contains(point) {
                        f(entry);
                        n += 1;
                    }
                }
                n
            }
            NodeKind::Internal(children) => children
                .iter()
                .filter(|child| child.bbox.contains(point))
                .map(|child| child.query(point, f))
                .sum(),
        }
    }

    /// Check the structural invariants of this subtree and return its entry count.
    #[cfg(test)]
    pub(crate) fn check(
        &self,
        is_root: bool,
        params: &RTreeParams,
        level: usize,
        leaf_level: &mut Option<usize>,
    ) -> usize {
        let len = self.len();
        assert!(len <= params.max_entries, "node overflow: {}", len);
        if !is_root {
            assert!(len >= params.min_entries, "node underflow: {}", len);
        }

        let expect = match &self.kind {
            NodeKind::Leaf(entries) => Range::union_all(entries.iter().map(|e| &e.range)),
            NodeKind::Internal(children) => Range::union_all(children.iter().map(|n| &n.bbox)),
        };
        assert_eq!(expect.as_ref(), Some(&self.bbox), "bounding box is not minimal");

        match &self.kind {
            NodeKind::Leaf(entries) => {
                match leaf_level {
                    Some(l) => assert_eq!(*l, level, "leaves at different depths"),
                    None => *leaf_level = Some(level),
                }
                entries.len()
            }
            NodeKind::Internal(children) => children
                .iter()
                .map(|child| child.check(false, params, level + 1, leaf_level))
                .sum(),
        }
    }
}

/// Child needing the least volume enlargement; ties go to the smaller child.
fn choose_subtree<C: Coordinate, H>(children: &[Node<C, H>], range: &Range<C>) -> usize {
    let mut best = 0;
    let mut best_growth = f64::INFINITY;
    let mut best_area = f64::INFINITY;

    for (i, child) in children.iter().enumerate() {
        let area = child.bbox.area();
        let growth = child.bbox.union_area(range) - area;
        if growth < best_growth || (growth == best_growth && area < best_area) {
            best = i;
            best_growth = growth;
            best_area = area;
        }
    }
    best
}
