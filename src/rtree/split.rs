//! Quadratic-cost node split.
//!
//! Guttman's quadratic split: seed the two groups with the pair of items that
//! would waste the most volume if kept together, then repeatedly hand the
//! item with the strongest preference to the group that grows least.

use super::node::Bounded;
use crate::tuple::{Coordinate, Range};

/// One half of a split node.
pub(crate) struct Group<T, C> {
    pub(crate) items: Vec<T>,
    pub(crate) bbox: Range<C>,
}

impl<T: Bounded<C>, C: Coordinate> Group<T, C> {
    fn seed(item: T) -> Self {
        let bbox = item.bounds().clone();
        Self {
            items: vec![item],
            bbox,
        }
    }

    fn push(&mut self, item: T) {
        self.bbox.expand(item.bounds());
        self.items.push(item);
    }
}

/// Split `items` into two groups of at least `min` items each.
///
/// Requires `items.len() >= 2 * min` and at least two items.
pub(crate) fn quadratic<T, C>(mut items: Vec<T>, min: usize) -> (Group<T, C>, Group<T, C>)
where
    T: Bounded<C>,
    C: Coordinate,
{
    debug_assert!(items.len() >= 2 && items.len() >= 2 * min);

    let (s1, s2) = pick_seeds(&items);
    // s1 < s2, so removing s2 first leaves s1 in place
    let seed2 = items.swap_remove(s2);
    let seed1 = items.swap_remove(s1);
    let mut a = Group::seed(seed1);
    let mut b = Group::seed(seed2);

    while !items.is_empty() {
        if a.items.len() + items.len() <= min {
            for item in items.drain(..) {
                a.push(item);
            }
            break;
        }
        if b.items.len() + items.len() <= min {
            for item in items.drain(..) {
                b.push(item);
            }
            break;
        }

        let (idx, to_a) = pick_next(&items, &a, &b);
        let item = items.swap_remove(idx);
        if to_a {
            a.push(item);
        } else {
            b.push(item);
        }
    }

    (a, b)
}

/// The pair whose common bounding box wastes the most volume.
fn pick_seeds<T: Bounded<C>, C: Coordinate>(items: &[T]) -> (usize, usize) {
    let areas: Vec<f64> = items.iter().map(|it| it.bounds().area()).collect();
    let mut best = (0, 1);
    let mut worst_waste = f64::NEG_INFINITY;

    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let waste = items[i].bounds().union_area(items[j].bounds()) - areas[i] - areas[j];
            if waste > worst_waste {
                worst_waste = waste;
                best = (i, j);
            }
        }
    }
    best
}

/// Next item to assign and whether it goes to group `a`.
fn pick_next<T: Bounded<C>, C: Coordinate>(
    items: &[T],
    a: &Group<T, C>,
    b: &Group<T, C>,
) -> (usize, bool) {
    let area_a = a.bbox.area();
    let area_b = b.bbox.area();

    let mut best_idx = 0;
    let mut best_diff = f64::NEG_INFINITY;
    let mut best_to_a = true;

    for (i, item) in items.iter().enumerate() {
        let grow_a = a.bbox.union_area(item.bounds()) - area_a;
        let grow_b = b.bbox.union_area(item.bounds()) - area_b;
        let diff = (grow_a - grow_b).abs();
        if diff > best_diff {
            best_diff = diff;
            best_idx = i;
            best_to_a = prefers_a(grow_a, grow_b, area_a, area_b, a.items.len(), b.items.len());
        }
    }
    (best_idx, best_to_a)
}

/// Smaller enlargement wins, then smaller area, then fewer items.
fn prefers_a(grow_a: f64, grow_b: f64, area_a: f64, area_b: f64, len_a: usize, len_b: usize) -> bool {
    if grow_a != grow_b {
        grow_a < grow_b
    } else if area_a != area_b {
        area_a < area_b
    } else {
        len_a <= len_b
    }
}
