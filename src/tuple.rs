//! Coordinates, 6-tuples and ranges.
//!
//! A [`Tuple`] is a point in the 6-dimensional flow space, a [`Range`] is an
//! axis-aligned box in that space. Containment is *strict*: a range contains a
//! point only when `min < p < max` in every dimension. The encoding layer
//! (see [`crate::encode`]) widens rule bounds by one unit so that strict
//! containment behaves as the inclusive ACL interval.

use num::{Signed, ToPrimitive};
use std::cmp;
use std::fmt;
use std::ops::Index;

/// Number of dimensions of a flow tuple.
pub const DIM: usize = 6;

/// Dimensions of a flow tuple, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    SrcAddr = 0,
    DstAddr = 1,
    SrcPort = 2,
    DstPort = 3,
    Proto = 4,
    Dscp = 5,
}

impl Dim {
    /// All dimensions in storage order.
    pub const ALL: [Dim; DIM] = [
        Dim::SrcAddr,
        Dim::DstAddr,
        Dim::SrcPort,
        Dim::DstPort,
        Dim::Proto,
        Dim::Dscp,
    ];

    /// Position of this dimension inside a tuple.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short field name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Dim::SrcAddr => "src",
            Dim::DstAddr => "dst",
            Dim::SrcPort => "src_port",
            Dim::DstPort => "dst_port",
            Dim::Proto => "proto",
            Dim::Dscp => "dscp",
        }
    }
}

/// Signed integer type usable as a tuple coordinate.
///
/// The type must be wide enough to hold every field value plus one unit of
/// slack on either side. `i64` covers IPv4 tuples, `num::BigInt` covers IPv6.
pub trait Coordinate:
    Clone + Ord + fmt::Debug + fmt::Display + Signed + ToPrimitive + From<u8> + From<u16> + From<u32>
{
    /// Length of `[lo, hi]` as a float. Only used by the split and
    /// choose-subtree heuristics, never for containment.
    fn span(lo: &Self, hi: &Self) -> f64 {
        (hi.clone() - lo.clone()).to_f64().unwrap_or(f64::MAX)
    }
}

impl<T> Coordinate for T where
    T: Clone + Ord + fmt::Debug + fmt::Display + Signed + ToPrimitive + From<u8> + From<u16> + From<u32>
{
}

/// A point in flow space: (src addr, dst addr, src port, dst port, proto, dscp).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tuple<C>([C; DIM]);

impl<C> Tuple<C> {
    /// Create a tuple from coordinates in storage order.
    pub fn new(coords: [C; DIM]) -> Self {
        Self(coords)
    }

    /// Coordinate of one dimension.
    pub fn get(&self, dim: Dim) -> &C {
        &self.0[dim.index()]
    }

    /// Replace the coordinate of one dimension.
    pub fn set(&mut self, dim: Dim, value: C) {
        self.0[dim.index()] = value;
    }

    /// All coordinates in storage order.
    pub fn coords(&self) -> &[C; DIM] {
        &self.0
    }

    /// Consume the tuple and return its coordinates.
    pub fn into_coords(self) -> [C; DIM] {
        self.0
    }
}

impl<C> Index<Dim> for Tuple<C> {
    type Output = C;

    fn index(&self, dim: Dim) -> &C {
        self.get(dim)
    }
}

/// An axis-aligned box in flow space, stored as its two corners.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range<C> {
    min: Tuple<C>,
    max: Tuple<C>,
}

impl<C: Coordinate> Range<C> {
    /// Create a range from its corners. Well-formedness is checked when the
    /// range is handed to the index, not here.
    pub fn new(min: Tuple<C>, max: Tuple<C>) -> Self {
        Self { min, max }
    }

    /// The degenerate range around a single point.
    pub fn from_point(point: &Tuple<C>) -> Self {
        Self::new(point.clone(), point.clone())
    }

    /// Lower corner.
    pub fn min(&self) -> &Tuple<C> {
        &self.min
    }

    /// Upper corner.
    pub fn max(&self) -> &Tuple<C> {
        &self.max
    }

    /// `min <= max` in every dimension.
    pub fn is_well_formed(&self) -> bool {
        self.min.0.iter().zip(self.max.0.iter()).all(|(lo, hi)| lo <= hi)
    }

    /// First dimension in which `min > max`, if any.
    pub fn first_inverted(&self) -> Option<Dim> {
        Dim::ALL
            .into_iter()
            .find(|d| self.min.get(*d) > self.max.get(*d))
    }

    /// Strict containment: `min < point < max` in every dimension.
    #[inline]
    pub fn contains(&self, point: &Tuple<C>) -> bool {
        self.min
            .0
            .iter()
            .zip(self.max.0.iter())
            .zip(point.0.iter())
            .all(|((lo, hi), p)| lo < p && p < hi)
    }

    /// `other` lies inside this range (boundaries included).
    #[inline]
    pub fn covers(&self, other: &Range<C>) -> bool {
        (0..DIM).all(|d| self.min.0[d] <= other.min.0[d] && other.max.0[d] <= self.max.0[d])
    }

    /// Grow this range to cover `other`.
    pub fn expand(&mut self, other: &Range<C>) {
        for d in 0..DIM {
            if other.min.0[d] < self.min.0[d] {
                self.min.0[d] = other.min.0[d].clone();
            }
            if other.max.0[d] > self.max.0[d] {
                self.max.0[d] = other.max.0[d].clone();
            }
        }
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &Range<C>) -> Range<C> {
        let mut out = self.clone();
        out.expand(other);
        out
    }

    /// Smallest range covering every range in `ranges`, `None` when empty.
    pub fn union_all<'a, I>(ranges: I) -> Option<Range<C>>
    where
        I: IntoIterator<Item = &'a Range<C>>,
        C: 'a,
    {
        let mut it = ranges.into_iter();
        let mut out = it.next()?.clone();
        for r in it {
            out.expand(r);
        }
        Some(out)
    }

    /// Volume of the box.
    pub fn area(&self) -> f64 {
        (0..DIM)
            .map(|d| C::span(&self.min.0[d], &self.max.0[d]))
            .product()
    }

    /// Volume of `self ∪ other`, computed without materialising the union.
    pub fn union_area(&self, other: &Range<C>) -> f64 {
        (0..DIM)
            .map(|d| {
                let lo = cmp::min(&self.min.0[d], &other.min.0[d]);
                let hi = cmp::max(&self.max.0[d], &other.max.0[d]);
                C::span(lo, hi)
            })
            .product()
    }

    /// Extra volume needed for this range to also cover `other`.
    pub fn enlargement(&self, other: &Range<C>) -> f64 {
        self.union_area(other) - self.area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(v: [i64; DIM]) -> Tuple<i64> {
        Tuple::new(v)
    }

    fn unit_box(lo: i64, hi: i64) -> Range<i64> {
        Range::new(t([lo; DIM]), t([hi; DIM]))
    }

    #[test]
    fn test_contains_is_strict() {
        let r = unit_box(0, 10);
        assert!(r.contains(&t([5; DIM])));
        assert!(r.contains(&t([1, 9, 1, 9, 1, 9])));
        assert!(!r.contains(&t([0, 5, 5, 5, 5, 5])));
        assert!(!r.contains(&t([5, 5, 5, 5, 5, 10])));
    }

    #[test]
    fn test_covers_includes_boundaries() {
        let outer = unit_box(0, 10);
        assert!(outer.covers(&unit_box(0, 10)));
        assert!(outer.covers(&unit_box(2, 8)));
        assert!(!outer.covers(&unit_box(-1, 8)));
        assert!(!unit_box(2, 8).covers(&outer));
    }

    #[test]
    fn test_well_formed() {
        assert!(unit_box(3, 3).is_well_formed());
        let bad = Range::new(t([0, 0, 5, 0, 0, 0]), t([1, 1, 4, 1, 1, 1]));
        assert!(!bad.is_well_formed());
        assert_eq!(bad.first_inverted(), Some(Dim::SrcPort));
        assert_eq!(unit_box(0, 1).first_inverted(), None);
    }

    #[test]
    fn test_union_and_area() {
        let a = unit_box(0, 2);
        let b = unit_box(4, 6);
        assert_eq!(a.area(), 64.0);
        let u = a.union(&b);
        assert_eq!(u, unit_box(0, 6));
        assert_eq!(a.union_area(&b), u.area());
        assert_eq!(a.enlargement(&b), 6f64.powi(6) - 64.0);
        assert_eq!(a.enlargement(&unit_box(1, 2)), 0.0);
    }

    #[test]
    fn test_union_all() {
        let ranges = [unit_box(0, 1), unit_box(5, 7), unit_box(-2, 0)];
        assert_eq!(Range::union_all(ranges.iter()), Some(unit_box(-2, 7)));
        assert_eq!(Range::<i64>::union_all(std::iter::empty()), None);
    }

    #[test]
    fn test_big_coordinates() {
        use num::BigInt;
        let lo = Tuple::new(std::array::from_fn(|_| BigInt::from(-1)));
        let hi = Tuple::new(std::array::from_fn(|_| BigInt::from(u128::MAX) + 1));
        let r = Range::new(lo, hi);
        let p = Tuple::new(std::array::from_fn(|_| BigInt::from(u128::MAX)));
        assert!(r.contains(&p));
        assert!(r.area().is_finite());
    }
}
