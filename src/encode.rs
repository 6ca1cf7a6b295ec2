//! Inclusive-to-strict range encoding.
//!
//! The index only answers `min < p < max`. An ACL rule means
//! `lo <= p <= hi`. Storing `lo - 1` in the min corner and `hi + 1` in the max
//! corner makes the two equivalent over integers:
//!
//! ```text
//!   lo - 1 < p   <=>   lo <= p
//!   p < hi + 1   <=>   p <= hi
//! ```
//!
//! Lookup keys are stored unchanged. Every field is widened into the
//! family's coordinate type *before* the offset is applied, so `0 - 1` and
//! `u16::MAX + 1` never wrap.

use num::{One, ToPrimitive};

use crate::family::AddressFamily;
use crate::rule::FieldSet;
use crate::tuple::{Coordinate, Dim, Range, Tuple, DIM};

/// Adjustment applied to every coordinate of a tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// Min corner of a stored range.
    Min = -1,
    /// Lookup key.
    Key = 0,
    /// Max corner of a stored range.
    Max = 1,
}

impl Offset {
    #[inline]
    pub fn apply<C: Coordinate>(self, value: C) -> C {
        match self {
            Offset::Min => value - C::one(),
            Offset::Key => value,
            Offset::Max => value + C::one(),
        }
    }

    /// Undo [`Offset::apply`].
    #[inline]
    pub fn invert<C: Coordinate>(self, value: C) -> C {
        match self {
            Offset::Min => value + C::one(),
            Offset::Key => value,
            Offset::Max => value - C::one(),
        }
    }
}

/// Tuple from six already-widened coordinates with `offset` applied.
pub fn make_tuple_raw<C: Coordinate>(coords: [C; DIM], offset: Offset) -> Tuple<C> {
    Tuple::new(coords.map(|c| offset.apply(c)))
}

/// Min corner from raw coordinates.
pub fn make_min_raw<C: Coordinate>(coords: [C; DIM]) -> Tuple<C> {
    make_tuple_raw(coords, Offset::Min)
}

/// Max corner from raw coordinates.
pub fn make_max_raw<C: Coordinate>(coords: [C; DIM]) -> Tuple<C> {
    make_tuple_raw(coords, Offset::Max)
}

/// Lookup key from raw coordinates.
pub fn make_key_raw<C: Coordinate>(coords: [C; DIM]) -> Tuple<C> {
    make_tuple_raw(coords, Offset::Key)
}

/// Widen each field into the family's coordinate type.
pub fn widen<F: AddressFamily>(fields: &FieldSet<F>) -> [F::Coord; DIM] {
    [
        F::addr_to_coord(fields.src()),
        F::addr_to_coord(fields.dst()),
        F::Coord::from(fields.src_port()),
        F::Coord::from(fields.dst_port()),
        F::Coord::from(fields.proto()),
        F::Coord::from(fields.dscp()),
    ]
}

/// Min corner for a rule whose lowest matching flow is `fields`.
pub fn make_min<F: AddressFamily>(fields: &FieldSet<F>) -> Tuple<F::Coord> {
    make_min_raw(widen(fields))
}

/// Max corner for a rule whose highest matching flow is `fields`.
pub fn make_max<F: AddressFamily>(fields: &FieldSet<F>) -> Tuple<F::Coord> {
    make_max_raw(widen(fields))
}

/// Lookup key for a flow.
pub fn make_key<F: AddressFamily>(fields: &FieldSet<F>) -> Tuple<F::Coord> {
    make_key_raw(widen(fields))
}

/// Stored range matching exactly the flows in `[min, max]`.
pub fn make_range<F: AddressFamily>(min: &FieldSet<F>, max: &FieldSet<F>) -> Range<F::Coord> {
    Range::new(make_min(min), make_max(max))
}

/// Narrow six coordinates back into fields; `None` if any is out of domain.
fn narrow<F: AddressFamily>(coords: [F::Coord; DIM]) -> Option<FieldSet<F>> {
    let [src, dst, sp, dp, proto, dscp] = coords;
    Some(FieldSet::new(
        F::coord_to_addr(&src)?,
        F::coord_to_addr(&dst)?,
        sp.to_u16()?,
        dp.to_u16()?,
        proto.to_u8()?,
        dscp.to_u8()?,
    ))
}

/// Recover the inclusive field bounds of a stored range.
pub fn decode_range<F: AddressFamily>(range: &Range<F::Coord>) -> Option<(FieldSet<F>, FieldSet<F>)> {
    let lo = range.min().clone().into_coords().map(|c| Offset::Min.invert(c));
    let hi = range.max().clone().into_coords().map(|c| Offset::Max.invert(c));
    Some((narrow(lo)?, narrow(hi)?))
}

/// Decode a lookup key back into flow fields.
pub fn decode_key<F: AddressFamily>(key: &Tuple<F::Coord>) -> Option<FieldSet<F>> {
    narrow(key.clone().into_coords())
}

/// Render one coordinate: addresses in their text form, the rest as numbers.
fn field_text<F: AddressFamily>(dim: Dim, coord: &F::Coord) -> String {
    match dim {
        Dim::SrcAddr | Dim::DstAddr => match F::coord_to_addr(coord) {
            Some(addr) => addr.to_string(),
            None => coord.to_string(),
        },
        _ => coord.to_string(),
    }
}

/// Render a lookup key as `"src, dst, sport, dport, proto, dscp"`.
pub fn format_tuple<F: AddressFamily>(key: &Tuple<F::Coord>) -> String {
    Dim::ALL
        .iter()
        .map(|&d| field_text::<F>(d, key.get(d)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a stored range in inclusive form, `"lo-hi, lo-hi, ..."`.
pub fn format_range<F: AddressFamily>(range: &Range<F::Coord>) -> String {
    Dim::ALL
        .iter()
        .map(|&d| {
            let lo = Offset::Min.invert(range.min().get(d).clone());
            let hi = Offset::Max.invert(range.max().get(d).clone());
            format!("{}-{}", field_text::<F>(d, &lo), field_text::<F>(d, &hi))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
