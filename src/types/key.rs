//! Hierarchical oct-tree keys.
//!
//! A key is the path from the root of an oct-tree down to a node. Each level stores the
//! index of the chosen child as a digit in `1..=8`, with `0` marking an unused level.
//! Digits are packed into a single word, the first level in the most significant bits,
//! so the integer order of the packed word is the depth-first pre-order of the tree:
//! a node precedes all of its descendants, which precede its next sibling.

use std::fmt;

use itertools::Itertools;

use crate::{
    constants::{BITS_PER_INDEX, BITS_PER_WORD, MASK_INDEX, MAX_DEPTH, NSIBLINGS, ROOT},
    hilbert::{hilbert_decode, hilbert_encode},
    types::{domain::Domain, Bounds, PointType},
};

pub type KeyType = u64;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Representation of an oct-tree key.
pub struct OctTreeKey {
    pub(crate) value: KeyType,
}

/// Bit shift of the digit stored for `level`.
fn shift(level: u32) -> u32 {
    BITS_PER_WORD - BITS_PER_INDEX * level
}

fn check_level(level: u32) {
    assert!(
        (1..=MAX_DEPTH).contains(&level),
        "level {} outside of 1..={}",
        level,
        MAX_DEPTH
    );
}

impl OctTreeKey {
    /// The root key, which precedes every other key.
    pub fn root() -> Self {
        ROOT
    }

    /// Construct a key from its packed representation.
    ///
    /// Returns `None` if a digit exceeds 8, if a set digit follows an unset one,
    /// or if digits are stored beyond `MAX_DEPTH`.
    pub fn from_value(value: KeyType) -> Option<Self> {
        let key = OctTreeKey { value };
        let digits: Vec<KeyType> = (1..=BITS_PER_WORD / BITS_PER_INDEX)
            .map(|level| (value >> shift(level)) & MASK_INDEX)
            .collect();

        let valid_digits = digits.iter().all(|&d| d <= NSIBLINGS as KeyType);
        let contiguous = digits
            .iter()
            .tuple_windows()
            .all(|(&a, &b)| a != 0 || b == 0);
        let within_depth = digits
            .iter()
            .skip(MAX_DEPTH as usize)
            .all(|&d| d == 0);

        if valid_digits && contiguous && within_depth {
            Some(key)
        } else {
            None
        }
    }

    /// Construct a key from its digits, first level first.
    ///
    /// # Panics
    /// If there are more than `MAX_DEPTH` digits or a digit is outside `1..=8`.
    pub fn from_digits(digits: &[u32]) -> Self {
        let mut key = ROOT;
        for (level, &digit) in (1..).zip(digits) {
            key.set_index(level, digit);
        }
        key
    }

    /// Return the packed representation
    pub fn value(&self) -> KeyType {
        self.value
    }

    /// Number of levels set in the key.
    pub fn depth(&self) -> u32 {
        if self.value == 0 {
            0
        } else {
            (BITS_PER_WORD - self.value.trailing_zeros() - 1) / BITS_PER_INDEX + 1
        }
    }

    /// Child index stored at `level`, `0` if the level is unset.
    pub fn index(&self, level: u32) -> u32 {
        check_level(level);
        ((self.value >> shift(level)) & MASK_INDEX) as u32
    }

    /// Store the child index `index` at `level`.
    ///
    /// # Panics
    /// If `level` is outside `1..=MAX_DEPTH` or `index` outside `1..=8`.
    pub fn set_index(&mut self, level: u32, index: u32) {
        check_level(level);
        assert!(
            (1..=NSIBLINGS).contains(&index),
            "child index {} outside of 1..={}",
            index,
            NSIBLINGS
        );
        let s = shift(level);
        self.value = (self.value & !(MASK_INDEX << s)) | ((index as KeyType) << s);
    }

    /// Unset the child index at `level`. Deeper levels are left as they are.
    pub fn clear_index(&mut self, level: u32) {
        check_level(level);
        self.value &= !(MASK_INDEX << shift(level));
    }

    /// The digits of the key, first level first.
    pub fn digits(&self) -> Vec<u32> {
        (1..=self.depth()).map(|level| self.index(level)).collect()
    }

    /// Return the parent, the root is its own parent.
    pub fn parent(&self) -> Self {
        self.truncate(self.depth().saturating_sub(1))
    }

    /// Return the child with index `index` in `1..=8`.
    pub fn child(&self, index: u32) -> Self {
        let mut child = *self;
        child.set_index(self.depth() + 1, index);
        child
    }

    /// Return all children in key order.
    pub fn children(&self) -> Vec<Self> {
        (1..=NSIBLINGS).map(|index| self.child(index)).collect()
    }

    /// Return the ancestor at `depth`, or the key itself if it is not deeper than `depth`.
    pub fn truncate(&self, depth: u32) -> Self {
        if depth >= self.depth() {
            *self
        } else if depth == 0 {
            ROOT
        } else {
            let mask = !((1 << shift(depth)) - 1);
            OctTreeKey {
                value: self.value & mask,
            }
        }
    }

    /// Check if the key is a strict ancestor of `other`.
    pub fn is_ancestor(&self, other: &OctTreeKey) -> bool {
        self.depth() < other.depth() && other.truncate(self.depth()) == *self
    }

    /// Check if key is a strict descendant of another key
    pub fn is_descendant(&self, other: &OctTreeKey) -> bool {
        other.is_ancestor(self)
    }

    /// Return the key of the cell with integer coordinates `cell` at `depth`.
    ///
    /// Cells are ordered along a Hilbert curve.
    pub fn from_cell(depth: u32, cell: &[u32; 3]) -> Self {
        hilbert_encode(depth, cell)
    }

    /// Integer coordinates of the cell described by this key, on the key's own depth.
    pub fn cell(&self) -> [u32; 3] {
        hilbert_decode(self)
    }

    /// Return the key of the deepest cell containing `point`.
    ///
    /// Points outside of the domain are mapped to the nearest boundary cell.
    pub fn from_point(point: &[PointType; 3], domain: &Domain) -> Self {
        let scale = domain.scale();
        let origin = domain.origin();
        let nlevel = (1u64 << MAX_DEPTH) as PointType;
        let mut cell = [0u32; 3];
        for (c, &p, &o) in itertools::izip!(&mut cell, point, &origin) {
            let unit = ((p - o) * scale).clamp(0.0, 1.0);
            *c = ((unit * nlevel) as u64).min((1u64 << MAX_DEPTH) - 1) as u32;
        }
        hilbert_encode(MAX_DEPTH, &cell)
    }

    /// Physical bounds of the cell described by this key.
    pub fn box_bounds(&self, domain: &Domain) -> Bounds {
        let cell = self.cell();
        let origin = domain.origin();
        let step = 1.0 / (domain.scale() * (1u64 << self.depth()) as PointType);

        let mut bounds = [0.0; 6];
        for axis in 0..3 {
            bounds[axis] = origin[axis] + step * cell[axis] as PointType;
            bounds[axis + 3] = bounds[axis] + step;
        }
        bounds
    }
}

impl fmt::Display for OctTreeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value == 0 {
            write!(f, "root")
        } else {
            write!(f, "{}", self.digits().iter().join("."))
        }
    }
}
