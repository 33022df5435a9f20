//! Covering of boxes by oct-tree cells.
//!
//! A box is mapped onto the smallest set of cells of a single depth whose union contains
//! it. The depth is the deepest one whose cells are still at least as large as the box, so
//! along every axis the box meets at most two cells and the covering holds at most eight
//! keys.

use log::trace;

use crate::{
    constants::{COVERING_EPSILON, MAX_DEPTH, NSIBLINGS},
    error::{Error, Result},
    hilbert::hilbert_encode,
    types::{domain::Domain, key::OctTreeKey, Bounds, PointType},
};

const DIMENSION: usize = 3;

/// The cells covering a box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Covering {
    keys: [OctTreeKey; NSIBLINGS as usize],
    count: usize,
    depth: u32,
    exact: bool,
}

impl Covering {
    /// The covering keys, the key of the lower corner first.
    pub fn keys(&self) -> &[OctTreeKey] {
        &self.keys[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Depth shared by all covering keys.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// False if the box had to be clipped to the global box.
    pub fn is_exact(&self) -> bool {
        self.exact
    }
}

/// Floor of the base 2 logarithm, `0` for `0`.
fn log2(x: u32) -> u32 {
    if x == 0 {
        0
    } else {
        u32::BITS - 1 - x.leading_zeros()
    }
}

/// Cover `small_box` with cells of the oct-tree spanned by `global_box`.
///
/// `scale` is the normalisation factor of the global box, see [`Domain::scale`].
/// Boxes reaching outside of the global box are clipped and flagged as inexact.
///
/// Returns [`Error::DepthDetermination`] if `scale` does not belong to `global_box`.
pub fn box_covering(global_box: &Bounds, small_box: &Bounds, scale: PointType) -> Result<Covering> {
    let min = COVERING_EPSILON;
    let max = 1.0 - min;

    let mut ubox_low = [0.0; DIMENSION];
    let mut ubox_up = [0.0; DIMENSION];
    let mut exact = true;

    // Largest extent of the box in the unit cube, bounded by [eps, 1-eps].
    let mut unit_size: PointType = 0.0;

    for axis in 0..DIMENSION {
        let global_low = global_box[axis];
        let global_up = global_box[axis + DIMENSION];
        let small_low = small_box[axis];
        let small_up = small_box[axis + DIMENSION];

        if small_up < global_low {
            ubox_low[axis] = min;
            ubox_up[axis] = min;
            exact = false;
        } else if global_up < small_low {
            ubox_low[axis] = max;
            ubox_up[axis] = max;
            exact = false;
        } else {
            let mut unit_low = (small_low - global_low) * scale;
            let mut unit_up = (small_up - global_low) * scale;

            if unit_low < min {
                unit_low = min;
                exact = false;
            }

            if max < unit_up {
                unit_up = max;
                exact = false;
            }

            if unit_up < unit_low {
                // A negative extent is taken as a point at the lower end.
                unit_up = unit_low;
                exact = false;
            } else {
                unit_size = unit_size.max(unit_up - unit_low);
            }

            ubox_low[axis] = unit_low;
            ubox_up[axis] = unit_up;
        }
    }

    // Deepest level whose cells could still contain the box.
    let depth = if unit_size > 0.0 {
        let size_inv = (1.0 / unit_size) as u32;
        log2(size_inv).min(MAX_DEPTH)
    } else {
        MAX_DEPTH
    };

    let num_cell = 1u64 << depth;

    // At most two cells along each axis on this level.
    let mut coord_low = [0u32; DIMENSION];
    let mut coord_up = [0u32; DIMENSION];

    for axis in 0..DIMENSION {
        let low = (ubox_low[axis] * num_cell as PointType) as u64;
        let up = (ubox_up[axis] * num_cell as PointType) as u64;

        if low.saturating_add(1) < up || num_cell <= up {
            return Err(Error::DepthDetermination {
                axis,
                low,
                up,
                depth,
            });
        }

        coord_low[axis] = low as u32;
        coord_up[axis] = up as u32;
    }

    let mut keys = [OctTreeKey::root(); NSIBLINGS as usize];

    // The lower corner can not be a duplicate.
    keys[0] = hilbert_encode(depth, &coord_low);
    let mut count = 1;

    for combination in 1..NSIBLINGS as usize {
        let duplicate = (0..DIMENSION)
            .any(|axis| combination & (1 << axis) != 0 && coord_up[axis] == coord_low[axis]);

        if !duplicate {
            let mut coord = [0u32; DIMENSION];
            for axis in 0..DIMENSION {
                coord[axis] = if combination & (1 << axis) != 0 {
                    coord_up[axis]
                } else {
                    coord_low[axis]
                };
            }
            keys[count] = hilbert_encode(depth, &coord);
            count += 1;
        }
    }

    trace!(
        "covered box {:?} with {} keys at depth {} (exact: {})",
        small_box,
        count,
        depth,
        exact
    );

    Ok(Covering {
        keys,
        count,
        depth,
        exact,
    })
}

impl Domain {
    /// Cover `small_box` with cells of the oct-tree spanned by this domain.
    pub fn covering(&self, small_box: &Bounds) -> Result<Covering> {
        box_covering(&self.bounds, small_box, self.scale())
    }
}
