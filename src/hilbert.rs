//! Routines for Hilbert encoding and decoding of oct-tree cells.
//!
//! Cells are encoded with Skilling's transpose algorithm (J. Skilling, "Programming the
//! Hilbert curve", AIP Conf. Proc. 707, 2004). The transposed index holds one bit of every
//! axis per level, which is exactly one 3-bit child choice per oct-tree level, so the digit
//! of level `l` is those three bits plus one.
//!
//! Output bits only depend on input bits of equal or higher significance, so the key of a
//! cell is a prefix of the keys of all cells nested inside it.

use crate::{
    constants::{MAX_DEPTH, ROOT},
    types::key::OctTreeKey,
};

const DIMENSION: usize = 3;

/// Convert axis coordinates of `bits` bits each into the transposed Hilbert index.
fn axes_to_transpose(x: &mut [u32; DIMENSION], bits: u32) {
    let m = 1u32 << (bits - 1);

    // Inverse undo
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..DIMENSION {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Gray encode
    for i in 1..DIMENSION {
        x[i] ^= x[i - 1];
    }
    let mut t = 0;
    let mut q = m;
    while q > 1 {
        if x[DIMENSION - 1] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for value in x.iter_mut() {
        *value ^= t;
    }
}

/// Inverse of `axes_to_transpose`.
fn transpose_to_axes(x: &mut [u32; DIMENSION], bits: u32) {
    let n = 2u32 << (bits - 1);

    // Gray decode by H ^ (H/2)
    let t = x[DIMENSION - 1] >> 1;
    for i in (1..DIMENSION).rev() {
        x[i] ^= x[i - 1];
    }
    x[0] ^= t;

    // Undo excess work
    let mut q = 2;
    while q != n {
        let p = q - 1;
        for i in (0..DIMENSION).rev() {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q <<= 1;
    }
}

/// Encode the cell with integer coordinates `cell` at `depth`.
///
/// Coordinates must be below `2^depth`; higher bits are ignored.
pub fn hilbert_encode(depth: u32, cell: &[u32; 3]) -> OctTreeKey {
    if depth == 0 {
        return ROOT;
    }

    // Always encode on the deepest level so that keys of nested cells share prefixes.
    let shift = MAX_DEPTH - depth;
    let mask = ((1u64 << depth) - 1) as u32;
    let mut x = [
        (cell[0] & mask) << shift,
        (cell[1] & mask) << shift,
        (cell[2] & mask) << shift,
    ];
    axes_to_transpose(&mut x, MAX_DEPTH);

    let mut key = ROOT;
    for level in 1..=depth {
        let bit = MAX_DEPTH - level;
        let octant = ((x[0] >> bit) & 1) << 2 | ((x[1] >> bit) & 1) << 1 | ((x[2] >> bit) & 1);
        key.set_index(level, octant + 1);
    }
    key
}

/// Integer coordinates, on the key's own depth, of the cell described by `key`.
pub fn hilbert_decode(key: &OctTreeKey) -> [u32; 3] {
    let depth = key.depth();
    if depth == 0 {
        return [0, 0, 0];
    }

    let mut x = [0u32; DIMENSION];
    for level in 1..=depth {
        let bit = MAX_DEPTH - level;
        let octant = key.index(level) - 1;
        x[0] |= ((octant >> 2) & 1) << bit;
        x[1] |= ((octant >> 1) & 1) << bit;
        x[2] |= (octant & 1) << bit;
    }
    transpose_to_axes(&mut x, MAX_DEPTH);

    let shift = MAX_DEPTH - depth;
    [x[0] >> shift, x[1] >> shift, x[2] >> shift]
}
