//! Flat weight arrays over a full oct-tree of fixed depth.
//!
//! The tree is never built. Every node is addressed through its offset in the depth-first
//! pre-order of the full tree of the chosen depth, and holds two weights: its own weight at
//! `2 * offset` and the accumulated weight of its descendants at `2 * offset + 1`.

use crate::{
    constants::{MAX_WEIGHT_DEPTH, NSIBLINGS, ROOT},
    error::{Error, Result},
    types::{key::OctTreeKey, WeightType},
};

/// Number of nodes of a full oct-tree with `depth` levels below the root.
pub fn oct_tree_size(depth: u32) -> usize {
    ((1usize << (3 * (depth + 1))) - 1) / 7
}

/// Pre-order offset of `key` in the full oct-tree of `depth` levels.
///
/// Levels of `key` deeper than `depth` are ignored.
pub fn oct_tree_offset(depth: u32, key: &OctTreeKey) -> usize {
    let mut offset = 0;
    for level in 1..=depth.min(key.depth()) {
        let index = key.index(level) as usize;
        offset += 1 + (index - 1) * oct_tree_size(depth - level);
    }
    offset
}

/// Key of the node at pre-order `offset` in the full oct-tree of `depth` levels.
///
/// Inverse of [`oct_tree_offset`] for offsets below `oct_tree_size(depth)`.
pub fn calculate_key_using_offset(depth: u32, offset: usize) -> OctTreeKey {
    let mut key = ROOT;
    let mut offset = offset;

    for level in 1..=depth {
        if offset == 0 {
            break;
        }
        let subtree_size = oct_tree_size(depth - level);
        offset -= 1;
        let index = offset / subtree_size;
        offset -= index * subtree_size;
        key.set_index(level, index as u32 + 1);
    }
    key
}

/// Overwrite the descendant weights of `k_node` and of every node below it that intersects
/// the offset range `[oct_tree_offset(depth, k_first), ord_end)`.
///
/// Nodes outside of the range are not touched, so a range of a previous partition can be
/// re-accumulated without resetting the whole array. Leaves on `depth` are left unchanged.
pub fn accumulate_weights(
    k_node: &OctTreeKey,
    k_first: &OctTreeKey,
    ord_end: usize,
    depth: u32,
    weights: &mut [WeightType],
) {
    let node_depth = k_node.depth();
    if node_depth >= depth {
        return;
    }

    let mut k_node = *k_node;
    let mut k_first = *k_first;
    let ord_node = oct_tree_offset(depth, &k_node);
    let d1 = node_depth + 1;

    let mut w = 0.0;
    let mut i = k_first.index(d1);

    if i != 0 {
        k_node.set_index(d1, i);
        let ord = oct_tree_offset(depth, &k_node);

        accumulate_weights(&k_node, &k_first, ord_end, depth, weights);

        // Weight of the node and all of its descendants
        w += weights[2 * ord] + weights[2 * ord + 1];

        // Done with the lower bound
        k_first = ROOT;
    }

    i += 1;
    while i <= NSIBLINGS {
        k_node.set_index(d1, i);
        let ord = oct_tree_offset(depth, &k_node);

        if ord < ord_end {
            accumulate_weights(&k_node, &k_first, ord_end, depth, weights);
            w += weights[2 * ord] + weights[2 * ord + 1];
        }
        i += 1;
    }

    weights[2 * ord_node + 1] = w;
}

/// Check that `depth` is a usable weight tree depth.
pub(crate) fn check_depth(depth: u32) -> Result<()> {
    if depth == 0 || depth > MAX_WEIGHT_DEPTH {
        Err(Error::InvalidDepth(depth))
    } else {
        Ok(())
    }
}

/// Check that `weights` has the length required for a tree of `depth` levels
/// and only holds finite, non-negative values.
pub(crate) fn check_weights(depth: u32, weights: &[WeightType]) -> Result<()> {
    check_depth(depth)?;

    let expected = 2 * oct_tree_size(depth);
    if weights.len() != expected {
        return Err(Error::WeightArraySize {
            depth,
            expected,
            actual: weights.len(),
        });
    }

    match weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        Some((index, &value)) => Err(Error::InvalidWeight {
            offset: index / 2,
            value,
        }),
        None => Ok(()),
    }
}

/// An owned weight array over the full oct-tree of a fixed depth.
#[derive(Clone, Debug, PartialEq)]
pub struct OctTreeWeights {
    depth: u32,
    values: Vec<WeightType>,
}

impl OctTreeWeights {
    /// A zeroed weight array for a tree of `depth` levels.
    pub fn new(depth: u32) -> Result<Self> {
        check_depth(depth)?;
        Ok(OctTreeWeights {
            depth,
            values: vec![0.0; 2 * oct_tree_size(depth)],
        })
    }

    /// Wrap an existing flat weight array.
    pub fn from_values(depth: u32, values: Vec<WeightType>) -> Result<Self> {
        check_weights(depth, &values)?;
        Ok(OctTreeWeights { depth, values })
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of nodes in the tree.
    pub fn nnodes(&self) -> usize {
        self.values.len() / 2
    }

    /// Add `weight` to the own weight of `key`, truncated to the depth of the tree.
    pub fn add(&mut self, key: &OctTreeKey, weight: WeightType) {
        let offset = oct_tree_offset(self.depth, key);
        self.values[2 * offset] += weight;
    }

    /// Own weight of the node `key`.
    pub fn own(&self, key: &OctTreeKey) -> WeightType {
        self.values[2 * oct_tree_offset(self.depth, key)]
    }

    /// Accumulated weight of the descendants of `key`, as left by the last accumulation.
    pub fn descendants(&self, key: &OctTreeKey) -> WeightType {
        self.values[2 * oct_tree_offset(self.depth, key) + 1]
    }

    /// Sum of all own weights.
    pub fn total(&self) -> WeightType {
        self.values.iter().step_by(2).sum()
    }

    /// Accumulate descendant weights over the key range `[k_first, k_end)`,
    /// an open end runs to the end of the tree.
    pub fn accumulate(&mut self, k_first: &OctTreeKey, k_end: Option<&OctTreeKey>) {
        let ord_end = match k_end {
            Some(key) => oct_tree_offset(self.depth, key),
            None => oct_tree_size(self.depth),
        };
        accumulate_weights(&ROOT, k_first, ord_end, self.depth, &mut self.values);
    }

    /// Zero every weight.
    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|w| *w = 0.0);
    }

    pub fn as_slice(&self) -> &[WeightType] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [WeightType] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<WeightType> {
        self.values
    }
}
