//! Weight balanced partitioning of the oct-tree key space.
//!
//! The processes `[p_first, p_end)` share the key range `[cuts[p_first], cuts[p_end])`.
//! The range is bisected at `p_upper = (p_first + p_end) / 2` by a key chosen such that
//! the weight below it relates to the weight above it as the number of processes on each
//! side, and both halves are partitioned recursively.

use log::{debug, trace};

use crate::{
    constants::{
        DEFAULT_PARTITION_DEPTH, DEFAULT_TOLERANCE, MAX_DEPTH, MAX_WEIGHT_DEPTH, NSIBLINGS, ROOT,
    },
    error::{Error, Result},
    types::{key::OctTreeKey, WeightType},
    weights::{
        accumulate_weights, calculate_key_using_offset, check_weights, oct_tree_offset,
        oct_tree_size,
    },
};

/// Parameters of a partition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartitionConfig {
    /// Depth of the weight tree.
    pub depth: u32,

    /// Accepted relative deviation of the lower/upper weight ratio from its target.
    pub tolerance: f64,

    /// Partition the two halves of every bisection concurrently.
    pub parallel: bool,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        PartitionConfig {
            depth: DEFAULT_PARTITION_DEPTH.min(MAX_DEPTH),
            tolerance: DEFAULT_TOLERANCE,
            parallel: false,
        }
    }
}

impl PartitionConfig {
    /// Default configuration with a tree deep enough to give every one of `nprocs`
    /// processes about eight leaves.
    pub fn for_processes(nprocs: usize) -> Self {
        let mut depth = DEFAULT_PARTITION_DEPTH.min(MAX_DEPTH);
        while depth < MAX_WEIGHT_DEPTH && (1usize << (3 * depth)) < 8 * nprocs {
            depth += 1;
        }
        PartitionConfig {
            depth,
            ..Default::default()
        }
    }
}

/// Copy of `key` with the child index at `level` replaced.
fn with_index(key: &OctTreeKey, level: u32, index: u32) -> OctTreeKey {
    let mut key = *key;
    key.set_index(level, index);
    key
}

/// Own plus descendant weight of a node.
fn node_weight(depth: u32, key: &OctTreeKey, weights: &[WeightType]) -> WeightType {
    let ord = oct_tree_offset(depth, key);
    weights[2 * ord] + weights[2 * ord + 1]
}

/// First key of the upper part when splitting `key` in front of its child `upper_ord`.
///
/// `upper_ord == 1` hands the whole of `key` to the upper part, `upper_ord > 8` none of it.
pub fn oct_key_split(key: &OctTreeKey, upper_ord: u32) -> OctTreeKey {
    let mut d = key.depth();
    let mut key_upper = *key;

    if upper_ord == 1 {
        while d > 0 && key_upper.index(d) == 1 {
            key_upper.clear_index(d);
            d -= 1;
        }
    } else if upper_ord > NSIBLINGS {
        // Increment to the next sibling, carrying over exhausted levels.
        let mut i = 0;
        while d > 0 {
            i = key_upper.index(d);
            if i != NSIBLINGS {
                break;
            }
            key_upper.clear_index(d);
            d -= 1;
        }
        if d > 0 {
            key_upper.set_index(d, i + 1);
        }
    } else {
        key_upper.set_index(d + 1, upper_ord);
    }

    key_upper
}

/// Search the key below `key` that splits `[k_first, i_end)` at `target_ratio`.
///
/// `k_first` is only set while the search follows the path to the first key of the range,
/// `i_begin` is the offset of that key. `w_lower` and `w_upper` carry the weight already
/// assigned to either side by the ancestors of `key`.
#[allow(clippy::too_many_arguments)]
fn partition(
    k_first: &OctTreeKey,
    i_begin: usize,
    i_end: usize,
    key: &OctTreeKey,
    depth: u32,
    weights: &[WeightType],
    tolerance: f64,
    target_ratio: f64,
    mut w_lower: f64,
    mut w_upper: f64,
) -> OctTreeKey {
    if i_end == 1 || i_end == oct_tree_offset(depth, k_first) {
        return *k_first;
    }

    let ord_node = oct_tree_offset(depth, key);

    if *key != ROOT {
        w_lower += weights[2 * ord_node];
        w_upper += weights[2 * ord_node];
    }

    // At the maximum depth?
    if key.depth() == depth {
        let not_at_last_leaf = ord_node + 1 != oct_tree_size(depth);
        if key == k_first && not_at_last_leaf {
            return calculate_key_using_offset(depth, ord_node + 1);
        }
        return *key;
    }

    let d1 = key.depth() + 1;

    // Add weights of the children, trying to achieve the ratio.
    let i_first = k_first.index(d1);
    let mut i = if i_first != 0 { i_first } else { 1 };
    let mut j = NSIBLINGS;
    while j > 1 && i_end <= oct_tree_offset(depth, &with_index(key, d1, j)) {
        j -= 1;
    }

    while i < j {
        let vali = node_weight(depth, &with_index(key, d1, i), weights);
        let valj = node_weight(depth, &with_index(key, d1, j), weights);

        if 0.0 < vali && 0.0 < valj {
            // The child not taken now is revisited.
            if (w_lower + vali) < target_ratio * (w_upper + valj) {
                w_lower += vali;
                i += 1;
            } else {
                w_upper += valj;
                j -= 1;
            }
        } else {
            if vali <= 0.0 {
                i += 1;
            }
            if valj <= 0.0 {
                j -= 1;
            }
        }
    }

    // The lower bound only constrains the child it was taken from.
    let nested_k_first = if i_first == i { *k_first } else { ROOT };

    let ki = with_index(key, d1, i);
    let vali = node_weight(depth, &ki, weights);

    if vali <= 0.0 {
        // Nothing left to balance, split the offset range in the middle.
        let middle = (i_begin + i_end) / 2;
        trace!(
            "zero weight below {}, splitting offsets [{}, {}) at {}",
            key,
            i_begin,
            i_end,
            middle
        );
        return calculate_key_using_offset(depth, middle);
    }

    let (diff, upper_ord) = if w_lower < w_upper * target_ratio {
        // Try adding to the lower part
        ((w_lower + vali) / w_upper - target_ratio, i + 1)
    } else {
        // Try adding to the upper part
        (w_lower / (w_upper + vali) - target_ratio, i)
    };

    if -tolerance < diff && diff < tolerance {
        oct_key_split(key, upper_ord)
    } else {
        partition(
            &nested_k_first,
            i_begin,
            i_end,
            &ki,
            depth,
            weights,
            tolerance,
            target_ratio,
            w_lower,
            w_upper,
        )
    }
}

/// Partition the key range starting at `cuts[0]` and ending at `end` over `cuts.len()`
/// processes, filling `cuts[1..]`. An end of `None` is the end of the tree.
///
/// The range must hold at least `cuts.len()` nodes. Each cut is kept inside the offsets that
/// leave every process of both halves at least one node, so the cuts are strictly increasing.
///
/// The two halves of a bisection touch disjoint parts of `cuts`. Their weight accumulations
/// overlap on the common ancestors, so a concurrently running upper half works on its own
/// copy of `weights`.
fn oct_tree_partition_private(
    cuts: &mut [OctTreeKey],
    end: Option<OctTreeKey>,
    depth: u32,
    tolerance: f64,
    weights: &mut [WeightType],
    parallel: bool,
) {
    let p_size = cuts.len();
    if p_size < 2 {
        return;
    }

    let p_upper = p_size / 2;
    let target_fraction = p_upper as f64 / p_size as f64;
    let target_ratio = target_fraction / (1.0 - target_fraction);

    let k_first = cuts[0];
    let i_begin = oct_tree_offset(depth, &k_first);
    let i_end = match end {
        Some(key) => oct_tree_offset(depth, &key),
        None => oct_tree_size(depth),
    };

    // Walk the tree [k_first, end) and accumulate weight
    accumulate_weights(&ROOT, &k_first, i_end, depth, weights);

    let mut k_upper = partition(
        &k_first,
        i_begin,
        i_end,
        &ROOT,
        depth,
        weights,
        tolerance,
        target_ratio,
        0.0,
        0.0,
    );

    let lowest = i_begin + p_upper;
    let highest = i_end.saturating_sub(p_size - p_upper);
    let ord_upper = oct_tree_offset(depth, &k_upper);
    if ord_upper < lowest || highest < ord_upper {
        let ord_clamped = ord_upper.max(lowest).min(highest);
        debug!(
            "cut {} at offset {} leaves a process of [{}, {}) empty, moved to offset {}",
            k_upper,
            ord_upper,
            i_begin,
            i_end,
            ord_clamped
        );
        k_upper = calculate_key_using_offset(depth, ord_clamped);
    }
    cuts[p_upper] = k_upper;

    // The lower half works on [i_begin, ord), the upper half on [ord, i_end).
    debug_assert!({
        let ord = oct_tree_offset(depth, &k_upper);
        i_begin < ord && ord < i_end
    });

    trace!(
        "split {} processes from {} at {} with target ratio {:.4}",
        p_size,
        k_first,
        k_upper,
        target_ratio
    );

    let (lower, upper) = cuts.split_at_mut(p_upper);
    let nested_lower_split = lower.len() > 1;
    let nested_upper_split = upper.len() > 1;

    if parallel && nested_lower_split && nested_upper_split {
        let mut upper_weights = weights.to_vec();
        rayon::join(
            || oct_tree_partition_private(lower, Some(k_upper), depth, tolerance, weights, true),
            || oct_tree_partition_private(upper, end, depth, tolerance, &mut upper_weights, true),
        );
    } else {
        if nested_lower_split {
            oct_tree_partition_private(lower, Some(k_upper), depth, tolerance, weights, parallel);
        }
        if nested_upper_split {
            oct_tree_partition_private(upper, end, depth, tolerance, weights, parallel);
        }
    }
}

/// Check that `cuts` starts at the root and is strictly increasing.
pub fn check_cuts(cuts: &[OctTreeKey]) -> Result<()> {
    match cuts.first() {
        Some(first) if *first == ROOT => {}
        _ => return Err(Error::BadCutArray(ROOT)),
    }

    for (process, pair) in cuts.windows(2).enumerate() {
        if pair[0] >= pair[1] {
            return Err(Error::UnsortedCuts {
                process: process + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(())
}

/// Partition the weight tree of `config.depth` levels over `nprocs` processes.
///
/// `weights` must hold `2 * oct_tree_size(config.depth)` finite, non-negative values with
/// the own weight of every node at its even slot. Descendant slots are overwritten.
/// Returns the first key owned by each process, starting with the root key.
pub fn oct_tree_partition(
    nprocs: usize,
    config: &PartitionConfig,
    weights: &mut [WeightType],
) -> Result<Vec<OctTreeKey>> {
    check_weights(config.depth, weights)?;

    if nprocs == 0 {
        return Err(Error::NoProcesses);
    }

    let nodes = oct_tree_size(config.depth);
    if nprocs > nodes {
        return Err(Error::TooManyProcesses {
            nprocs,
            nodes,
            depth: config.depth,
        });
    }

    let mut cuts = vec![ROOT; nprocs];
    oct_tree_partition_private(
        &mut cuts,
        None,
        config.depth,
        config.tolerance,
        weights,
        config.parallel,
    );

    check_cuts(&cuts)?;

    debug!(
        "partitioned a depth {} tree over {} processes (tolerance {:e}, parallel: {})",
        config.depth, nprocs, config.tolerance, config.parallel
    );

    Ok(cuts)
}
