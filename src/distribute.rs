//! Partitioning of weighted boxes over processes.
//!
//! Steps:
//! ------
//! 1) Cover every box with oct-tree cells and add its weight to the covering keys.
//! 2) Accumulate the weights and bisect the key range recursively.
//! 3) Look up the owning processes of keys and boxes in the resulting cut array.

use std::ops::RangeInclusive;

use itertools::Itertools;
use log::{debug, warn};

use crate::{
    constants::ROOT,
    error::{Error, Result},
    lookup::processor,
    partition::{check_cuts, oct_tree_partition, PartitionConfig},
    types::{domain::Domain, key::OctTreeKey, Bounds, WeightType},
    weights::{calculate_key_using_offset, oct_tree_offset, oct_tree_size, OctTreeWeights},
};

/// Add the weight of every box to each key of its covering.
///
/// Returns the number of boxes that had to be clipped to the domain.
pub fn add_box_weights(
    domain: &Domain,
    boxes: &[(Bounds, WeightType)],
    weights: &mut OctTreeWeights,
) -> Result<usize> {
    let mut inexact = 0;

    for (small_box, weight) in boxes.iter() {
        let covering = domain.covering(small_box)?;
        if !covering.is_exact() {
            inexact += 1;
        }
        for key in covering.keys() {
            weights.add(key, *weight);
        }
    }

    if inexact > 0 {
        warn!(
            "{} of {} boxes reach outside of the domain {:?}",
            inexact,
            boxes.len(),
            domain.bounds
        );
    }

    Ok(inexact)
}

/// Weight tree of `depth` levels holding the weights of `boxes`.
pub fn box_weights(
    domain: &Domain,
    boxes: &[(Bounds, WeightType)],
    depth: u32,
) -> Result<OctTreeWeights> {
    let mut weights = OctTreeWeights::new(depth)?;
    add_box_weights(domain, boxes, &mut weights)?;
    Ok(weights)
}

/// A partition of the key space over processes.
#[derive(Clone, Debug, PartialEq)]
pub struct OctTreePartition {
    depth: u32,
    cuts: Vec<OctTreeKey>,
}

impl OctTreePartition {
    /// Wrap a cut array computed for a tree of `depth` levels.
    pub fn new(depth: u32, cuts: Vec<OctTreeKey>) -> Result<Self> {
        check_cuts(&cuts)?;
        Ok(OctTreePartition { depth, cuts })
    }

    /// First key of every process.
    pub fn cuts(&self) -> &[OctTreeKey] {
        &self.cuts
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn nprocs(&self) -> usize {
        self.cuts.len()
    }

    /// Process owning `key`.
    pub fn owner(&self, key: &OctTreeKey) -> Result<usize> {
        processor(&self.cuts, key)
    }

    /// Processes owning a node of the subtree of `key`.
    ///
    /// A subtree is contiguous in key order, so its owners run from the owner of `key` to the
    /// owner of its last descendant on the partition depth. Keys deeper than the partition
    /// lie in a single leaf and have one owner.
    pub fn owners_of_subtree(&self, key: &OctTreeKey) -> Result<RangeInclusive<usize>> {
        let first = self.owner(key)?;

        let node = key.truncate(self.depth);
        let ord_last =
            oct_tree_offset(self.depth, &node) + oct_tree_size(self.depth - node.depth()) - 1;
        let last = self.owner(&calculate_key_using_offset(self.depth, ord_last))?;

        Ok(first..=last)
    }

    /// Processes owning any part of `small_box`, in increasing order.
    pub fn owners_of_box(&self, domain: &Domain, small_box: &Bounds) -> Result<Vec<usize>> {
        let covering = domain.covering(small_box)?;

        let mut owners = Vec::new();
        for key in covering.keys() {
            owners.extend(self.owners_of_subtree(key)?);
        }
        Ok(owners.into_iter().sorted().dedup().collect())
    }

    /// Key range `[first, end)` of `process`, `None` marking the end of the tree.
    pub fn key_range(&self, process: usize) -> Result<(OctTreeKey, Option<OctTreeKey>)> {
        let first = *self
            .cuts
            .get(process)
            .ok_or(Error::InvalidProcess(process))?;
        Ok((first, self.cuts.get(process + 1).copied()))
    }

    /// Own weight of all nodes owned by each process.
    pub fn process_loads(&self, weights: &OctTreeWeights) -> Result<Vec<WeightType>> {
        let mut loads = vec![0.0; self.nprocs()];

        // Offsets run in key order, so the owner only ever advances.
        let mut process = 0;
        for offset in 0..weights.nnodes() {
            let key = calculate_key_using_offset(weights.depth(), offset);
            while process + 1 < self.cuts.len() && self.cuts[process + 1] <= key {
                process += 1;
            }
            loads[process] += weights.own(&key);
        }

        Ok(loads)
    }
}

/// Partition `boxes`, weighted, over `nprocs` processes.
pub fn partition_boxes(
    domain: &Domain,
    boxes: &[(Bounds, WeightType)],
    nprocs: usize,
    config: &PartitionConfig,
) -> Result<OctTreePartition> {
    let mut weights = box_weights(domain, boxes, config.depth)?;
    let total = weights.total();

    let cuts = oct_tree_partition(nprocs, config, weights.as_mut_slice())?;

    debug!(
        "partitioned {} boxes of total weight {} over {} processes",
        boxes.len(),
        total,
        nprocs
    );

    debug_assert_eq!(cuts.first(), Some(&ROOT));
    OctTreePartition::new(config.depth, cuts)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use rand::prelude::*;
    use rand::SeedableRng;

    const UNIT: Bounds = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

    fn boxes_fixture(nboxes: usize) -> Vec<(Bounds, WeightType)> {
        let mut rng = StdRng::seed_from_u64(0);
        (0..nboxes)
            .map(|_| {
                let extent = rng.gen_range(0.001..0.05);
                let mut b = [0.0; 6];
                for axis in 0..3 {
                    b[axis] = rng.gen_range(0.0..(1.0 - extent));
                    b[axis + 3] = b[axis] + extent;
                }
                (b, rng.gen_range(1.0..2.0))
            })
            .collect()
    }

    /// One box strictly inside each octant of the unit cube.
    fn octant_boxes() -> Vec<(Bounds, WeightType)> {
        (0..8)
            .map(|octant| {
                let offset = |axis: usize| if octant & (1 << axis) != 0 { 0.5 } else { 0.0 };
                let low = [offset(0) + 0.1, offset(1) + 0.1, offset(2) + 0.1];
                ([low[0], low[1], low[2], low[0] + 0.3, low[1] + 0.3, low[2] + 0.3], 1.0)
            })
            .collect()
    }

    #[test]
    fn test_add_box_weights() {
        let domain = Domain::new(UNIT);
        let boxes = boxes_fixture(100);
        let mut weights = OctTreeWeights::new(3).unwrap();
        let inexact = add_box_weights(&domain, &boxes, &mut weights).unwrap();
        assert_eq!(inexact, 0);

        let expected: f64 = boxes
            .iter()
            .map(|(b, w)| w * domain.covering(b).unwrap().len() as f64)
            .sum();
        assert_relative_eq!(weights.total(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_inexact_boxes_are_counted() {
        let domain = Domain::new(UNIT);
        let boxes = vec![
            ([0.2, 0.2, 0.2, 0.3, 0.3, 0.3], 1.0),
            ([0.9, 0.9, 0.9, 1.5, 1.5, 1.5], 1.0),
        ];
        let mut weights = OctTreeWeights::new(2).unwrap();
        assert_eq!(add_box_weights(&domain, &boxes, &mut weights).unwrap(), 1);
    }

    #[test]
    fn test_one_box_per_process() {
        let domain = Domain::new(UNIT);
        let boxes = octant_boxes();
        let partition = partition_boxes(&domain, &boxes, 8, &PartitionConfig::default()).unwrap();

        let owners: Vec<usize> = boxes
            .iter()
            .map(|(b, _)| {
                let owners = partition.owners_of_box(&domain, b).unwrap();
                assert_eq!(owners.len(), 1);
                owners[0]
            })
            .sorted()
            .collect();
        assert_eq!(owners, (0..8).collect::<Vec<usize>>());

        let weights = box_weights(&domain, &boxes, partition.depth()).unwrap();
        assert_eq!(partition.process_loads(&weights).unwrap(), vec![1.0; 8]);
    }

    #[test]
    fn test_key_range() {
        let domain = Domain::new(UNIT);
        let partition =
            partition_boxes(&domain, &boxes_fixture(500), 4, &PartitionConfig::default()).unwrap();

        let (first, end) = partition.key_range(0).unwrap();
        assert_eq!(first, ROOT);
        assert_eq!(end, Some(partition.cuts()[1]));

        let (first, end) = partition.key_range(3).unwrap();
        assert_eq!(first, partition.cuts()[3]);
        assert_eq!(end, None);

        assert_eq!(partition.key_range(4), Err(Error::InvalidProcess(4)));
    }

    #[test]
    fn test_process_loads_conserve_weight() {
        let domain = Domain::new(UNIT);
        let boxes = boxes_fixture(1000);
        let config = PartitionConfig::default();
        let partition = partition_boxes(&domain, &boxes, 6, &config).unwrap();

        let weights = box_weights(&domain, &boxes, config.depth).unwrap();
        let loads = partition.process_loads(&weights).unwrap();

        assert_eq!(loads.len(), 6);
        assert_relative_eq!(loads.iter().sum::<f64>(), weights.total(), epsilon = 1e-6);
        assert!(loads.iter().all(|&load| load > 0.0));
    }

    #[test]
    fn test_owners_are_consistent_with_lookup() {
        let domain = Domain::new(UNIT);
        let boxes = boxes_fixture(200);
        let partition = partition_boxes(&domain, &boxes, 5, &PartitionConfig::default()).unwrap();

        for (b, _) in boxes.iter() {
            let owners = partition.owners_of_box(&domain, b).unwrap();
            assert!(!owners.is_empty());
            assert!(owners.windows(2).all(|w| w[0] < w[1]));

            let low = OctTreeKey::from_point(&[b[0], b[1], b[2]], &domain);
            assert!(owners.contains(&partition.owner(&low).unwrap()));
        }
    }

    #[test]
    fn test_owners_of_subtree() {
        let depth = 2;
        let cuts = vec![
            ROOT,
            OctTreeKey::from_digits(&[2, 4]),
            OctTreeKey::from_digits(&[3]),
            OctTreeKey::from_digits(&[3, 1]),
        ];
        let partition = OctTreePartition::new(depth, cuts).unwrap();

        assert_eq!(partition.owners_of_subtree(&ROOT).unwrap(), 0..=3);
        assert_eq!(partition.owners_of_subtree(&ROOT.child(1)).unwrap(), 0..=0);
        assert_eq!(partition.owners_of_subtree(&ROOT.child(2)).unwrap(), 0..=1);
        assert_eq!(partition.owners_of_subtree(&ROOT.child(3)).unwrap(), 2..=3);
        assert_eq!(partition.owners_of_subtree(&ROOT.child(8)).unwrap(), 3..=3);

        // Below the partition depth a key has the single owner of its leaf.
        let deep = OctTreeKey::from_digits(&[2, 4, 8, 8]);
        assert_eq!(partition.owners_of_subtree(&deep).unwrap(), 1..=1);
    }

    #[test]
    fn test_large_box_reaches_every_owner() {
        let domain = Domain::new(UNIT);

        // A regular grid of small boxes spreads the weight evenly.
        let n = 20;
        let h = 1.0 / n as f64;
        let boxes: Vec<(Bounds, WeightType)> = (0..n * n * n)
            .map(|i| {
                let low = [(i % n) as f64 * h, (i / n % n) as f64 * h, (i / (n * n)) as f64 * h];
                let b = [
                    low[0] + 0.2 * h,
                    low[1] + 0.2 * h,
                    low[2] + 0.2 * h,
                    low[0] + 0.8 * h,
                    low[1] + 0.8 * h,
                    low[2] + 0.8 * h,
                ];
                (b, 1.0)
            })
            .collect();

        let partition =
            partition_boxes(&domain, &boxes, 64, &PartitionConfig::for_processes(64)).unwrap();

        let large_box = [0.05, 0.05, 0.05, 0.35, 0.35, 0.35];
        let owners = partition.owners_of_box(&domain, &large_box).unwrap();
        assert!(owners.len() > 1);
        assert!(owners.windows(2).all(|w| w[0] < w[1]));

        let steps = 12;
        for i in 0..=steps {
            for j in 0..=steps {
                for k in 0..=steps {
                    let at = |step: usize| 0.05 + 0.3 * step as f64 / steps as f64;
                    let key = OctTreeKey::from_point(&[at(i), at(j), at(k)], &domain);
                    let owner = partition.owner(&key).unwrap();
                    assert!(
                        owners.contains(&owner),
                        "process {} owns a part of the box but is not in {:?}",
                        owner,
                        owners
                    );
                }
            }
        }
    }

    #[test]
    fn test_new_rejects_bad_cuts() {
        let a = OctTreeKey::from_digits(&[3]);
        assert_eq!(
            OctTreePartition::new(2, vec![a]),
            Err(Error::BadCutArray(ROOT))
        );
        assert!(OctTreePartition::new(2, vec![ROOT, a]).is_ok());
    }
}
