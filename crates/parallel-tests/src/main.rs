use mpi::{topology::SystemCommunicator, traits::*};

use rand::prelude::*;
use rand::SeedableRng;

use rusty_partition::{
    constants::ROOT,
    distribute::{partition_boxes, OctTreePartition},
    distributed::{global_domain, partition_boxes_distributed},
    partition::PartitionConfig,
    types::{domain::Domain, key::OctTreeKey, Bounds, WeightType},
};

const NBOXES: usize = 10000;

/// Boxes of all processes, every process generates the same set.
fn boxes_fixture() -> Vec<(Bounds, WeightType)> {
    let mut range = StdRng::seed_from_u64(0);
    let between = rand::distributions::Uniform::from(0.0..1.0);

    (0..NBOXES)
        .map(|_| {
            let extent = 0.01 * between.sample(&mut range);
            let mut b = [0.0; 6];
            for axis in 0..3 {
                b[axis] = between.sample(&mut range);
                b[axis + 3] = b[axis] + extent;
            }
            (b, 1.0)
        })
        .collect()
}

/// The share of the boxes held by `rank`.
fn local_boxes(boxes: &[(Bounds, WeightType)], rank: usize, size: usize) -> Vec<(Bounds, WeightType)> {
    boxes
        .iter()
        .enumerate()
        .filter(|(index, _)| index % size == rank)
        .map(|(_, b)| *b)
        .collect()
}

/// Test that the global domain is the union of the boxes of all processes.
fn test_global_domain(world: &SystemCommunicator, boxes: &[(Bounds, WeightType)]) {
    let local = local_boxes(boxes, world.rank() as usize, world.size() as usize);
    let domain = global_domain(local.iter().map(|(b, _)| b), world).unwrap();
    let expected = Domain::from_boxes(boxes.iter().map(|(b, _)| b)).unwrap();
    assert_eq!(domain, expected);
}

/// Test that the distributed partition is the serial partition of all boxes.
fn test_matches_serial(world: &SystemCommunicator, boxes: &[(Bounds, WeightType)]) -> OctTreePartition {
    let size = world.size() as usize;
    let config = PartitionConfig::for_processes(size);

    let local = local_boxes(boxes, world.rank() as usize, size);
    let distributed = partition_boxes_distributed(&local, &config, world).unwrap();

    let domain = Domain::from_boxes(boxes.iter().map(|(b, _)| b)).unwrap();
    let serial = partition_boxes(&domain, boxes, size, &config).unwrap();

    assert_eq!(distributed.nprocs(), size);
    assert_eq!(distributed.cuts()[0], ROOT);
    assert_eq!(distributed.cuts(), serial.cuts());
    distributed
}

/// Test that every process received the same cuts.
fn test_identical_cuts(world: &SystemCommunicator, partition: &OctTreePartition) {
    let mut root_cuts = partition.cuts().to_vec();
    world.process_at_rank(0).broadcast_into(&mut root_cuts[..]);
    assert_eq!(root_cuts, partition.cuts());

    // Keys survive the round trip through the derived datatype.
    let mut key = if world.rank() == 0 {
        OctTreeKey::from_digits(&[3, 1, 4, 1, 5])
    } else {
        OctTreeKey::default()
    };
    world.process_at_rank(0).broadcast_into(&mut key);
    assert_eq!(key, OctTreeKey::from_digits(&[3, 1, 4, 1, 5]));
}

fn main() {
    let universe = mpi::initialize().unwrap();
    let world = universe.world();
    let boxes = boxes_fixture();

    test_global_domain(&world, &boxes);
    let partition = test_matches_serial(&world, &boxes);
    test_identical_cuts(&world, &partition);

    if world.rank() == 0 {
        println!("parallel tests passed on {} processes", world.size());
    }
}
