//! C API for partitions and owner lookup

use std::slice::{from_raw_parts, from_raw_parts_mut};

use crate::{
    c_api::Status,
    lookup,
    partition::{self, PartitionConfig},
    types::{
        key::{KeyType, OctTreeKey},
        WeightType,
    },
};

/// Partition a weight tree of `depth` levels over `nprocs` processes, writing the packed
/// cut keys to `p_cuts`, which must hold `nprocs` keys.
#[no_mangle]
pub extern "C" fn partition_oct_tree(
    nprocs: usize,
    depth: u32,
    tolerance: f64,
    parallel: bool,
    p_weights: *mut WeightType,
    nweights: usize,
    p_cuts: *mut KeyType,
) -> Status {
    if p_weights.is_null() || p_cuts.is_null() {
        return Status::NullPointer;
    }

    let weights = unsafe { from_raw_parts_mut(p_weights, nweights) };
    let config = PartitionConfig {
        depth,
        tolerance,
        parallel,
    };

    match partition::oct_tree_partition(nprocs, &config, weights) {
        Ok(cuts) => {
            let out = unsafe { from_raw_parts_mut(p_cuts, nprocs) };
            for (slot, cut) in out.iter_mut().zip(cuts.iter()) {
                *slot = cut.value();
            }
            Status::Ok
        }
        Err(e) => Status::from(&e),
    }
}

/// Write the process owning the packed `key` to `p_process`.
#[no_mangle]
pub extern "C" fn partition_processor(
    p_cuts: *const KeyType,
    ncuts: usize,
    key: KeyType,
    p_process: *mut usize,
) -> Status {
    if p_cuts.is_null() || p_process.is_null() {
        return Status::NullPointer;
    }

    let values = unsafe { from_raw_parts(p_cuts, ncuts) };
    let cuts: Option<Vec<OctTreeKey>> = values.iter().map(|&v| OctTreeKey::from_value(v)).collect();

    let (cuts, key) = match (cuts, OctTreeKey::from_value(key)) {
        (Some(cuts), Some(key)) => (cuts, key),
        _ => return Status::InvalidKey,
    };

    match lookup::processor(&cuts, &key) {
        Ok(process) => {
            unsafe { *p_process = process };
            Status::Ok
        }
        Err(e) => Status::from(&e),
    }
}
