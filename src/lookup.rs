//! Mapping of keys to the process owning them.

use crate::{
    error::{Error, Result},
    types::key::OctTreeKey,
};

/// Index of the process owning `key` under the partition `cuts`.
///
/// `cuts` holds the first key of every process in increasing order. The owner is the last
/// process whose cut is not greater than `key`; keys deeper than the partition resolve to
/// the owner of their ancestor on the partition depth.
pub fn processor(cuts: &[OctTreeKey], key: &OctTreeKey) -> Result<usize> {
    match cuts.partition_point(|cut| cut <= key) {
        0 => Err(Error::BadCutArray(*key)),
        index => Ok(index - 1),
    }
}
