//! Partitioning of boxes distributed over MPI processes.
//!
//! Every process covers its local boxes, the weight trees are summed over all processes and
//! each process computes the same partition from the global weights.

use log::debug;
use memoffset::offset_of;
use mpi::{
    collective::SystemOperation,
    datatype::{Equivalence, UncommittedUserDatatype, UserDatatype},
    traits::*,
    Address,
};

use crate::{
    distribute::{add_box_weights, OctTreePartition},
    error::{Error, Result},
    partition::{oct_tree_partition, PartitionConfig},
    types::{
        domain::Domain,
        key::{KeyType, OctTreeKey},
        Bounds, PointType, WeightType,
    },
    weights::OctTreeWeights,
};

unsafe impl Equivalence for OctTreeKey {
    type Out = UserDatatype;
    fn equivalent_datatype() -> Self::Out {
        UserDatatype::structured(
            &[1],
            &[offset_of!(OctTreeKey, value) as Address],
            &[UncommittedUserDatatype::contiguous(1, &KeyType::equivalent_datatype()).as_ref()],
        )
    }
}

/// Union of the boxes of all processes, `None` if no process holds a box.
pub fn global_domain<'a, I, C>(local_boxes: I, comm: &C) -> Option<Domain>
where
    I: IntoIterator<Item = &'a Bounds>,
    C: CommunicatorCollectives,
{
    let mut low = [PointType::MAX; 3];
    let mut up = [PointType::MIN; 3];

    for b in local_boxes {
        for axis in 0..3 {
            low[axis] = low[axis].min(b[axis]);
            up[axis] = up[axis].max(b[axis + 3]);
        }
    }

    let mut global_low = [0.0; 3];
    let mut global_up = [0.0; 3];
    comm.all_reduce_into(&low[..], &mut global_low[..], SystemOperation::min());
    comm.all_reduce_into(&up[..], &mut global_up[..], SystemOperation::max());

    if (0..3).any(|axis| global_up[axis] < global_low[axis]) {
        return None;
    }

    Some(Domain::new([
        global_low[0],
        global_low[1],
        global_low[2],
        global_up[0],
        global_up[1],
        global_up[2],
    ]))
}

/// Sum the own weights of `weights` over all processes.
pub fn all_reduce_weights<C: CommunicatorCollectives>(weights: &mut OctTreeWeights, comm: &C) {
    let local: Vec<WeightType> = weights.as_slice().to_vec();
    comm.all_reduce_into(&local[..], weights.as_mut_slice(), SystemOperation::sum());
}

/// Partition the boxes held by all processes of `comm` over those processes.
///
/// Collective: every process has to call it, and every process receives the same partition.
pub fn partition_boxes_distributed<C: CommunicatorCollectives>(
    local_boxes: &[(Bounds, WeightType)],
    config: &PartitionConfig,
    comm: &C,
) -> Result<OctTreePartition> {
    let nprocs = comm.size() as usize;
    let rank = comm.rank();

    let domain = global_domain(local_boxes.iter().map(|(b, _)| b), comm).ok_or(Error::EmptyDomain)?;

    let mut weights = OctTreeWeights::new(config.depth)?;
    add_box_weights(&domain, local_boxes, &mut weights)?;
    all_reduce_weights(&mut weights, comm);

    let mut cuts = oct_tree_partition(nprocs, config, weights.as_mut_slice())?;

    // Summation order may differ between processes, the root's cuts are authoritative.
    comm.process_at_rank(0).broadcast_into(&mut cuts[..]);

    debug!(
        "rank {} received a partition of {} local boxes over {} processes",
        rank,
        local_boxes.len(),
        nprocs
    );

    OctTreePartition::new(config.depth, cuts)
}
