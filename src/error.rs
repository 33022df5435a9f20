//! Error type of the crate.

use crate::{constants::MAX_WEIGHT_DEPTH, types::key::OctTreeKey};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("box covering failed: depth determination logic error on axis {axis} (cells {low} and {up} at depth {depth}), global box and scale disagree")]
    DepthDetermination {
        axis: usize,
        low: u64,
        up: u64,
        depth: u32,
    },

    #[error("bad cut-key array: no cut precedes key {0}")]
    BadCutArray(OctTreeKey),

    #[error("tree depth {0} outside of 1..={}", MAX_WEIGHT_DEPTH)]
    InvalidDepth(u32),

    #[error("weight array holds {actual} values, a tree of depth {depth} needs {expected}")]
    WeightArraySize {
        depth: u32,
        expected: usize,
        actual: usize,
    },

    #[error("weight {value} at offset {offset} is negative or not finite")]
    InvalidWeight { offset: usize, value: f64 },

    #[error("cannot partition over zero processes")]
    NoProcesses,

    #[error("{nprocs} processes exceed the {nodes} nodes of a tree of depth {depth}")]
    TooManyProcesses {
        nprocs: usize,
        nodes: usize,
        depth: u32,
    },

    #[error("cut keys are not strictly increasing at process {process}: {previous} >= {current}")]
    UnsortedCuts {
        process: usize,
        previous: OctTreeKey,
        current: OctTreeKey,
    },

    #[error("process {0} is outside of the partition")]
    InvalidProcess(usize),

    #[error("no process holds a box, the global domain is empty")]
    EmptyDomain,
}

pub type Result<T> = std::result::Result<T, Error>;
