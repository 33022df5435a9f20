//! Crate wide constants
use const_env::from_env;

use crate::types::key::{KeyType, OctTreeKey};

/// Deepest level of an `OctTreeKey`. Can be lowered at build time through the
/// `RUSTY_PARTITION_MAX_DEPTH` environment variable.
#[from_env("RUSTY_PARTITION_MAX_DEPTH")]
pub const MAX_DEPTH: u32 = 16;

/// Number of bits holding the child index of one level.
pub const BITS_PER_INDEX: u32 = 4;

/// Number of bits in a packed key.
pub const BITS_PER_WORD: u32 = KeyType::BITS;

/// Mask selecting a single child index.
pub const MASK_INDEX: KeyType = 0x0f;

/// Number of children of an octree node.
pub const NSIBLINGS: u32 = 8;

/// Slack keeping normalised box coordinates strictly inside the unit cube.
pub const COVERING_EPSILON: f64 = f32::EPSILON as f64;

/// Depth of the weight tree used when partitioning with the default configuration.
pub const DEFAULT_PARTITION_DEPTH: u32 = 4;

/// Deepest weight tree the default configuration grows to for large process counts.
pub const MAX_PARTITION_DEPTH: u32 = 7;

/// Deepest weight tree that is allocated. A tree of depth 7 already holds about 2.4e6 nodes.
pub const MAX_WEIGHT_DEPTH: u32 = if MAX_PARTITION_DEPTH < MAX_DEPTH {
    MAX_PARTITION_DEPTH
} else {
    MAX_DEPTH
};

/// Default relative tolerance on the lower/upper weight ratio.
pub const DEFAULT_TOLERANCE: f64 = 1.0e-3;

pub const ROOT: OctTreeKey = OctTreeKey { value: 0 };

const _: () = assert!(MAX_DEPTH >= 1 && MAX_DEPTH * BITS_PER_INDEX <= BITS_PER_WORD);
