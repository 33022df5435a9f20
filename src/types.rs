//! Definition of basic types

pub mod domain;
pub mod key;

/// Floating point type of box coordinates.
pub type PointType = f64;

/// Floating point type of partition weights.
pub type WeightType = f64;

/// An axis-aligned box, `[xlo, ylo, zlo, xhi, yhi, zhi]`.
pub type Bounds = [PointType; 6];
