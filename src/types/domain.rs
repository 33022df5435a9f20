//! The global box against which all boxes are indexed.

use crate::types::{Bounds, PointType};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Domain {
    /// `[xlo, ylo, zlo, xhi, yhi, zhi]`
    pub bounds: Bounds,
}

impl Domain {
    pub fn new(bounds: Bounds) -> Self {
        Domain { bounds }
    }

    /// Smallest domain containing every box in `boxes`.
    ///
    /// Returns `None` for an empty set of boxes.
    pub fn from_boxes<'a, I>(boxes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Bounds>,
    {
        let mut iter = boxes.into_iter();
        let first = *iter.next()?;

        let bounds = iter.fold(first, |mut acc, b| {
            for axis in 0..3 {
                acc[axis] = acc[axis].min(b[axis]);
                acc[axis + 3] = acc[axis + 3].max(b[axis + 3]);
            }
            acc
        });

        Some(Domain { bounds })
    }

    /// Lower corner.
    pub fn origin(&self) -> [PointType; 3] {
        [self.bounds[0], self.bounds[1], self.bounds[2]]
    }

    /// Extent along each axis.
    pub fn diameter(&self) -> [PointType; 3] {
        [
            self.bounds[3] - self.bounds[0],
            self.bounds[4] - self.bounds[1],
            self.bounds[5] - self.bounds[2],
        ]
    }

    /// Normalisation factor mapping the largest extent onto the unit interval.
    ///
    /// A degenerate domain of zero extent is given a unit scale.
    pub fn scale(&self) -> PointType {
        let max_diameter = self.diameter().into_iter().fold(0.0, PointType::max);
        if max_diameter > 0.0 {
            1.0 / max_diameter
        } else {
            1.0
        }
    }
}
