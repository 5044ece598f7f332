//! Axis-aligned bounding volumes.

use crate::math::Vec3;

/// Axis-aligned bounding box stored as center and half extents.
///
/// The default box is degenerate: zero center, zero extents.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    /// Center of the box.
    pub center: Vec3,
    /// Half size along each axis. Never negative.
    pub extents: Vec3,
}

impl BoundingBox {
    /// Create a box from its center and half extents.
    pub fn new(center: Vec3, extents: Vec3) -> Self {
        Self {
            center,
            extents: extents.abs(),
        }
    }

    /// Create the tightest box around two corner points.
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        let lo = min.inf(&max);
        let hi = min.sup(&max);
        Self {
            center: (lo + hi) * 0.5,
            extents: (hi - lo) * 0.5,
        }
    }

    /// Create the tightest box containing every point.
    ///
    /// Returns `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p)));
        Some(Self::from_min_max(min, max))
    }

    /// Minimum corner.
    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    /// Maximum corner.
    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    /// Check whether a point lies inside or on the boundary.
    pub fn contains(&self, point: &Vec3) -> bool {
        let d = (point - self.center).abs();
        d.x <= self.extents.x && d.y <= self.extents.y && d.z <= self.extents.z
    }

    /// Smallest box containing both boxes.
    pub fn merged(&self, other: &BoundingBox) -> BoundingBox {
        Self::from_min_max(self.min().inf(&other.min()), self.max().sup(&other.max()))
    }
}
