//! Axis-aligned bounds over flat position buffers.
//! Used by consumers to center a model and pick a camera distance.

use glam::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extents {
    pub min: Vec3,
    pub max: Vec3,
}

impl Extents {
    /// Bounds of a flat `xyz xyz ...` buffer. Trailing partial tuples are ignored.
    /// Returns `None` when there is no complete position.
    pub fn from_positions(positions: &[f32]) -> Option<Self> {
        positions
            .chunks_exact(3)
            .map(Vec3::from_slice)
            .fold(None, |acc: Option<Self>, p| {
                Some(match acc {
                    None => Self { min: p, max: p },
                    Some(e) => Self {
                        min: e.min.min(p),
                        max: e.max.max(p),
                    },
                })
            })
    }

    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        self.min + self.size() * 0.5
    }

    /// Translation that moves the center to the origin.
    #[inline]
    pub fn recentering_offset(&self) -> Vec3 {
        -self.center()
    }

    /// Length of the box diagonal.
    #[inline]
    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }
}
