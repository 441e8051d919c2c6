use glam::{Mat4, Vec3};

use crate::bounds::Aabb;
use crate::camera::Camera;

/// Box in viewport space: x/y are 0..1 across the screen, z is view depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSpaceBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for ScreenSpaceBounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl ScreenSpaceBounds {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn add_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Projects the eight corners of `bounds` (given in the local space of
    /// `world_from_local`) through `camera`.
    ///
    /// Corners at or behind the eye are pushed to the screen edge they wrap
    /// towards instead of being dropped, so a surface the camera is partly
    /// inside still spans the screen. If no corner is in front of the eye
    /// the result is empty.
    pub fn from_local_bounds(bounds: &Aabb, world_from_local: Mat4, camera: &Camera) -> Self {
        let mut result = Self::EMPTY;
        let mut any_in_front = false;

        for corner in bounds.corners() {
            let world = world_from_local.transform_point3(corner);
            let mut viewport = camera.world_to_viewport(world);
            if !viewport.is_finite() {
                continue;
            }

            if viewport.z > 0.0 {
                any_in_front = true;
            } else {
                // The perspective divide mirrors points behind the eye.
                viewport.x = if viewport.x <= 0.5 { 1.0 } else { 0.0 };
                viewport.y = if viewport.y <= 0.5 { 1.0 } else { 0.0 };
            }
            result.add_point(viewport);
        }

        if !any_in_front {
            return Self::EMPTY;
        }
        result
    }

    pub fn overlaps(&self, other: &ScreenSpaceBounds) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        !(self.min.x > other.max.x
            || self.max.x < other.min.x
            || self.min.y > other.max.y
            || self.max.y < other.min.y
            || self.min.z > other.max.z
            || self.max.z < other.min.z)
    }

    pub fn overlaps_viewport_rect(&self, other: &ScreenSpaceBounds) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        !(self.min.x > other.max.x
            || self.max.x < other.min.x
            || self.min.y > other.max.y
            || self.max.y < other.min.y)
    }

    pub fn clipped_to_viewport(&self) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }
        let clipped = Self {
            min: Vec3::new(self.min.x.max(0.0), self.min.y.max(0.0), self.min.z),
            max: Vec3::new(self.max.x.min(1.0), self.max.y.min(1.0), self.max.z),
        };
        if clipped.is_empty() {
            Self::EMPTY
        } else {
            clipped
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        !self.is_empty() && point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Whether `far` can be seen through `near` in what `camera` captures: both
/// projected rectangles are clipped to the viewport and must intersect.
/// Symmetric in its two surface arguments.
pub fn portal_screens_overlap(
    near: (&Aabb, Mat4),
    far: (&Aabb, Mat4),
    camera: &Camera,
) -> bool {
    let near = ScreenSpaceBounds::from_local_bounds(near.0, near.1, camera).clipped_to_viewport();
    let far = ScreenSpaceBounds::from_local_bounds(far.0, far.1, camera).clipped_to_viewport();
    near.overlaps_viewport_rect(&far)
}
