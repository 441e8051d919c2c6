use glam::{Mat4, Vec3};

const DEGENERATE_EXTENT: f32 = 1.0e-6;

/// Offsets from the box centre to each of the eight corners, in half-extent units.
pub const CORNER_OFFSETS: [Vec3; 8] = [
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(-1.0, 1.0, 1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(1.0, 1.0, -1.0),
    Vec3::new(1.0, -1.0, 1.0),
];

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const UNIT_CUBE: Self = Self {
        min: Vec3::splat(-0.5),
        max: Vec3::splat(0.5),
    };

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let center = self.center();
        let half = self.half_extents();
        CORNER_OFFSETS.map(|offset| center + half * offset)
    }

    pub fn transformed(&self, matrix: Mat4) -> Self {
        let corners = self.corners().map(|corner| matrix.transform_point3(corner));
        let mut bounds = Self {
            min: corners[0],
            max: corners[0],
        };
        for corner in &corners[1..] {
            bounds.min = bounds.min.min(*corner);
            bounds.max = bounds.max.max(*corner);
        }
        bounds
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Non-finite, inverted, or collapsed to a point.
    pub fn is_degenerate(&self) -> bool {
        if !self.min.is_finite() || !self.max.is_finite() {
            return true;
        }
        let size = self.max - self.min;
        if size.cmplt(Vec3::ZERO).any() {
            return true;
        }
        size.max_element() <= DEGENERATE_EXTENT
    }
}
