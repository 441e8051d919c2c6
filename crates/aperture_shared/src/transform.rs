use std::ops::Mul;

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Rigid transform: rotation followed by translation, no scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation: normalize_rotation(rotation),
        }
    }

    pub fn from_translation(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Yaw about +Y, then pitch about +X, then roll about +Z (all radians).
    pub fn from_euler(position: Vec3, yaw: f32, pitch: f32, roll: f32) -> Self {
        Self::new(position, Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll))
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            position: rotation * -self.position,
            rotation,
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// Facing axis of a portal-like surface (local +Z).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Viewing direction of a camera (local -Z, right-handed).
    pub fn camera_forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f32) -> bool {
        self.position.abs_diff_eq(other.position, max_abs_diff)
            && (self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
                || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff))
    }
}

impl Mul for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Pose {
        Pose {
            position: self.transform_point(rhs.position),
            rotation: normalize_rotation(self.rotation * rhs.rotation),
        }
    }
}

/// Maps poses expressed relative to `from` onto the same relative pose about `to`.
pub fn pairing_pose(from: &Pose, to: &Pose) -> Pose {
    *to * from.inverse()
}

fn normalize_rotation(rotation: Quat) -> Quat {
    let normalized = rotation.normalize();
    if normalized.is_finite() {
        normalized
    } else {
        Quat::IDENTITY
    }
}

/// Which side of an oriented plane a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Back,
    On,
    Front,
}

impl Side {
    pub fn of_offset(offset: Vec3, normal: Vec3) -> Self {
        let distance = offset.dot(normal);
        if distance > 0.0 {
            Self::Front
        } else if distance < 0.0 {
            Self::Back
        } else {
            Self::On
        }
    }

    pub fn of_point(point: Vec3, plane: &Pose) -> Self {
        Self::of_offset(point - plane.position, plane.forward())
    }

    pub fn sign(self) -> f32 {
        match self {
            Self::Back => -1.0,
            Self::On => 0.0,
            Self::Front => 1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Back => Self::Front,
            Self::On => Self::On,
            Self::Front => Self::Back,
        }
    }
}
