use aperture_shared::bounds::Aabb;
use aperture_shared::transform::Pose;
use glam::Vec3;

use crate::shading::SliceParams;
use crate::world::{PortalId, TravellerId};

#[derive(Debug, Clone, PartialEq)]
pub struct PortalTraveller {
    pub name: String,
    pub pose: Pose,
    pub velocity: Vec3,
    pub half_extents: Vec3,
    pub original_slice: SliceParams,
    pub clone_slice: SliceParams,
}

impl PortalTraveller {
    pub fn new(name: impl Into<String>, pose: Pose) -> Self {
        Self {
            name: name.into(),
            pose,
            velocity: Vec3::ZERO,
            half_extents: Vec3::splat(0.5),
            original_slice: SliceParams::DISABLED,
            clone_slice: SliceParams::DISABLED,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_half_extents(mut self, half_extents: Vec3) -> Self {
        self.half_extents = half_extents.abs();
        self
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extents(self.pose.position, self.half_extents)
    }

    /// Moves the traveller to the far side and carries its velocity through
    /// the same rotation.
    pub fn apply_teleport(&mut self, teleport: &Teleport) {
        self.pose = teleport.pose;
        self.velocity = teleport.pairing.transform_vector(self.velocity);
    }

    pub fn clear_slices(&mut self) {
        self.original_slice = SliceParams::DISABLED;
        self.clone_slice = SliceParams::DISABLED;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphicsClone {
    pub pose: Pose,
}

/// A traveller inside a portal's threshold. Owns the clone for as long as
/// the traveller stays there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedTraveller {
    pub traveller: TravellerId,
    /// Traveller position minus portal position at the last update.
    pub previous_offset: Vec3,
    pub clone: GraphicsClone,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Teleport {
    pub traveller: TravellerId,
    pub from: PortalId,
    pub to: PortalId,
    pub pose: Pose,
    /// Rigid map from `from`'s frame to `to`'s frame.
    pub pairing: Pose,
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use aperture_shared::transform::{pairing_pose, Pose};
    use glam::{Quat, Vec3};

    use super::{PortalTraveller, Teleport};
    use crate::world::{PortalId, TravellerId};

    #[test]
    fn teleport_moves_pose_and_turns_velocity() {
        let from = Pose::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let to = Pose::new(Vec3::new(10.0, 0.0, 0.0), Quat::from_rotation_y(FRAC_PI_2));
        let pairing = pairing_pose(&from, &to);

        let mut traveller = PortalTraveller::new("crate", Pose::from_translation(Vec3::new(0.0, 0.0, -5.1)))
            .with_velocity(Vec3::new(0.0, 0.0, -2.0));
        let teleport = Teleport {
            traveller: TravellerId(0),
            from: PortalId(0),
            to: PortalId(1),
            pose: pairing * traveller.pose,
            pairing,
        };
        traveller.apply_teleport(&teleport);

        assert!(traveller.position().abs_diff_eq(Vec3::new(9.9, 0.0, 0.0), 1.0e-5));
        assert!(traveller.velocity.abs_diff_eq(Vec3::new(-2.0, 0.0, 0.0), 1.0e-5));
        assert!((traveller.velocity.length() - 2.0).abs() < 1.0e-5);
    }

    #[test]
    fn bounds_follow_the_traveller() {
        let traveller = PortalTraveller::new("box", Pose::from_translation(Vec3::new(1.0, 2.0, 3.0)))
            .with_half_extents(Vec3::new(-0.5, 1.0, 0.25));
        let bounds = traveller.bounds();
        assert_eq!(bounds.min, Vec3::new(0.5, 1.0, 2.75));
        assert_eq!(bounds.max, Vec3::new(1.5, 3.0, 3.25));
    }
}
