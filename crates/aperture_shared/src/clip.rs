//! Oblique near-plane alignment: skews a camera's projection so its near
//! plane lies on a portal surface instead of perpendicular to the view axis.

use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::camera::Camera;
use crate::transform::{Pose, Side};

const MIN_PLANE_DENOMINATOR: f32 = 1.0e-5;
const MIN_PLANE_NORMAL: f32 = 1.0e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearClipSettings {
    /// Pushes the clip plane towards the camera so the seam does not z-fight.
    #[serde(default = "default_offset")]
    pub offset: f32,
    /// Below this camera-to-plane distance the symmetric projection is kept.
    #[serde(default = "default_limit")]
    pub limit: f32,
}

impl Default for NearClipSettings {
    fn default() -> Self {
        Self {
            offset: default_offset(),
            limit: default_limit(),
        }
    }
}

fn default_offset() -> f32 {
    0.05
}

fn default_limit() -> f32 {
    0.2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearClipOutcome {
    Oblique,
    Unmodified,
}

/// Plane `(n, d)` in the camera's view space whose positive half-space is the
/// part of the world the camera should keep: the side of `plane` facing away
/// from the camera, plus a slab of width `offset` in front of it.
pub fn camera_space_clip_plane(camera: &Camera, plane: &Pose, offset: f32) -> Vec4 {
    let normal = plane.forward();
    let side = Side::of_offset(plane.position - camera.position(), normal).sign();

    let view = camera.view_matrix();
    let cam_position = view.transform_point3(plane.position);
    let cam_normal = view.transform_vector3(normal) * side;
    let cam_distance = -cam_position.dot(cam_normal) + offset;
    cam_normal.extend(cam_distance)
}

/// Replaces the near plane of a `[0, 1]` depth projection with `plane`
/// (view space), keeping the far corner of the frustum where it was.
/// Returns `None` when the plane is too close to edge-on to solve for.
pub fn oblique_projection(projection: Mat4, plane: Vec4) -> Option<Mat4> {
    let corner = projection.inverse()
        * Vec4::new(plane.x.signum(), plane.y.signum(), 1.0, 1.0);
    let denominator = plane.dot(corner);
    if !denominator.is_finite() || denominator.abs() < MIN_PLANE_DENOMINATOR {
        return None;
    }

    let row = plane / denominator;
    let mut m = projection.to_cols_array_2d();
    m[0][2] = row.x;
    m[1][2] = row.y;
    m[2][2] = row.z;
    m[3][2] = row.w;
    let oblique = Mat4::from_cols_array_2d(&m);
    oblique.is_finite().then_some(oblique)
}

/// Points `camera`'s near plane at `plane` if the camera is far enough from
/// it, otherwise restores the symmetric projection.
pub fn align_near_clip_plane(
    camera: &mut Camera,
    plane: &Pose,
    settings: &NearClipSettings,
) -> NearClipOutcome {
    let clip_plane = camera_space_clip_plane(camera, plane, settings.offset);
    let usable = clip_plane.truncate().length_squared() > MIN_PLANE_NORMAL
        && clip_plane.w.abs() > settings.limit;

    if usable {
        if let Some(projection) = oblique_projection(camera.perspective(), clip_plane) {
            camera.projection = projection;
            return NearClipOutcome::Oblique;
        }
    }

    trace!(distance = clip_plane.w, "near clip left symmetric");
    camera.reset_projection();
    NearClipOutcome::Unmodified
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use glam::{Quat, Vec3, Vec4};

    use super::{align_near_clip_plane, camera_space_clip_plane, NearClipOutcome, NearClipSettings};
    use crate::camera::Camera;
    use crate::transform::Pose;

    fn camera_at(position: Vec3) -> Camera {
        Camera::new(Pose::from_translation(position), 60.0_f32.to_radians(), 1.0, 0.1, 100.0)
    }

    fn ndc_depth(camera: &Camera, point: Vec3) -> f32 {
        let clip = camera.view_projection() * point.extend(1.0);
        clip.z / clip.w
    }

    #[test]
    fn distant_plane_clips_everything_in_front_of_it() {
        let mut camera = camera_at(Vec3::ZERO);
        let portal = Pose::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let outcome = align_near_clip_plane(&mut camera, &portal, &NearClipSettings::default());
        assert_eq!(outcome, NearClipOutcome::Oblique);

        // Between camera and portal: clipped.
        assert!(ndc_depth(&camera, Vec3::new(0.3, 0.2, -3.0)) < 0.0);
        assert!(ndc_depth(&camera, Vec3::new(0.3, 0.2, -4.9)) < 0.0);
        // Behind the portal: kept, in depth order.
        let just_beyond = ndc_depth(&camera, Vec3::new(0.3, 0.2, -6.0));
        let far_beyond = ndc_depth(&camera, Vec3::new(0.3, 0.2, -50.0));
        assert!(just_beyond > 0.0 && just_beyond < 1.0);
        assert!(far_beyond > just_beyond && far_beyond < 1.0);
    }

    #[test]
    fn point_on_offset_plane_lands_on_near_depth() {
        let mut camera = camera_at(Vec3::ZERO);
        let portal = Pose::from_translation(Vec3::new(0.0, 0.0, -5.0));
        align_near_clip_plane(&mut camera, &portal, &NearClipSettings::default());
        assert!(ndc_depth(&camera, Vec3::new(0.3, 0.2, -4.95)).abs() < 1.0e-4);
    }

    #[test]
    fn plane_orientation_does_not_change_the_clip_plane() {
        let camera = camera_at(Vec3::ZERO);
        let facing = Pose::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let facing_away = Pose::new(Vec3::new(0.0, 0.0, -5.0), Quat::from_rotation_y(PI));
        let a = camera_space_clip_plane(&camera, &facing, 0.05);
        let b = camera_space_clip_plane(&camera, &facing_away, 0.05);
        assert!(a.abs_diff_eq(b, 1.0e-5));
        assert!(a.abs_diff_eq(Vec4::new(0.0, 0.0, -1.0, -4.95), 1.0e-5));
    }

    #[test]
    fn plane_within_limit_keeps_default_projection() {
        let mut camera = camera_at(Vec3::ZERO);
        let far_portal = Pose::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let settings = NearClipSettings::default();
        align_near_clip_plane(&mut camera, &far_portal, &settings);
        assert_ne!(camera.projection, camera.perspective());

        let near_portal = Pose::from_translation(Vec3::new(0.0, 0.0, -0.1));
        let outcome = align_near_clip_plane(&mut camera, &near_portal, &settings);
        assert_eq!(outcome, NearClipOutcome::Unmodified);
        assert_eq!(camera.projection, camera.perspective());
    }

    #[test]
    fn camera_inside_plane_is_left_symmetric() {
        let mut camera = camera_at(Vec3::new(1.0, 0.0, -5.0));
        let portal = Pose::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let settings = NearClipSettings {
            offset: 0.5,
            limit: 0.2,
        };
        let outcome = align_near_clip_plane(&mut camera, &portal, &settings);
        assert_eq!(outcome, NearClipOutcome::Unmodified);
        assert!(camera.projection.is_finite());
    }

    #[test]
    fn rotated_camera_keeps_geometry_beyond_the_plane() {
        let camera_pose = Pose::new(Vec3::new(2.0, 0.5, 3.0), Quat::from_rotation_y(0.4));
        let mut camera = Camera::new(camera_pose, 60.0_f32.to_radians(), 1.5, 0.1, 100.0);
        let portal = Pose::new(Vec3::new(0.0, 0.0, -4.0), Quat::from_rotation_y(0.2));
        let outcome = align_near_clip_plane(&mut camera, &portal, &NearClipSettings::default());
        assert_eq!(outcome, NearClipOutcome::Oblique);

        let towards = portal.position - camera_pose.position;
        let beyond = portal.position + towards.normalize() * 2.0;
        let before = camera_pose.position + towards * 0.5;
        let beyond_depth = ndc_depth(&camera, beyond);
        assert!(beyond_depth > 0.0 && beyond_depth < 1.0);
        assert!(ndc_depth(&camera, before) < 0.0);
    }
}
