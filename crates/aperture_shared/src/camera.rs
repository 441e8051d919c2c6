use glam::{Mat4, Vec3};

use crate::frustum::{extract_frustum_planes, FrustumPlanes};
use crate::transform::Pose;

const MIN_CLIP_W: f32 = 1.0e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pose: Pose,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Projection used for the next render. Starts symmetric; near-clip
    /// alignment may replace it with an oblique one.
    pub projection: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Pose::IDENTITY, 70.0_f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl Camera {
    pub fn new(pose: Pose, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            pose,
            fov_y,
            aspect,
            near,
            far,
            projection: Mat4::IDENTITY,
        };
        camera.reset_projection();
        camera
    }

    pub fn perspective(&self) -> Mat4 {
        let near = self.near.max(0.0001);
        Mat4::perspective_rh(
            self.fov_y.clamp(0.0001, std::f32::consts::PI - 0.0001),
            self.aspect.max(0.0001),
            near,
            self.far.max(near + 0.0001),
        )
    }

    pub fn reset_projection(&mut self) {
        self.projection = self.perspective();
    }

    /// Copies lens parameters and the current projection from `other`, keeping this camera's pose.
    pub fn copy_lens_from(&mut self, other: &Camera) {
        self.fov_y = other.fov_y;
        self.aspect = other.aspect;
        self.near = other.near;
        self.far = other.far;
        self.projection = other.projection;
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn forward(&self) -> Vec3 {
        self.pose.camera_forward()
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.pose.inverse().to_matrix()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn frustum_planes(&self) -> FrustumPlanes {
        extract_frustum_planes(self.view_projection())
    }

    /// x and y run 0..1 across the visible screen, z is the distance in
    /// front of the camera along its viewing axis (negative behind it).
    pub fn world_to_viewport(&self, point: Vec3) -> Vec3 {
        let view_point = self.view_matrix().transform_point3(point);
        let clip = self.projection * view_point.extend(1.0);
        let w = if clip.w.abs() < MIN_CLIP_W {
            MIN_CLIP_W.copysign(clip.w)
        } else {
            clip.w
        };

        Vec3::new(
            clip.x / w * 0.5 + 0.5,
            clip.y / w * 0.5 + 0.5,
            -view_point.z,
        )
    }

    /// Distance from the eye to a corner of the near clip rectangle.
    pub fn near_plane_corner_distance(&self) -> f32 {
        let half_height = self.near * (self.fov_y * 0.5).tan();
        let half_width = half_height * self.aspect;
        Vec3::new(half_width, half_height, self.near).length()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::Camera;
    use crate::transform::Pose;

    fn camera_at_origin() -> Camera {
        Camera::new(Pose::IDENTITY, 60.0_f32.to_radians(), 1.0, 0.1, 100.0)
    }

    #[test]
    fn point_on_view_axis_projects_to_viewport_centre() {
        let camera = camera_at_origin();
        let projected = camera.world_to_viewport(Vec3::new(0.0, 0.0, -10.0));
        assert!((projected.x - 0.5).abs() < 1.0e-5);
        assert!((projected.y - 0.5).abs() < 1.0e-5);
        assert!((projected.z - 10.0).abs() < 1.0e-4);
    }

    #[test]
    fn points_to_the_right_and_up_increase_viewport_coords() {
        let camera = camera_at_origin();
        let projected = camera.world_to_viewport(Vec3::new(1.0, 1.0, -10.0));
        assert!(projected.x > 0.5);
        assert!(projected.y > 0.5);
    }

    #[test]
    fn points_behind_report_negative_depth() {
        let camera = camera_at_origin();
        let projected = camera.world_to_viewport(Vec3::new(0.0, 0.0, 5.0));
        assert!(projected.z < 0.0);
        assert!(projected.is_finite());
    }

    #[test]
    fn point_in_eye_plane_does_not_produce_nan() {
        let camera = camera_at_origin();
        let projected = camera.world_to_viewport(Vec3::new(2.0, 0.0, 0.0));
        assert!(projected.is_finite());
    }

    #[test]
    fn near_plane_corner_distance_exceeds_near_distance() {
        let camera = camera_at_origin();
        let distance = camera.near_plane_corner_distance();
        let half = 0.1 * (30.0_f32.to_radians()).tan();
        let expected = (half * half * 2.0 + 0.01_f32).sqrt();
        assert!((distance - expected).abs() < 1.0e-6);
        assert!(distance > camera.near);
    }
}
