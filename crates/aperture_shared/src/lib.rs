pub mod bounds;
pub mod camera;
pub mod clip;
pub mod frustum;
pub mod screen_bounds;
pub mod transform;
