use glam::{Mat4, Vec3};

use crate::bounds::Aabb;

/// Left, right, bottom, top, near, far; each `[a, b, c, d]` with the inside
/// satisfying `a*x + b*y + c*z + d >= 0`.
pub type FrustumPlanes = [[f32; 4]; 6];

const MIN_PLANE_NORMAL: f32 = 0.0001;

/// Gribb/Hartmann extraction for a `[0, 1]` depth range projection.
pub fn extract_frustum_planes(vp: Mat4) -> FrustumPlanes {
    let m = vp.to_cols_array_2d();
    let row0 = [m[0][0], m[1][0], m[2][0], m[3][0]];
    let row1 = [m[0][1], m[1][1], m[2][1], m[3][1]];
    let row2 = [m[0][2], m[1][2], m[2][2], m[3][2]];
    let row3 = [m[0][3], m[1][3], m[2][3], m[3][3]];

    let planes = [
        [row3[0] + row0[0], row3[1] + row0[1], row3[2] + row0[2], row3[3] + row0[3]],
        [row3[0] - row0[0], row3[1] - row0[1], row3[2] - row0[2], row3[3] - row0[3]],
        [row3[0] + row1[0], row3[1] + row1[1], row3[2] + row1[2], row3[3] + row1[3]],
        [row3[0] - row1[0], row3[1] - row1[1], row3[2] - row1[2], row3[3] - row1[3]],
        row2,
        [row3[0] - row2[0], row3[1] - row2[1], row3[2] - row2[2], row3[3] - row2[3]],
    ];

    let mut result = [[0.0f32; 4]; 6];
    for (i, p) in planes.iter().enumerate() {
        let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        if len > MIN_PLANE_NORMAL {
            result[i] = [p[0] / len, p[1] / len, p[2] / len, p[3] / len];
        }
    }
    result
}

/// Conservative box test: false only when the box lies entirely outside one plane.
/// Degenerate boxes and degenerate frusta count as not visible.
pub fn aabb_in_frustum(planes: &FrustumPlanes, bounds: &Aabb) -> bool {
    if bounds.is_degenerate() {
        return false;
    }

    let center = bounds.center();
    let half = bounds.half_extents();
    for plane in planes {
        let normal = Vec3::new(plane[0], plane[1], plane[2]);
        if normal.length_squared() < MIN_PLANE_NORMAL * MIN_PLANE_NORMAL {
            return false;
        }
        let d = normal.dot(center) + plane[3];
        let r = half.dot(normal.abs());
        if d < -r {
            return false;
        }
    }
    true
}
