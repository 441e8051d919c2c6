use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

use crate::host::TextureHandle;

pub const MAIN_TEXTURE: &str = "_MainTex";
pub const DISPLAY_MASK: &str = "displayMask";
pub const SLICE_POSITION: &str = "_SlicePosition";
pub const SLICE_NORMAL: &str = "_SliceNormal";
pub const SLICE_OFFSET: &str = "_SliceOffset";

pub trait ShadingSink {
    fn set_float(&mut self, name: &str, value: f32);
    fn set_int(&mut self, name: &str, value: i32);
    fn set_vector(&mut self, name: &str, value: Vec4);
    fn set_texture(&mut self, name: &str, texture: Option<TextureHandle>);
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SliceUniform {
    pub position: [f32; 3],
    pub offset: f32,
    pub normal: [f32; 3],
    pub _padding: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ScreenUniform {
    pub display_mask: f32,
    pub _padding: [f32; 3],
}

/// Cutting plane for one representation of a traveller. A fragment at `x`
/// survives iff `dot(x - position, normal) <= offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceParams {
    pub position: Vec3,
    pub normal: Vec3,
    pub offset: f32,
}

impl Default for SliceParams {
    fn default() -> Self {
        Self::DISABLED
    }
}

impl SliceParams {
    /// Offset that discards every fragment.
    pub const HIDE_OFFSET: f32 = -1000.0;
    /// Offset that keeps every fragment.
    pub const SHOW_OFFSET: f32 = 1000.0;

    /// Zero normal: nothing is cut.
    pub const DISABLED: Self = Self {
        position: Vec3::ZERO,
        normal: Vec3::ZERO,
        offset: 0.0,
    };

    pub fn keeps(&self, point: Vec3) -> bool {
        (point - self.position).dot(self.normal) <= self.offset
    }

    pub fn write_to(&self, sink: &mut dyn ShadingSink) {
        sink.set_vector(SLICE_POSITION, self.position.extend(0.0));
        sink.set_vector(SLICE_NORMAL, self.normal.extend(0.0));
        sink.set_float(SLICE_OFFSET, self.offset);
    }

    pub fn uniform(&self) -> SliceUniform {
        SliceUniform {
            position: self.position.to_array(),
            offset: self.offset,
            normal: self.normal.to_array(),
            _padding: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenMaterial {
    /// 1 shows the captured view, 0 shows the fallback colour.
    pub display_mask: i32,
    pub view_texture: Option<TextureHandle>,
}

impl Default for ScreenMaterial {
    fn default() -> Self {
        Self {
            display_mask: 1,
            view_texture: None,
        }
    }
}

impl ScreenMaterial {
    pub fn write_to(&self, sink: &mut dyn ShadingSink) {
        sink.set_int(DISPLAY_MASK, self.display_mask);
        sink.set_texture(MAIN_TEXTURE, self.view_texture);
    }

    pub fn uniform(&self) -> ScreenUniform {
        ScreenUniform {
            display_mask: self.display_mask as f32,
            _padding: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::{ScreenMaterial, SliceParams, DISPLAY_MASK, MAIN_TEXTURE, SLICE_NORMAL, SLICE_OFFSET};
    use crate::host::TextureHandle;
    use crate::testkit::RecordingSink;

    #[test]
    fn slice_keeps_points_on_the_negative_side_of_the_normal() {
        let slice = SliceParams {
            position: Vec3::new(0.0, 0.0, -5.0),
            normal: Vec3::Z,
            offset: 0.0,
        };
        assert!(slice.keeps(Vec3::new(1.0, 2.0, -6.0)));
        assert!(slice.keeps(Vec3::new(1.0, 2.0, -5.0)));
        assert!(!slice.keeps(Vec3::new(1.0, 2.0, -4.0)));

        let nudged = SliceParams { offset: 1.5, ..slice };
        assert!(nudged.keeps(Vec3::new(1.0, 2.0, -4.0)));
    }

    #[test]
    fn hide_and_show_offsets_override_the_plane() {
        let plane = SliceParams {
            position: Vec3::ZERO,
            normal: Vec3::X,
            offset: SliceParams::HIDE_OFFSET,
        };
        assert!(!plane.keeps(Vec3::new(-3.0, 0.0, 0.0)));

        let shown = SliceParams {
            offset: SliceParams::SHOW_OFFSET,
            ..plane
        };
        assert!(shown.keeps(Vec3::new(30.0, 0.0, 0.0)));
        assert!(SliceParams::DISABLED.keeps(Vec3::splat(500.0)));
    }

    #[test]
    fn parameters_are_written_under_shader_names() {
        let mut sink = RecordingSink::default();
        SliceParams {
            position: Vec3::new(1.0, 2.0, 3.0),
            normal: Vec3::NEG_Z,
            offset: -0.25,
        }
        .write_to(&mut sink);
        ScreenMaterial {
            display_mask: 0,
            view_texture: Some(TextureHandle(7)),
        }
        .write_to(&mut sink);

        assert_eq!(sink.vectors.get(SLICE_NORMAL), Some(&Vec4::new(0.0, 0.0, -1.0, 0.0)));
        assert_eq!(sink.floats.get(SLICE_OFFSET), Some(&-0.25));
        assert_eq!(sink.ints.get(DISPLAY_MASK), Some(&0));
        assert_eq!(sink.textures.get(MAIN_TEXTURE), Some(&Some(TextureHandle(7))));
    }

    #[test]
    fn uniforms_are_plain_bytes() {
        let slice = SliceParams {
            position: Vec3::new(1.0, 2.0, 3.0),
            normal: Vec3::Y,
            offset: 0.5,
        };
        let uniform = slice.uniform();
        let bytes = bytemuck::bytes_of(&uniform);
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytemuck::cast_slice::<u8, f32>(bytes)[3], 0.5);
        let screen = ScreenMaterial::default().uniform();
        assert_eq!(screen.display_mask, 1.0);
        assert_eq!(bytemuck::bytes_of(&screen).len(), 16);
    }
}
