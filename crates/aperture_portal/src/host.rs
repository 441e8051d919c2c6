use aperture_shared::camera::Camera;
use glam::UVec2;

use crate::traveller::{PortalTraveller, Teleport};
use crate::world::{PortalId, PortalWorld};

/// Opaque id of a texture owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn matches(&self, resolution: UVec2) -> bool {
        self.width == resolution.x && self.height == resolution.y
    }
}

/// What the portal system needs from the renderer it runs inside.
pub trait RenderHost {
    /// Size the primary view is presented at this frame.
    fn output_resolution(&self) -> UVec2;
    fn create_render_target(&mut self, width: u32, height: u32) -> TextureHandle;
    fn release_render_target(&mut self, handle: TextureHandle);
    /// Draws the scene from `camera` (using its current projection) into `target`.
    fn render_camera(&mut self, camera: &Camera, target: TextureHandle, world: &PortalWorld);
}

/// Callbacks fired on a traveller as it moves through portals.
pub trait TravellerHooks {
    fn teleport(&mut self, traveller: &mut PortalTraveller, teleport: &Teleport) {
        traveller.apply_teleport(teleport);
    }

    fn enter_portal_threshold(&mut self, _traveller: &mut PortalTraveller, _portal: PortalId) {}

    fn exit_portal_threshold(&mut self, _traveller: &mut PortalTraveller, _portal: PortalId) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl TravellerHooks for NoHooks {}
