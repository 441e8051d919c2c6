use aperture_shared::camera::Camera;
use aperture_shared::clip::align_near_clip_plane;
use aperture_shared::frustum::aabb_in_frustum;
use aperture_shared::screen_bounds::portal_screens_overlap;
use aperture_shared::transform::{pairing_pose, Pose};
use glam::UVec2;
use tracing::{debug, trace};

use crate::host::{RenderHost, RenderTarget};
use crate::world::{Portal, PortalId, PortalWorld, SurfaceFlags};

/// Proxy camera poses for one portal, deepest first. Each level moves the
/// previous one through `linked` and out of `portal`; a level is only added
/// while the previous level can still see `linked`'s screen through
/// `portal`'s.
pub fn plan_capture_chain(portal: &Portal, linked: &Portal, viewer: &Camera) -> Vec<Pose> {
    let limit = portal.recursion_limit.max(1) as usize;
    let step = pairing_pose(&linked.pose, &portal.pose);
    let near_screen = (&portal.screen.mesh_bounds, portal.screen_world_matrix());
    let far_screen = (&linked.screen.mesh_bounds, linked.screen_world_matrix());

    let mut observer = *viewer;
    let mut current = viewer.pose;
    let mut chain = Vec::with_capacity(limit);
    for depth in 0..limit {
        if depth > 0 && !portal_screens_overlap(near_screen, far_screen, &observer) {
            break;
        }
        current = step * current;
        observer.pose = current;
        chain.push(current);
    }

    chain.reverse();
    chain
}

impl PortalWorld {
    /// Captures what the viewer sees through `portal_id` into the texture on
    /// its linked screen. Returns the number of captures drawn, 0 when the
    /// portal is unpaired or its linked screen is out of view.
    pub fn render_portal(&mut self, portal_id: PortalId, host: &mut dyn RenderHost) -> u32 {
        let Some(linked_id) = self.paired(portal_id) else {
            trace!(portal = %portal_id, "unpaired portal not rendered");
            return 0;
        };

        let planes = self.viewer.frustum_planes();
        let linked = &mut self.portals[linked_id.0];
        let visible = aabb_in_frustum(&planes, &linked.screen_world_bounds());
        linked.screen.flags.set(SurfaceFlags::ENABLED, visible);
        if !visible {
            trace!(portal = %self.portals[portal_id.0].name, "linked screen out of view");
            return 0;
        }

        let target = self.ensure_view_target(portal_id, linked_id, host);

        let viewer = self.viewer;
        self.portals[portal_id.0].proxy_camera.copy_lens_from(&viewer);
        let chain = plan_capture_chain(&self.portals[portal_id.0], &self.portals[linked_id.0], &viewer);

        let saved_flags = self.portals[portal_id.0].screen.flags;
        self.portals[portal_id.0].screen.flags.remove(SurfaceFlags::DRAW_COLOR);
        self.portals[linked_id.0].screen.material.display_mask = 0;

        let mut captures = 0;
        for pose in chain {
            let portal = &mut self.portals[portal_id.0];
            portal.proxy_camera.pose = pose;
            align_near_clip_plane(&mut portal.proxy_camera, &portal.pose, &portal.near_clip);
            let camera = portal.proxy_camera;

            self.prepare_capture_slices(portal_id, linked_id, camera.position());
            host.render_camera(&camera, target.handle, self);
            captures += 1;

            if captures == 1 {
                self.portals[linked_id.0].screen.material.display_mask = 1;
                self.portals[portal_id.0].screen.flags = saved_flags;
            }
        }

        trace!(portal = %self.portals[portal_id.0].name, captures, "portal rendered");
        captures
    }

    /// Makes sure `portal_id` owns a target at the host's output size,
    /// releasing a stale one first, and that the linked screen shows it.
    fn ensure_view_target(&mut self, portal_id: PortalId, linked_id: PortalId, host: &mut dyn RenderHost) -> RenderTarget {
        let resolution = host.output_resolution().max(UVec2::ONE);
        if let Some(target) = self.portals[portal_id.0].view_target {
            if target.matches(resolution) {
                self.portals[linked_id.0].screen.material.view_texture = Some(target.handle);
                return target;
            }
            host.release_render_target(target.handle);
            debug!(
                portal = %self.portals[portal_id.0].name,
                width = target.width,
                height = target.height,
                "released stale view target"
            );
        }

        let handle = host.create_render_target(resolution.x, resolution.y);
        let target = RenderTarget {
            handle,
            width: resolution.x,
            height: resolution.y,
        };
        self.portals[portal_id.0].view_target = Some(target);
        self.portals[linked_id.0].screen.material.view_texture = Some(handle);
        debug!(
            portal = %self.portals[portal_id.0].name,
            width = target.width,
            height = target.height,
            "created view target"
        );
        target
    }

    /// Returns every view target to the host.
    pub fn release_render_targets(&mut self, host: &mut dyn RenderHost) {
        let released: Vec<_> = self
            .portals
            .iter_mut()
            .filter_map(|portal| portal.view_target.take())
            .map(|target| target.handle)
            .collect();

        for portal in &mut self.portals {
            if portal
                .screen
                .material
                .view_texture
                .is_some_and(|handle| released.contains(&handle))
            {
                portal.screen.material.view_texture = None;
            }
        }
        for handle in released {
            host.release_render_target(handle);
        }
    }
}
