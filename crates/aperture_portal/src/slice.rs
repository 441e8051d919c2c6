use glam::Vec3;

use crate::shading::SliceParams;
use crate::traveller::PortalTraveller;
use crate::world::{Portal, PortalId, PortalWorld};

/// Slice planes for a traveller tracked by `portal`, as seen from `view_point`.
/// The traveller keeps the half on its own side of `portal`; the clone keeps
/// the matching half behind `linked`.
pub fn update_slice_params(portal: &Portal, linked: &Portal, traveller: &mut PortalTraveller, view_point: Vec3) {
    let side = portal.side_of(traveller.position());
    let sign = side.sign();
    let thickness = portal.screen.thickness;

    // Viewer across the plane: pull the cut back by the screen's depth so no
    // sliver shows in front of it.
    let offset = if portal.side_of(view_point) != side {
        -thickness
    } else {
        0.0
    };
    let clone_offset = if linked.side_of(view_point) == side {
        -thickness
    } else {
        0.0
    };

    traveller.original_slice = SliceParams {
        position: portal.pose.position,
        normal: portal.forward() * -sign,
        offset,
    };
    traveller.clone_slice = SliceParams {
        position: linked.pose.position,
        normal: linked.forward() * sign,
        offset: clone_offset,
    };
}

impl PortalWorld {
    /// Before any proxy capture this frame.
    pub fn pre_portal_render(&mut self, portal: PortalId) {
        self.refresh_slices(portal);
    }

    /// After every proxy capture, before the primary camera draws.
    pub fn post_portal_render(&mut self, portal: PortalId) {
        self.refresh_slices(portal);
    }

    fn refresh_slices(&mut self, portal_id: PortalId) {
        let Some(linked_id) = self.paired(portal_id) else {
            return;
        };
        let viewer = self.viewer;
        let view_point = viewer.position();
        self.portals[portal_id.0].protect_screen_from_clipping(view_point, &viewer);

        let portal = &self.portals[portal_id.0];
        let linked = &self.portals[linked_id.0];
        for record in &portal.tracked {
            if let Some(traveller) = self.travellers.get_mut(record.traveller.0) {
                update_slice_params(portal, linked, traveller, view_point);
            }
        }
    }

    /// Adjusts slice offsets for one capture by `portal_id`'s proxy camera at
    /// `camera_position`. Travellers on the camera's side of the portal are
    /// hidden outright; clones are nudged by the linked screen's thickness.
    pub fn prepare_capture_slices(&mut self, portal_id: PortalId, linked_id: PortalId, camera_position: Vec3) {
        let viewer = self.viewer;
        let Some(linked) = self.portals.get_mut(linked_id.0) else {
            return;
        };
        let thickness = linked.protect_screen_from_clipping(camera_position, &viewer);

        let Some(portal) = self.portals.get(portal_id.0) else {
            return;
        };
        let linked = &self.portals[linked_id.0];

        for record in &portal.tracked {
            let Some(traveller) = self.travellers.get_mut(record.traveller.0) else {
                continue;
            };
            let position = traveller.position();
            traveller.original_slice.offset = if portal.same_side(position, camera_position) {
                SliceParams::HIDE_OFFSET
            } else {
                SliceParams::SHOW_OFFSET
            };

            let clone_side = portal.side_of(position).opposite();
            traveller.clone_slice.offset = if linked.side_of(camera_position) == clone_side {
                thickness
            } else {
                -thickness
            };
        }

        let camera_side = portal.side_of(camera_position);
        for record in &linked.tracked {
            let Some(traveller) = self.travellers.get_mut(record.traveller.0) else {
                continue;
            };
            let position = traveller.position();
            traveller.clone_slice.offset = if linked.side_of(position) != camera_side {
                SliceParams::HIDE_OFFSET
            } else {
                SliceParams::SHOW_OFFSET
            };
            traveller.original_slice.offset = if linked.same_side(position, camera_position) {
                thickness
            } else {
                -thickness
            };
        }
    }
}
