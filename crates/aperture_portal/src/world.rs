use std::fmt;

use aperture_shared::bounds::Aabb;
use aperture_shared::camera::Camera;
use aperture_shared::clip::NearClipSettings;
use aperture_shared::transform::{Pose, Side};
use bitflags::bitflags;
use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::host::RenderTarget;
use crate::shading::ScreenMaterial;
use crate::traveller::{PortalTraveller, TrackedTraveller};

pub const DEFAULT_RECURSION_LIMIT: u32 = 10;
pub const DEFAULT_SCREEN_THICKNESS: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortalId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TravellerId(pub usize);

impl fmt::Display for PortalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "portal #{}", self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SurfaceFlags: u8 {
        const ENABLED      = 0b0000_0001;
        /// Writes colour; without it the surface only casts shadows.
        const DRAW_COLOR   = 0b0000_0010;
        const CAST_SHADOWS = 0b0000_0100;
    }
}

impl Default for SurfaceFlags {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortalScreen {
    pub local_pose: Pose,
    pub size: Vec2,
    pub thickness: f32,
    pub mesh_bounds: Aabb,
    pub flags: SurfaceFlags,
    pub material: ScreenMaterial,
}

impl PortalScreen {
    pub fn new(size: Vec2) -> Self {
        Self {
            local_pose: Pose::IDENTITY,
            size,
            thickness: DEFAULT_SCREEN_THICKNESS,
            mesh_bounds: Aabb::UNIT_CUBE,
            flags: SurfaceFlags::default(),
            material: ScreenMaterial::default(),
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.local_pose.to_matrix() * Mat4::from_scale(self.size.extend(self.thickness))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortalDesc {
    pub name: String,
    pub pose: Pose,
    pub screen_size: Vec2,
    pub recursion_limit: u32,
    pub near_clip: NearClipSettings,
}

impl PortalDesc {
    pub fn new(name: impl Into<String>, pose: Pose) -> Self {
        Self {
            name: name.into(),
            pose,
            screen_size: Vec2::new(2.0, 3.0),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            near_clip: NearClipSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Portal {
    pub name: String,
    pub pose: Pose,
    pub(crate) linked: Option<PortalId>,
    pub screen: PortalScreen,
    /// Render source for the linked screen; never drawn on its own.
    pub proxy_camera: Camera,
    pub recursion_limit: u32,
    pub near_clip: NearClipSettings,
    pub(crate) view_target: Option<RenderTarget>,
    pub(crate) tracked: Vec<TrackedTraveller>,
}

impl Portal {
    fn from_desc(desc: PortalDesc) -> Self {
        Self {
            name: desc.name,
            pose: desc.pose,
            linked: None,
            screen: PortalScreen::new(desc.screen_size),
            proxy_camera: Camera::new(desc.pose, 60.0_f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0),
            recursion_limit: desc.recursion_limit,
            near_clip: desc.near_clip,
            view_target: None,
            tracked: Vec::new(),
        }
    }

    pub fn linked(&self) -> Option<PortalId> {
        self.linked
    }

    pub fn view_target(&self) -> Option<RenderTarget> {
        self.view_target
    }

    pub fn tracked(&self) -> &[TrackedTraveller] {
        &self.tracked
    }

    pub fn is_tracking(&self, traveller: TravellerId) -> bool {
        self.tracked.iter().any(|record| record.traveller == traveller)
    }

    pub fn forward(&self) -> Vec3 {
        self.pose.forward()
    }

    pub fn side_of(&self, point: Vec3) -> Side {
        Side::of_point(point, &self.pose)
    }

    pub fn same_side(&self, a: Vec3, b: Vec3) -> bool {
        self.side_of(a) == self.side_of(b)
    }

    pub fn screen_world_matrix(&self) -> Mat4 {
        self.pose.to_matrix() * self.screen.local_matrix()
    }

    pub fn screen_world_bounds(&self) -> Aabb {
        self.screen.mesh_bounds.transformed(self.screen_world_matrix())
    }

    pub fn overlaps_threshold(&self, traveller: &PortalTraveller) -> bool {
        traveller.bounds().intersects(&self.screen_world_bounds())
    }

    /// Thickens the screen towards the far side of `view_point` so a camera
    /// passing through the portal never clips into the quad. Returns the new
    /// thickness.
    pub fn protect_screen_from_clipping(&mut self, view_point: Vec3, viewer: &Camera) -> f32 {
        let thickness = viewer.near_plane_corner_distance();
        let facing_same_way = self.forward().dot(self.pose.position - view_point) > 0.0;

        self.screen.thickness = thickness;
        self.screen.local_pose.position =
            Vec3::Z * thickness * if facing_same_way { 0.5 } else { -0.5 };
        thickness
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingError {
    UnknownPortal(PortalId),
    SelfLink(PortalId),
    Asymmetric { portal: PortalId, linked: PortalId },
}

impl fmt::Display for PairingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPortal(id) => write!(f, "{id} does not exist"),
            Self::SelfLink(id) => write!(f, "{id} cannot be linked to itself"),
            Self::Asymmetric { portal, linked } => {
                write!(f, "{portal} links to {linked}, which does not link back")
            }
        }
    }
}

impl std::error::Error for PairingError {}

#[derive(Debug, Clone)]
pub struct PortalWorld {
    pub(crate) portals: Vec<Portal>,
    pub(crate) travellers: Vec<PortalTraveller>,
    pub viewer: Camera,
}

impl PortalWorld {
    pub fn new(viewer: Camera) -> Self {
        Self {
            portals: Vec::new(),
            travellers: Vec::new(),
            viewer,
        }
    }

    pub fn add_portal(&mut self, desc: PortalDesc) -> PortalId {
        let id = PortalId(self.portals.len());
        self.portals.push(Portal::from_desc(desc));
        id
    }

    /// Pairs `a` with `b`, first dropping any pairing either had.
    pub fn link(&mut self, a: PortalId, b: PortalId) -> Result<(), PairingError> {
        for id in [a, b] {
            if id.0 >= self.portals.len() {
                return Err(PairingError::UnknownPortal(id));
            }
        }
        if a == b {
            return Err(PairingError::SelfLink(a));
        }

        self.unlink(a);
        self.unlink(b);
        self.portals[a.0].linked = Some(b);
        self.portals[b.0].linked = Some(a);
        Ok(())
    }

    /// Clears the pairing of `id` and of whatever it pointed at. Both sides
    /// drop the other's view texture and stop tracking travellers.
    pub fn unlink(&mut self, id: PortalId) {
        let Some(portal) = self.portals.get_mut(id.0) else {
            return;
        };
        let Some(other_id) = portal.linked.take() else {
            return;
        };
        self.detach(id);
        if let Some(other) = self.portals.get_mut(other_id.0) {
            if other.linked == Some(id) {
                other.linked = None;
                self.detach(other_id);
            }
        }
    }

    fn detach(&mut self, id: PortalId) {
        let portal = &mut self.portals[id.0];
        portal.screen.material.view_texture = None;
        let dropped = std::mem::take(&mut portal.tracked);
        for record in dropped {
            if self.tracking_portals(record.traveller).is_empty() {
                if let Some(traveller) = self.travellers.get_mut(record.traveller.0) {
                    traveller.clear_slices();
                }
            }
        }
    }

    pub fn validate_pairing(&self) -> Result<(), PairingError> {
        for (index, portal) in self.portals.iter().enumerate() {
            let id = PortalId(index);
            let Some(linked) = portal.linked else {
                continue;
            };
            if linked == id {
                return Err(PairingError::SelfLink(id));
            }
            let Some(other) = self.portals.get(linked.0) else {
                return Err(PairingError::UnknownPortal(linked));
            };
            if other.linked != Some(id) {
                return Err(PairingError::Asymmetric { portal: id, linked });
            }
        }
        Ok(())
    }

    /// The portal `id` is paired with, only if the pairing is mutual.
    pub fn paired(&self, id: PortalId) -> Option<PortalId> {
        let linked = self.portals.get(id.0)?.linked?;
        let other = self.portals.get(linked.0)?;
        (linked != id && other.linked == Some(id)).then_some(linked)
    }

    pub fn portal(&self, id: PortalId) -> Option<&Portal> {
        self.portals.get(id.0)
    }

    pub fn portal_mut(&mut self, id: PortalId) -> Option<&mut Portal> {
        self.portals.get_mut(id.0)
    }

    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    pub fn portal_ids(&self) -> impl Iterator<Item = PortalId> {
        (0..self.portals.len()).map(PortalId)
    }

    pub fn find_portal(&self, name: &str) -> Option<PortalId> {
        self.portals
            .iter()
            .position(|portal| portal.name == name)
            .map(PortalId)
    }

    pub fn add_traveller(&mut self, traveller: PortalTraveller) -> TravellerId {
        let id = TravellerId(self.travellers.len());
        self.travellers.push(traveller);
        id
    }

    pub fn traveller(&self, id: TravellerId) -> Option<&PortalTraveller> {
        self.travellers.get(id.0)
    }

    pub fn traveller_mut(&mut self, id: TravellerId) -> Option<&mut PortalTraveller> {
        self.travellers.get_mut(id.0)
    }

    pub fn travellers(&self) -> &[PortalTraveller] {
        &self.travellers
    }

    pub fn traveller_ids(&self) -> impl Iterator<Item = TravellerId> {
        (0..self.travellers.len()).map(TravellerId)
    }

    pub fn find_traveller(&self, name: &str) -> Option<TravellerId> {
        self.travellers
            .iter()
            .position(|traveller| traveller.name == name)
            .map(TravellerId)
    }

    pub fn tracking_portals(&self, traveller: TravellerId) -> Vec<PortalId> {
        self.portals
            .iter()
            .enumerate()
            .filter(|(_, portal)| portal.is_tracking(traveller))
            .map(|(index, _)| PortalId(index))
            .collect()
    }
}
