use std::f32::consts::FRAC_PI_2;

use aperture_shared::camera::Camera;
use aperture_shared::transform::Pose;
use glam::{Quat, UVec2, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::host::{RenderHost, TextureHandle, TravellerHooks};
use crate::shading::ShadingSink;
use crate::traveller::{PortalTraveller, Teleport};
use crate::world::{PortalDesc, PortalId, PortalWorld, SurfaceFlags, TravellerId};

pub struct RenderRecord {
    pub camera: Camera,
    pub target: TextureHandle,
    /// Flags and display mask of every screen at the time of the capture.
    pub screens: Vec<(SurfaceFlags, i32)>,
}

pub struct RecordingHost {
    pub resolution: UVec2,
    pub created: Vec<(TextureHandle, u32, u32)>,
    pub released: Vec<TextureHandle>,
    pub renders: Vec<RenderRecord>,
    next_handle: u64,
}

impl RecordingHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: UVec2::new(width, height),
            created: Vec::new(),
            released: Vec::new(),
            renders: Vec::new(),
            next_handle: 1,
        }
    }
}

impl RenderHost for RecordingHost {
    fn output_resolution(&self) -> UVec2 {
        self.resolution
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> TextureHandle {
        let handle = TextureHandle(self.next_handle);
        self.next_handle += 1;
        self.created.push((handle, width, height));
        handle
    }

    fn release_render_target(&mut self, handle: TextureHandle) {
        self.released.push(handle);
    }

    fn render_camera(&mut self, camera: &Camera, target: TextureHandle, world: &PortalWorld) {
        self.renders.push(RenderRecord {
            camera: *camera,
            target,
            screens: world
                .portals()
                .iter()
                .map(|portal| (portal.screen.flags, portal.screen.material.display_mask))
                .collect(),
        });
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub floats: FxHashMap<String, f32>,
    pub ints: FxHashMap<String, i32>,
    pub vectors: FxHashMap<String, Vec4>,
    pub textures: FxHashMap<String, Option<TextureHandle>>,
}

impl ShadingSink for RecordingSink {
    fn set_float(&mut self, name: &str, value: f32) {
        self.floats.insert(name.to_owned(), value);
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.ints.insert(name.to_owned(), value);
    }

    fn set_vector(&mut self, name: &str, value: Vec4) {
        self.vectors.insert(name.to_owned(), value);
    }

    fn set_texture(&mut self, name: &str, texture: Option<TextureHandle>) {
        self.textures.insert(name.to_owned(), texture);
    }
}

#[derive(Default)]
pub struct CountingHooks {
    pub entered: Vec<(String, PortalId)>,
    pub exited: Vec<(String, PortalId)>,
    pub teleports: u32,
}

impl TravellerHooks for CountingHooks {
    fn teleport(&mut self, traveller: &mut PortalTraveller, teleport: &Teleport) {
        self.teleports += 1;
        traveller.apply_teleport(teleport);
    }

    fn enter_portal_threshold(&mut self, traveller: &mut PortalTraveller, portal: PortalId) {
        self.entered.push((traveller.name.clone(), portal));
    }

    fn exit_portal_threshold(&mut self, traveller: &mut PortalTraveller, portal: PortalId) {
        self.exited.push((traveller.name.clone(), portal));
    }
}

fn viewer_camera(pose: Pose) -> Camera {
    Camera::new(pose, 60.0_f32.to_radians(), 16.0 / 9.0, 0.1, 100.0)
}

/// Parallel portals facing +Z: `a` at (0, 0, -5), `b` at (3, 0, 5). The
/// viewer stands at the origin turned `yaw_degrees` away from +Z towards +X.
pub fn parallel_pair(yaw_degrees: f32) -> (PortalWorld, PortalId, PortalId) {
    let viewer = Pose::new(Vec3::ZERO, Quat::from_rotation_y((180.0 + yaw_degrees).to_radians()));
    let mut world = PortalWorld::new(viewer_camera(viewer));

    let mut desc_a = PortalDesc::new("a", Pose::from_translation(Vec3::new(0.0, 0.0, -5.0)));
    desc_a.screen_size = Vec2::new(2.0, 3.0);
    let mut desc_b = PortalDesc::new("b", Pose::from_translation(Vec3::new(3.0, 0.0, 5.0)));
    desc_b.screen_size = Vec2::new(2.0, 3.0);

    let a = world.add_portal(desc_a);
    let b = world.add_portal(desc_b);
    for id in [a, b] {
        if let Some(portal) = world.portal_mut(id) {
            portal.screen.thickness = 0.05;
        }
    }
    world.link(a, b).expect("distinct portals link");
    (world, a, b)
}

/// `a` faces +Z at (0, 0, -5); `b` faces +X at (20, 0, 0). The viewer
/// stands in front of `a` looking at it.
pub fn facing_pair() -> (PortalWorld, PortalId, PortalId) {
    let mut world = PortalWorld::new(viewer_camera(Pose::from_translation(Vec3::new(0.0, 0.0, 3.0))));
    let a = world.add_portal(PortalDesc::new("a", Pose::from_translation(Vec3::new(0.0, 0.0, -5.0))));
    let b = world.add_portal(PortalDesc::new(
        "b",
        Pose::new(Vec3::new(20.0, 0.0, 0.0), Quat::from_rotation_y(FRAC_PI_2)),
    ));
    world.link(a, b).expect("distinct portals link");
    (world, a, b)
}

/// Adds a traveller named `t<index>` `offset` units in front of `portal` along its forward axis.
pub fn add_traveller_near(world: &mut PortalWorld, portal: PortalId, offset: f32) -> TravellerId {
    let pose = world.portal(portal).expect("portal exists").pose;
    let index = world.travellers().len();
    let position = pose.position + pose.forward() * offset;
    world.add_traveller(
        PortalTraveller::new(format!("t{index}"), Pose::new(position, pose.rotation))
            .with_half_extents(Vec3::splat(0.25)),
    )
}
