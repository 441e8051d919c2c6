use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use aperture_shared::camera::Camera;
use aperture_shared::clip::NearClipSettings;
use aperture_shared::transform::Pose;
use glam::{UVec2, Vec2, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::traveller::PortalTraveller;
use crate::world::{PairingError, PortalDesc, PortalId, PortalWorld, DEFAULT_RECURSION_LIMIT};

const MIN_RECURSION_LIMIT: u32 = 1;
const MAX_RECURSION_LIMIT: u32 = 64;
const MAX_NEAR_CLIP_OFFSET: f32 = 1.0;
const MAX_NEAR_CLIP_LIMIT: f32 = 10.0;
const MIN_FOV: f32 = 1.0;
const MAX_FOV: f32 = 179.0;
const MIN_NEAR: f32 = 1.0e-4;
const MIN_ASPECT: f32 = 1.0e-4;
const MIN_SCREEN_EXTENT: f32 = 1.0e-3;

#[derive(Debug)]
pub enum SceneConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    DuplicatePortal(String),
    DuplicateTraveller(String),
    UnknownLink {
        portal: String,
        linked: String,
    },
    Pairing(PairingError),
}

impl fmt::Display for SceneConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read scene {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse scene {}: {source}", path.display())
            }
            Self::DuplicatePortal(name) => write!(f, "portal '{name}' is declared twice"),
            Self::DuplicateTraveller(name) => write!(f, "traveller '{name}' is declared twice"),
            Self::UnknownLink { portal, linked } => {
                write!(f, "portal '{portal}' links to unknown portal '{linked}'")
            }
            Self::Pairing(err) => write!(f, "invalid portal pairing: {err}"),
        }
    }
}

impl std::error::Error for SceneConfigError {}

impl From<PairingError> for SceneConfigError {
    fn from(err: PairingError) -> Self {
        Self::Pairing(err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_width")]
    pub width: u32,
    #[serde(default = "default_output_height")]
    pub height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_output_width(),
            height: default_output_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub yaw_degrees: f32,
    #[serde(default)]
    pub pitch_degrees: f32,
    #[serde(default)]
    pub roll_degrees: f32,
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_aspect")]
    pub aspect: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw_degrees: 0.0,
            pitch_degrees: 0.0,
            roll_degrees: 0.0,
            fov_degrees: default_fov(),
            aspect: default_aspect(),
            near: default_near(),
            far: default_far(),
        }
    }
}

impl ViewerConfig {
    pub fn camera(&self) -> Camera {
        Camera::new(
            euler_pose(self.position, self.yaw_degrees, self.pitch_degrees, self.roll_degrees),
            self.fov_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub name: String,
    #[serde(default)]
    pub linked: Option<String>,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub yaw_degrees: f32,
    #[serde(default)]
    pub pitch_degrees: f32,
    #[serde(default)]
    pub roll_degrees: f32,
    #[serde(default = "default_screen_size")]
    pub screen_size: Vec2,
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: u32,
    #[serde(default = "default_near_clip_offset")]
    pub near_clip_offset: f32,
    #[serde(default = "default_near_clip_limit")]
    pub near_clip_limit: f32,
}

impl PortalConfig {
    pub fn desc(&self) -> PortalDesc {
        let pose = euler_pose(self.position, self.yaw_degrees, self.pitch_degrees, self.roll_degrees);
        let mut desc = PortalDesc::new(self.name.clone(), pose);
        desc.screen_size = self.screen_size;
        desc.recursion_limit = self.recursion_limit;
        desc.near_clip = NearClipSettings {
            offset: self.near_clip_offset,
            limit: self.near_clip_limit,
        };
        desc
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravellerConfig {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub yaw_degrees: f32,
    #[serde(default)]
    pub velocity: Vec3,
    #[serde(default = "default_half_extents")]
    pub half_extents: Vec3,
}

impl TravellerConfig {
    pub fn traveller(&self) -> PortalTraveller {
        PortalTraveller::new(self.name.clone(), euler_pose(self.position, self.yaw_degrees, 0.0, 0.0))
            .with_velocity(self.velocity)
            .with_half_extents(self.half_extents)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub portals: Vec<PortalConfig>,
    #[serde(default)]
    pub travellers: Vec<TravellerConfig>,
}

impl SceneConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        Ok(toml::from_str::<Self>(contents)?.sanitize())
    }

    pub fn load(path: &Path) -> Result<Self, SceneConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| SceneConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| SceneConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn sanitize(mut self) -> Self {
        self.output.width = clamp_logged("output.width", self.output.width, 1, u32::MAX);
        self.output.height = clamp_logged("output.height", self.output.height, 1, u32::MAX);

        let viewer = &mut self.viewer;
        viewer.fov_degrees = clamp_logged("viewer.fov_degrees", viewer.fov_degrees, MIN_FOV, MAX_FOV);
        viewer.aspect = clamp_logged("viewer.aspect", viewer.aspect, MIN_ASPECT, f32::MAX);
        viewer.near = clamp_logged("viewer.near", viewer.near, MIN_NEAR, f32::MAX);
        if !(viewer.far > viewer.near) {
            let far = viewer.near + 1.0;
            warn!("viewer.far {} must exceed near {}; using {far}", viewer.far, viewer.near);
            viewer.far = far;
        }

        for portal in &mut self.portals {
            portal.recursion_limit = clamp_logged(
                "recursion_limit",
                portal.recursion_limit,
                MIN_RECURSION_LIMIT,
                MAX_RECURSION_LIMIT,
            );
            portal.near_clip_offset =
                clamp_logged("near_clip_offset", portal.near_clip_offset, 0.0, MAX_NEAR_CLIP_OFFSET);
            portal.near_clip_limit =
                clamp_logged("near_clip_limit", portal.near_clip_limit, 0.0, MAX_NEAR_CLIP_LIMIT);
            portal.screen_size.x = clamp_logged("screen_size.x", portal.screen_size.x, MIN_SCREEN_EXTENT, f32::MAX);
            portal.screen_size.y = clamp_logged("screen_size.y", portal.screen_size.y, MIN_SCREEN_EXTENT, f32::MAX);
        }

        for traveller in &mut self.travellers {
            let half_extents = traveller.half_extents.abs();
            if half_extents != traveller.half_extents {
                warn!("traveller '{}' has negative half extents; using {half_extents}", traveller.name);
                traveller.half_extents = half_extents;
            }
        }
        self
    }

    /// Builds the world and reports the output resolution the host should use.
    pub fn build_world(&self) -> Result<(PortalWorld, UVec2), SceneConfigError> {
        let mut world = PortalWorld::new(self.viewer.camera());

        let mut portal_ids: FxHashMap<&str, PortalId> = FxHashMap::default();
        for portal in &self.portals {
            if portal_ids.contains_key(portal.name.as_str()) {
                return Err(SceneConfigError::DuplicatePortal(portal.name.clone()));
            }
            let id = world.add_portal(portal.desc());
            portal_ids.insert(portal.name.as_str(), id);
        }

        for (index, portal) in self.portals.iter().enumerate() {
            let Some(linked_name) = portal.linked.as_deref() else {
                continue;
            };
            let id = PortalId(index);
            let Some(&linked) = portal_ids.get(linked_name) else {
                return Err(SceneConfigError::UnknownLink {
                    portal: portal.name.clone(),
                    linked: linked_name.to_owned(),
                });
            };
            if self.portals[linked.0].linked.as_deref() != Some(portal.name.as_str()) {
                return Err(PairingError::Asymmetric { portal: id, linked }.into());
            }
            if id <= linked {
                world.link(id, linked)?;
            }
        }
        world.validate_pairing()?;

        let mut traveller_names: FxHashSet<&str> = FxHashSet::default();
        for traveller in &self.travellers {
            if !traveller_names.insert(traveller.name.as_str()) {
                return Err(SceneConfigError::DuplicateTraveller(traveller.name.clone()));
            }
            world.add_traveller(traveller.traveller());
        }

        Ok((world, UVec2::new(self.output.width, self.output.height)))
    }
}

fn euler_pose(position: Vec3, yaw: f32, pitch: f32, roll: f32) -> Pose {
    Pose::from_euler(position, yaw.to_radians(), pitch.to_radians(), roll.to_radians())
}

fn clamp_logged<T>(field: &str, value: T, min: T, max: T) -> T
where
    T: PartialOrd + Copy + fmt::Display,
{
    // NaN fails every comparison and falls back to the minimum.
    let clamped = if !(value >= min) {
        min
    } else if value > max {
        max
    } else {
        value
    };
    if clamped != value {
        warn!("{field} {value} out of range; using {clamped}");
    }
    clamped
}

fn default_output_width() -> u32 {
    1920
}

fn default_output_height() -> u32 {
    1080
}

fn default_fov() -> f32 {
    60.0
}

fn default_aspect() -> f32 {
    16.0 / 9.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

fn default_screen_size() -> Vec2 {
    Vec2::new(2.0, 3.0)
}

fn default_recursion_limit() -> u32 {
    DEFAULT_RECURSION_LIMIT
}

fn default_near_clip_offset() -> f32 {
    NearClipSettings::default().offset
}

fn default_near_clip_limit() -> f32 {
    NearClipSettings::default().limit
}

fn default_half_extents() -> Vec3 {
    Vec3::splat(0.5)
}
