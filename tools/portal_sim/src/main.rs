use std::env;
use std::path::{Path, PathBuf};

use aperture_portal::config::SceneConfig;
use aperture_portal::frame::FrameStats;
use aperture_portal::host::{NoHooks, RenderHost, TextureHandle};
use aperture_portal::trigger::{trigger_channel, TriggerSender};
use aperture_portal::world::{PortalId, PortalWorld, TravellerId};
use aperture_shared::camera::Camera;
use glam::UVec2;
use rustc_hash::FxHashSet;
use tracing::{debug, info, trace};

const DEFAULT_FRAMES: u32 = 120;
const DEFAULT_DT: f32 = 1.0 / 60.0;

/// Render host with no GPU behind it: hands out texture ids and counts work.
struct HeadlessHost {
    resolution: UVec2,
    next_handle: u64,
    live_targets: usize,
    captures: u64,
}

impl HeadlessHost {
    fn new(resolution: UVec2) -> Self {
        Self {
            resolution,
            next_handle: 1,
            live_targets: 0,
            captures: 0,
        }
    }
}

impl RenderHost for HeadlessHost {
    fn output_resolution(&self) -> UVec2 {
        self.resolution
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> TextureHandle {
        let handle = TextureHandle(self.next_handle);
        self.next_handle += 1;
        self.live_targets += 1;
        debug!("allocated {width}x{height} target {}", handle.0);
        handle
    }

    fn release_render_target(&mut self, handle: TextureHandle) {
        self.live_targets = self.live_targets.saturating_sub(1);
        debug!("released target {}", handle.0);
    }

    fn render_camera(&mut self, camera: &Camera, target: TextureHandle, _world: &PortalWorld) {
        self.captures += 1;
        trace!(position = ?camera.position(), target = target.0, "capture");
    }
}

struct SimOptions {
    scene: PathBuf,
    frames: u32,
    dt: f32,
}

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let mut scene = None;
    let mut frames = DEFAULT_FRAMES;
    let mut dt = DEFAULT_DT;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--frames" => {
                let Some(value) = args.next() else {
                    eprintln!("--frames expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<u32>() {
                    Ok(parsed) => frames = parsed,
                    Err(err) => {
                        eprintln!("invalid frame count '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--dt" => {
                let Some(value) = args.next() else {
                    eprintln!("--dt expects a number of seconds");
                    std::process::exit(2);
                };
                match value.parse::<f32>() {
                    Ok(parsed) if parsed.is_finite() && parsed > 0.0 => dt = parsed,
                    Ok(parsed) => {
                        eprintln!("--dt must be positive, got {parsed}");
                        std::process::exit(2);
                    }
                    Err(err) => {
                        eprintln!("invalid time step '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--help" | "-h" => {
                println!("Usage: portal_sim <scene.toml> [--frames N] [--dt SECONDS]");
                return;
            }
            other if other.starts_with("--") => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
            other => {
                if scene.is_some() {
                    eprintln!("unexpected extra argument: {other}");
                    std::process::exit(2);
                }
                scene = Some(PathBuf::from(other));
            }
        }
    }

    let Some(scene) = scene else {
        eprintln!("Usage: portal_sim <scene.toml> [--frames N] [--dt SECONDS]");
        std::process::exit(2);
    };

    if let Err(err) = run(SimOptions { scene, frames, dt }) {
        eprintln!("portal_sim error: {err}");
        std::process::exit(1);
    }
}

fn run(options: SimOptions) -> Result<(), String> {
    let (mut world, resolution) = load_world(&options.scene)?;
    let mut host = HeadlessHost::new(resolution);
    let (triggers, receiver) = trigger_channel();
    let mut hooks = NoHooks;
    let mut overlaps = FxHashSet::default();

    let mut totals = FrameStats::default();
    let mut teleports = 0usize;

    for frame in 0..options.frames {
        advance_travellers(&mut world, options.dt);
        report_overlaps(&world, &triggers, &mut overlaps)?;

        for teleport in world.step(&receiver, &mut hooks) {
            teleports += 1;
            let name = world
                .traveller(teleport.traveller)
                .map(|traveller| traveller.name.as_str())
                .unwrap_or("?");
            info!("frame {frame}: '{name}' crossed {} -> {}", teleport.from, teleport.to);
        }

        let stats = world.render_portals(&mut host);
        debug!(
            frame,
            rendered = stats.portals_rendered,
            skipped = stats.portals_skipped,
            captures = stats.captures,
            "frame stats"
        );
        totals.portals_rendered += stats.portals_rendered;
        totals.portals_skipped += stats.portals_skipped;
        totals.captures += stats.captures;
    }

    world.release_render_targets(&mut host);

    println!("Scene: {}", options.scene.display());
    println!("Frames: {} (dt {:.4}s)", options.frames, options.dt);
    println!("Portal renders: {}", totals.portals_rendered);
    println!("Skipped renders: {}", totals.portals_skipped);
    println!("Captures: {}", totals.captures);
    println!("Teleports: {teleports}");
    println!("Leaked targets: {}", host.live_targets);
    for traveller in world.travellers() {
        let p = traveller.position();
        println!("  {} @ ({:.3}, {:.3}, {:.3})", traveller.name, p.x, p.y, p.z);
    }
    Ok(())
}

fn load_world(path: &Path) -> Result<(PortalWorld, UVec2), String> {
    let config = SceneConfig::load(path).map_err(|err| err.to_string())?;
    let (world, resolution) = config.build_world().map_err(|err| err.to_string())?;
    info!(
        "loaded {} portals and {} travellers from {}",
        world.portals().len(),
        world.travellers().len(),
        path.display()
    );
    Ok((world, resolution))
}

fn advance_travellers(world: &mut PortalWorld, dt: f32) {
    let ids: Vec<_> = world.traveller_ids().collect();
    for id in ids {
        if let Some(traveller) = world.traveller_mut(id) {
            traveller.pose.position += traveller.velocity * dt;
        }
    }
}

/// Stands in for the host's collision system and reports overlap edges.
fn report_overlaps(
    world: &PortalWorld,
    triggers: &TriggerSender,
    overlaps: &mut FxHashSet<(TravellerId, PortalId)>,
) -> Result<(), String> {
    for traveller_id in world.traveller_ids() {
        let Some(traveller) = world.traveller(traveller_id) else {
            continue;
        };
        for portal_id in world.portal_ids() {
            let Some(portal) = world.portal(portal_id) else {
                continue;
            };
            let inside = portal.overlaps_threshold(traveller);
            let key = (traveller_id, portal_id);
            let sent = if inside && overlaps.insert(key) {
                triggers.enter(traveller_id, portal_id)
            } else if !inside && overlaps.remove(&key) {
                triggers.exit(traveller_id, portal_id)
            } else {
                Ok(())
            };
            sent.map_err(|err| format!("trigger queue closed: {err}"))?;
        }
    }
    Ok(())
}
