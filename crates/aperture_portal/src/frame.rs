use tracing::trace;

use crate::host::{RenderHost, TravellerHooks};
use crate::traveller::Teleport;
use crate::trigger::TriggerReceiver;
use crate::world::PortalWorld;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub portals_rendered: u32,
    pub portals_skipped: u32,
    pub captures: u32,
}

impl PortalWorld {
    /// Update phase: apply queued trigger notifications, then detect crossings.
    pub fn step(&mut self, triggers: &TriggerReceiver, hooks: &mut dyn TravellerHooks) -> Vec<Teleport> {
        self.apply_trigger_events(triggers, hooks);
        self.update_travellers(hooks)
    }

    /// Render phase, run once per frame before the primary camera draws.
    pub fn render_portals(&mut self, host: &mut dyn RenderHost) -> FrameStats {
        let ids: Vec<_> = self.portal_ids().collect();
        for &id in &ids {
            self.pre_portal_render(id);
        }

        let mut stats = FrameStats::default();
        for &id in &ids {
            let captures = self.render_portal(id, host);
            if captures > 0 {
                stats.portals_rendered += 1;
                stats.captures += captures;
            } else {
                stats.portals_skipped += 1;
            }
        }

        for &id in &ids {
            self.post_portal_render(id);
        }
        trace!(?stats, "portal frame done");
        stats
    }
}
