use aperture_shared::transform::{pairing_pose, Side};
use tracing::{debug, trace};

use crate::host::TravellerHooks;
use crate::traveller::{GraphicsClone, Teleport, TrackedTraveller};
use crate::world::{PortalId, PortalWorld, TravellerId};

impl PortalWorld {
    /// The collision system saw `traveller` start overlapping `portal`'s trigger volume.
    pub fn on_trigger_enter(&mut self, portal: PortalId, traveller: TravellerId, hooks: &mut dyn TravellerHooks) {
        self.begin_tracking(portal, traveller, hooks);
    }

    /// The collision system saw `traveller` stop overlapping `portal`'s trigger volume.
    pub fn on_trigger_exit(&mut self, portal_id: PortalId, traveller_id: TravellerId, hooks: &mut dyn TravellerHooks) {
        let Some(portal) = self.portals.get_mut(portal_id.0) else {
            return;
        };
        let Some(index) = portal
            .tracked
            .iter()
            .position(|record| record.traveller == traveller_id)
        else {
            return;
        };
        portal.tracked.remove(index);
        let portal_name = portal.name.clone();

        let Some(traveller) = self.travellers.get_mut(traveller_id.0) else {
            return;
        };
        hooks.exit_portal_threshold(traveller, portal_id);
        debug!(traveller = %traveller.name, portal = %portal_name, "left portal threshold");

        if self.tracking_portals(traveller_id).is_empty() {
            if let Some(traveller) = self.travellers.get_mut(traveller_id.0) {
                traveller.clear_slices();
            }
        }
    }

    /// Starts tracking unless the portal is unpaired or already tracks the traveller.
    pub(crate) fn begin_tracking(
        &mut self,
        portal_id: PortalId,
        traveller_id: TravellerId,
        hooks: &mut dyn TravellerHooks,
    ) -> bool {
        let Some(linked_id) = self.paired(portal_id) else {
            trace!(portal = %portal_id, "unpaired portal ignores travellers");
            return false;
        };
        if traveller_id.0 >= self.travellers.len() || self.portals[portal_id.0].is_tracking(traveller_id) {
            return false;
        }

        let portal_pose = self.portals[portal_id.0].pose;
        let pairing = pairing_pose(&portal_pose, &self.portals[linked_id.0].pose);

        let traveller = &mut self.travellers[traveller_id.0];
        hooks.enter_portal_threshold(traveller, portal_id);
        let record = TrackedTraveller {
            traveller: traveller_id,
            previous_offset: traveller.position() - portal_pose.position,
            clone: GraphicsClone {
                pose: pairing * traveller.pose,
            },
        };

        let portal = &mut self.portals[portal_id.0];
        debug!(traveller = %traveller.name, portal = %portal.name, "entered portal threshold");
        portal.tracked.push(record);
        true
    }

    /// One update step: teleports every tracked traveller that crossed its
    /// portal plane since the last step and moves the clones of the rest.
    pub fn update_travellers(&mut self, hooks: &mut dyn TravellerHooks) -> Vec<Teleport> {
        let mut teleports = Vec::new();

        for portal_index in 0..self.portals.len() {
            let portal_id = PortalId(portal_index);
            let Some(linked_id) = self.paired(portal_id) else {
                continue;
            };
            let from = self.portals[portal_index].pose;
            let pairing = pairing_pose(&from, &self.portals[linked_id.0].pose);
            let normal = from.forward();

            let mut index = 0;
            while index < self.portals[portal_index].tracked.len() {
                let record = self.portals[portal_index].tracked[index];
                let Some(traveller) = self.travellers.get(record.traveller.0) else {
                    self.portals[portal_index].tracked.remove(index);
                    continue;
                };

                let offset = traveller.position() - from.position;
                let side = Side::of_offset(offset, normal);
                let previous_side = Side::of_offset(record.previous_offset, normal);

                // Touching the plane is not a crossing; the last strict side is kept.
                let crossed = side != previous_side && side != Side::On && previous_side != Side::On;
                if !crossed {
                    let clone_pose = pairing * traveller.pose;
                    let record = &mut self.portals[portal_index].tracked[index];
                    record.clone.pose = clone_pose;
                    if side != Side::On || previous_side == Side::On {
                        record.previous_offset = offset;
                    }
                    index += 1;
                    continue;
                }

                let teleport = Teleport {
                    traveller: record.traveller,
                    from: portal_id,
                    to: linked_id,
                    pose: pairing * traveller.pose,
                    pairing,
                };
                self.portals[portal_index].tracked.remove(index);

                let traveller = &mut self.travellers[record.traveller.0];
                hooks.teleport(traveller, &teleport);
                debug!(
                    traveller = %traveller.name,
                    from = %self.portals[portal_index].name,
                    to = %self.portals[linked_id.0].name,
                    "teleported"
                );

                self.begin_tracking(linked_id, record.traveller, hooks);
                teleports.push(teleport);
            }
        }

        teleports
    }
}
