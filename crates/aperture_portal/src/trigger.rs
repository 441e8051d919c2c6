use std::sync::mpsc;

use crate::host::TravellerHooks;
use crate::world::{PortalId, PortalWorld, TravellerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Enter { traveller: TravellerId, portal: PortalId },
    Exit { traveller: TravellerId, portal: PortalId },
}

pub struct TriggerSender {
    tx: mpsc::Sender<TriggerEvent>,
}

pub struct TriggerReceiver {
    rx: mpsc::Receiver<TriggerEvent>,
}

pub fn trigger_channel() -> (TriggerSender, TriggerReceiver) {
    let (tx, rx) = mpsc::channel();
    (TriggerSender { tx }, TriggerReceiver { rx })
}

impl Clone for TriggerSender {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl TriggerSender {
    pub fn send(&self, event: TriggerEvent) -> Result<(), mpsc::SendError<TriggerEvent>> {
        self.tx.send(event)
    }

    pub fn enter(&self, traveller: TravellerId, portal: PortalId) -> Result<(), mpsc::SendError<TriggerEvent>> {
        self.send(TriggerEvent::Enter { traveller, portal })
    }

    pub fn exit(&self, traveller: TravellerId, portal: PortalId) -> Result<(), mpsc::SendError<TriggerEvent>> {
        self.send(TriggerEvent::Exit { traveller, portal })
    }
}

impl TriggerReceiver {
    pub fn try_recv(&self) -> Result<TriggerEvent, mpsc::TryRecvError> {
        self.rx.try_recv()
    }

    pub fn try_iter(&self) -> mpsc::TryIter<'_, TriggerEvent> {
        self.rx.try_iter()
    }
}

impl PortalWorld {
    /// Applies every queued trigger notification. Returns how many were handled.
    pub fn apply_trigger_events(&mut self, receiver: &TriggerReceiver, hooks: &mut dyn TravellerHooks) -> usize {
        let mut applied = 0;
        for event in receiver.try_iter() {
            match event {
                TriggerEvent::Enter { traveller, portal } => self.on_trigger_enter(portal, traveller, hooks),
                TriggerEvent::Exit { traveller, portal } => self.on_trigger_exit(portal, traveller, hooks),
            }
            applied += 1;
        }
        applied
    }
}
