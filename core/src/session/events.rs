use std::fmt;

use netsweep_common::error::CollaboratorError;
use netsweep_common::network::host::{HostKey, ProbeState};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};

use super::inventory::Upsert;

/// Identifies one discovery session. Strictly increasing per coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionId(pub(crate) u64);

impl SessionId {
    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State changes delivered to subscribers, in mutation order.
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryEvent {
    InventoryReset {
        session: SessionId,
    },
    HostUpserted {
        session: SessionId,
        address: HostKey,
        upsert: Upsert,
    },
    ProbeStateChanged {
        session: SessionId,
        address: HostKey,
        state: ProbeState,
        error: Option<CollaboratorError>,
    },
    DiscoveryFinished {
        session: SessionId,
        hosts: usize,
    },
    DiscoveryFailed {
        session: SessionId,
        error: CollaboratorError,
    },
}

impl InventoryEvent {
    pub fn session(&self) -> SessionId {
        match self {
            InventoryEvent::InventoryReset { session }
            | InventoryEvent::HostUpserted { session, .. }
            | InventoryEvent::ProbeStateChanged { session, .. }
            | InventoryEvent::DiscoveryFinished { session, .. }
            | InventoryEvent::DiscoveryFailed { session, .. } => *session,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving end of a coordinator subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: UnboundedReceiver<InventoryEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next event. `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<InventoryEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<InventoryEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Takes everything already queued without waiting.
    pub fn drain(&mut self) -> Vec<InventoryEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    next_id: u64,
    senders: Vec<(SubscriptionId, UnboundedSender<InventoryEvent>)>,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self) -> Subscription {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push((id, tx));
        Subscription { id, rx }
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.senders.len();
        self.senders.retain(|(sid, _)| *sid != id);
        self.senders.len() != before
    }

    /// Queues `event` for every live subscriber and forgets dropped ones.
    pub(crate) fn publish(&mut self, event: InventoryEvent) {
        self.senders.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
