//! # Scan Session
//!
//! The coordinator and the state it owns: an address-keyed inventory of
//! discovered hosts, the probe lifecycle of each host, and the event stream
//! observers subscribe to.

mod coordinator;
mod events;
mod inventory;

pub use coordinator::{
    Coordinator, CoordinatorConfig, DiscoveryStatus, ProbeDispatch, ProbeHandle, ProbeOutcome, ProbeSummary,
    Snapshot,
};
pub use events::{InventoryEvent, SessionId, Subscription, SubscriptionId};
pub use inventory::{SessionInventory, Upsert};
