use std::collections::HashMap;

use netsweep_common::error::ConsistencyViolation;
use netsweep_common::network::host::{HostFound, HostKey, HostRecord};

/// What an upsert did to the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Hosts of one session, in discovery order, indexed by address.
#[derive(Debug, Clone, Default)]
pub struct SessionInventory {
    hosts: Vec<HostRecord>,
    index: HashMap<HostKey, usize>,
}

impl SessionInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn contains(&self, key: HostKey) -> bool {
        self.index.contains_key(&key)
    }

    pub fn get(&self, key: HostKey) -> Result<Option<&HostRecord>, ConsistencyViolation> {
        Ok(self.locate(key)?.map(|slot| &self.hosts[slot]))
    }

    pub fn get_mut(&mut self, key: HostKey) -> Result<Option<&mut HostRecord>, ConsistencyViolation> {
        Ok(self.locate(key)?.map(|slot| &mut self.hosts[slot]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostRecord> {
        self.hosts.iter()
    }

    /// Addresses in insertion order.
    pub fn keys(&self) -> Vec<HostKey> {
        self.hosts.iter().map(|host| host.address).collect()
    }

    /// Merges a discovery reply. An existing record only gets its link
    /// address refreshed; ports and probe state stay as they are.
    pub fn upsert(&mut self, found: HostFound) -> Result<Upsert, ConsistencyViolation> {
        if let Some(host) = self.get_mut(found.address)? {
            host.link_address = found.link_address;
            return Ok(Upsert::Updated);
        }
        self.insert(HostRecord::from(found))?;
        Ok(Upsert::Inserted)
    }

    pub(crate) fn insert(&mut self, record: HostRecord) -> Result<(), ConsistencyViolation> {
        if self.index.contains_key(&record.address) {
            return Err(ConsistencyViolation::DuplicateKey(record.address));
        }
        self.index.insert(record.address, self.hosts.len());
        self.hosts.push(record);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn repoint(&mut self, key: HostKey, slot: usize) {
        self.index.insert(key, slot);
    }

    fn locate(&self, key: HostKey) -> Result<Option<usize>, ConsistencyViolation> {
        let Some(&slot) = self.index.get(&key) else {
            return Ok(None);
        };
        match self.hosts.get(slot) {
            Some(host) if host.address == key => Ok(Some(slot)),
            _ => Err(ConsistencyViolation::IndexOutOfSync { address: key, slot }),
        }
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
