//! Connected-client registry.
//!
//! The transport layer owns client admission and removal; everything
//! reachable from scripts treats the registry as read-only apart from
//! vehicle deletion (`RemoveVehicle`) and the kick status flip
//! (`DropPlayer`). Vehicle payloads are stored exactly as received from the
//! wire, including the 3-byte transport prefix; the scripting surface strips
//! that prefix on the way out.

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

/// One connected game client.
pub struct Client {
    id: i64,
    name: String,
    guest: bool,
    connected: AtomicBool,
    synced: AtomicBool,
    status: AtomicI32,
    vehicles: Mutex<BTreeMap<i64, String>>,
}

impl Client {
    pub fn new(id: i64, name: impl Into<String>, guest: bool) -> Self {
        Self {
            id,
            name: name.into(),
            guest,
            connected: AtomicBool::new(true),
            synced: AtomicBool::new(false),
            status: AtomicI32::new(0),
            vehicles: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_guest(&self) -> bool {
        self.guest
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn set_connected(&self, on: bool) {
        self.connected.store(on, Ordering::Relaxed);
    }

    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Relaxed)
    }

    pub fn set_synced(&self, on: bool) {
        self.synced.store(on, Ordering::Relaxed);
    }

    pub fn status(&self) -> i32 {
        self.status.load(Ordering::Relaxed)
    }

    pub fn set_status(&self, status: i32) {
        self.status.store(status, Ordering::Relaxed);
    }

    pub fn add_vehicle(&self, vehicle_id: i64, data: impl Into<String>) {
        self.vehicles.lock().insert(vehicle_id, data.into());
    }

    pub fn vehicle_data(&self, vehicle_id: i64) -> Option<String> {
        self.vehicles.lock().get(&vehicle_id).cloned()
    }

    pub fn set_vehicle_data(&self, vehicle_id: i64, data: impl Into<String>) {
        if let Some(slot) = self.vehicles.lock().get_mut(&vehicle_id) {
            *slot = data.into();
        }
    }

    pub fn delete_vehicle(&self, vehicle_id: i64) {
        self.vehicles.lock().remove(&vehicle_id);
    }

    pub fn clear_vehicles(&self) {
        self.vehicles.lock().clear();
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.lock().len()
    }

    /// Ordered snapshot of (vehicle id, raw data) pairs.
    pub fn vehicles(&self) -> Vec<(i64, String)> {
        self.vehicles
            .lock()
            .iter()
            .map(|(id, data)| (*id, data.clone()))
            .collect()
    }

    /// Lowest vehicle id not currently in use, used by the transport when a
    /// client spawns a new vehicle.
    pub fn next_free_vehicle_id(&self) -> i64 {
        let vehicles = self.vehicles.lock();
        let mut candidate = 0;
        while vehicles.contains_key(&candidate) {
            candidate += 1;
        }
        candidate
    }
}

/// Lookup of connected clients, keyed by client id.
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<Vec<Arc<Client>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, client: Arc<Client>) {
        self.clients.write().push(client);
    }

    pub fn remove(&self, id: i64) {
        self.clients.write().retain(|c| c.id() != id);
    }

    pub fn get(&self, id: i64) -> Option<Arc<Client>> {
        self.clients.read().iter().find(|c| c.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Snapshot in admission order.
    pub fn snapshot(&self) -> Vec<Arc<Client>> {
        self.clients.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_and_removal() {
        let registry = ClientRegistry::new();
        registry.add(Arc::new(Client::new(0, "alice", false)));
        registry.add(Arc::new(Client::new(1, "bob", true)));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(1).map(|c| c.name().to_string()), Some("bob".into()));
        registry.remove(0);
        assert!(registry.get(0).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn vehicle_bookkeeping() {
        let client = Client::new(7, "carol", false);
        client.add_vehicle(0, "ABCdata0");
        client.add_vehicle(1, "ABCdata1");
        assert_eq!(client.vehicle_count(), 2);
        assert_eq!(client.next_free_vehicle_id(), 2);
        client.delete_vehicle(0);
        assert_eq!(client.next_free_vehicle_id(), 0);
        assert_eq!(client.vehicle_data(1).as_deref(), Some("ABCdata1"));
        client.clear_vehicles();
        assert_eq!(client.vehicle_count(), 0);
    }

    #[test]
    fn status_and_sync_flags() {
        let client = Client::new(3, "dan", false);
        assert!(!client.is_synced());
        client.set_synced(true);
        assert!(client.is_synced());
        client.set_status(-2);
        assert_eq!(client.status(), -2);
    }
}
