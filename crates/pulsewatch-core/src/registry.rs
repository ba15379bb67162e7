//! ServiceRegistry — the in-memory set of monitored services.
//!
//! Services are kept in insertion order and keyed by name. Each entry
//! carries its own `std::sync::Mutex`, so write-backs for different
//! services never contend; the outer `RwLock` is only taken for writing
//! when a service is added. Locks are never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::debug;

use crate::config::ServiceConfig;
use crate::types::{Service, ServiceStatus};

#[derive(Default)]
struct Entries {
    /// Insertion-ordered slots.
    slots: Vec<Arc<Mutex<Service>>>,
    /// name → index into `slots`.
    index: HashMap<String, usize>,
}

/// Thread-safe registry of monitored services.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: RwLock<Entries>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration, preserving declaration order.
    pub fn from_config(services: &[ServiceConfig]) -> Self {
        let registry = Self::new();
        for cfg in services {
            registry.add(Service::new(&cfg.name, &cfg.url, cfg.service_type()));
        }
        registry
    }

    /// Snapshot of a single service, or `None` if the name is unknown.
    pub fn get(&self, name: &str) -> Option<Service> {
        let slot = self.slot(name)?;
        let svc = lock(&slot).clone();
        Some(svc)
    }

    /// Snapshots of every service in insertion order.
    pub fn get_all(&self) -> Vec<Service> {
        let entries = self.read();
        entries.slots.iter().map(|slot| lock(slot).clone()).collect()
    }

    /// Service names in insertion order.
    pub fn names(&self) -> Vec<String> {
        let entries = self.read();
        entries.slots.iter().map(|slot| lock(slot).name.clone()).collect()
    }

    /// Update a service's status and diagnostic text.
    ///
    /// Unknown names are ignored. Returns the previous status when the
    /// service exists.
    pub fn update_status(
        &self,
        name: &str,
        status: ServiceStatus,
        error_message: Option<String>,
    ) -> Option<ServiceStatus> {
        let slot = self.slot(name)?;
        let mut svc = lock(&slot);
        let previous = svc.status;
        svc.update_status(status, error_message);
        Some(previous)
    }

    /// Insert a service, or overwrite the existing entry with the same name
    /// in place (keeping its position).
    pub fn add(&self, service: Service) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&i) = entries.index.get(&service.name) {
            debug!(service = %service.name, "service replaced");
            *lock(&entries.slots[i]) = service;
            return;
        }
        debug!(service = %service.name, url = %service.url, "service registered");
        let i = entries.slots.len();
        entries.index.insert(service.name.clone(), i);
        entries.slots.push(Arc::new(Mutex::new(service)));
    }

    pub fn len(&self) -> usize {
        self.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, name: &str) -> Option<Arc<Mutex<Service>>> {
        let entries = self.read();
        entries.index.get(name).map(|&i| entries.slots[i].clone())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock(slot: &Mutex<Service>) -> MutexGuard<'_, Service> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
