//! Registered and manual host registry
//!
//! Both maps and the manual id counter are saved as one JSON blob. Every
//! mutation is applied to a copy and only committed to memory after the
//! backend accepted the new blob.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::constants::keys;
use crate::error::{ConfigError, ConfigResult};
use crate::host::{HostMac, ManualHost, RegisteredHost};
use crate::persistence::{SettingValue, SettingsBackend};

/// On-disk form of the registry
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryBlob {
    #[serde(default)]
    registered_hosts: Vec<RegisteredHost>,
    #[serde(default)]
    manual_hosts: Vec<ManualHost>,
    #[serde(default)]
    manual_hosts_id_next: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostRegistry {
    registered: BTreeMap<HostMac, RegisteredHost>,
    manual: BTreeMap<u32, ManualHost>,
    next_manual_id: u32,
}

impl HostRegistry {
    /// Load the registry; a missing or corrupt blob yields an empty registry
    pub fn load<B: SettingsBackend + ?Sized>(backend: &B) -> Self {
        let blob = match backend.value(keys::HOST_REGISTRY) {
            None => return Self::default(),
            Some(SettingValue::Str(json)) => match serde_json::from_str::<RegistryBlob>(&json) {
                Ok(blob) => blob,
                Err(e) => {
                    warn!(key = keys::HOST_REGISTRY, error = %e, "Host registry is corrupt, starting empty");
                    return Self::default();
                }
            },
            Some(_) => {
                warn!(key = keys::HOST_REGISTRY, "Host registry has unexpected type, starting empty");
                return Self::default();
            }
        };

        let mut registry = Self {
            registered: BTreeMap::new(),
            manual: BTreeMap::new(),
            next_manual_id: blob.manual_hosts_id_next,
        };
        for host in blob.registered_hosts {
            registry.registered.insert(host.mac, host);
        }
        for host in blob.manual_hosts {
            match host.id {
                Some(id) => {
                    registry.manual.insert(id, host);
                }
                None => warn!(address = %host.address, "Dropping stored manual host without id"),
            }
        }

        // The counter must stay past every stored id, which u32::MAX cannot satisfy
        if let Some(host) = registry.manual.remove(&u32::MAX) {
            warn!(address = %host.address, "Dropping stored manual host with out-of-range id");
        }

        // Never re-issue an id that is already on disk
        if let Some(&max_id) = registry.manual.keys().next_back() {
            if registry.next_manual_id <= max_id {
                warn!(stored = registry.next_manual_id, max_id, "Manual host id counter behind stored ids, advancing");
                registry.next_manual_id = max_id + 1;
            }
        }

        info!(
            registered = registry.registered.len(),
            manual = registry.manual.len(),
            next_manual_id = registry.next_manual_id,
            "Loaded host registry"
        );
        registry
    }

    fn to_blob(&self) -> RegistryBlob {
        RegistryBlob {
            registered_hosts: self.registered.values().cloned().collect(),
            manual_hosts: self.manual.values().cloned().collect(),
            manual_hosts_id_next: self.next_manual_id,
        }
    }

    /// Write `next` as the whole registry and adopt it on success
    fn commit<B: SettingsBackend + ?Sized>(&mut self, backend: &mut B, next: HostRegistry) -> ConfigResult<()> {
        let json = serde_json::to_string(&next.to_blob()).map_err(crate::error::BackendError::from)?;
        backend.set_value(keys::HOST_REGISTRY, SettingValue::Str(json))?;
        *self = next;
        Ok(())
    }

    // ---- registered hosts ----

    pub fn list_registered(&self) -> Vec<RegisteredHost> {
        self.registered.values().cloned().collect()
    }

    pub fn is_registered(&self, mac: &HostMac) -> bool {
        self.registered.contains_key(mac)
    }

    pub fn registered(&self, mac: &HostMac) -> ConfigResult<RegisteredHost> {
        self.registered
            .get(mac)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(format!("registered host {mac}")))
    }

    /// Insert or overwrite by MAC
    pub fn add_registered<B: SettingsBackend + ?Sized>(&mut self, backend: &mut B, host: RegisteredHost) -> ConfigResult<()> {
        let mut next = self.clone();
        let mac = host.mac;
        let replaced = next.registered.insert(mac, host).is_some();
        self.commit(backend, next)?;
        info!(mac = %mac, replaced, "Registered host saved");
        Ok(())
    }

    /// Returns false (and writes nothing) when the MAC was not registered
    pub fn remove_registered<B: SettingsBackend + ?Sized>(&mut self, backend: &mut B, mac: &HostMac) -> ConfigResult<bool> {
        if !self.registered.contains_key(mac) {
            return Ok(false);
        }
        let mut next = self.clone();
        next.registered.remove(mac);
        self.commit(backend, next)?;
        info!(mac = %mac, "Registered host removed");
        Ok(true)
    }

    // ---- manual hosts ----

    pub fn list_manual(&self) -> Vec<ManualHost> {
        self.manual.values().cloned().collect()
    }

    pub fn manual_exists(&self, id: u32) -> bool {
        self.manual.contains_key(&id)
    }

    pub fn manual(&self, id: u32) -> ConfigResult<ManualHost> {
        self.manual
            .get(&id)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(format!("manual host {id}")))
    }

    pub fn next_manual_id(&self) -> u32 {
        self.next_manual_id
    }

    /// Allocate a fresh id when `host.id` is unset, otherwise overwrite the existing entry
    pub fn add_or_update_manual<B: SettingsBackend + ?Sized>(&mut self, backend: &mut B, mut host: ManualHost) -> ConfigResult<u32> {
        host.validate()?;
        let mut next = self.clone();

        let id = match host.id {
            Some(id) => {
                if !next.manual.contains_key(&id) {
                    return Err(ConfigError::NotFound(format!("manual host {id}")));
                }
                id
            }
            None => {
                let id = next.next_manual_id;
                next.next_manual_id = id
                    .checked_add(1)
                    .ok_or_else(|| ConfigError::InvalidArgument("manual host ids exhausted".to_string()))?;
                id
            }
        };

        host.id = Some(id);
        host.address = host.address.trim().to_string();
        next.manual.insert(id, host);
        self.commit(backend, next)?;
        info!(id, "Manual host saved");
        Ok(id)
    }

    /// Insert with a caller-chosen id (import path); the counter moves past it
    pub fn restore_manual<B: SettingsBackend + ?Sized>(&mut self, backend: &mut B, mut host: ManualHost) -> ConfigResult<u32> {
        host.validate()?;
        let id = host
            .id
            .ok_or_else(|| ConfigError::InvalidArgument("restored manual host needs an id".to_string()))?;

        let mut next = self.clone();
        if id >= next.next_manual_id {
            next.next_manual_id = id
                .checked_add(1)
                .ok_or_else(|| ConfigError::InvalidArgument("manual host ids exhausted".to_string()))?;
        }
        host.address = host.address.trim().to_string();
        next.manual.insert(id, host);
        self.commit(backend, next)?;
        info!(id, "Manual host restored");
        Ok(id)
    }

    /// Returns false (and writes nothing) when the id was not present
    pub fn remove_manual<B: SettingsBackend + ?Sized>(&mut self, backend: &mut B, id: u32) -> ConfigResult<bool> {
        if !self.manual.contains_key(&id) {
            return Ok(false);
        }
        let mut next = self.clone();
        next.manual.remove(&id);
        self.commit(backend, next)?;
        info!(id, "Manual host removed");
        Ok(true)
    }

    /// The registered host a manual entry points at, if it is still registered
    pub fn resolve_manual_registration(&self, id: u32) -> ConfigResult<Option<RegisteredHost>> {
        let host = self
            .manual
            .get(&id)
            .ok_or_else(|| ConfigError::NotFound(format!("manual host {id}")))?;
        Ok(host.registered_mac.and_then(|mac| self.registered.get(&mac).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBackend;

    fn mac(last: u8) -> HostMac {
        HostMac::new([0x00, 0x11, 0x22, 0x33, 0x44, last])
    }

    #[test]
    fn test_add_then_remove_registered() {
        let mut backend = MemoryBackend::new();
        let mut registry = HostRegistry::load(&backend);

        registry.add_registered(&mut backend, RegisteredHost::new(mac(1), "Living room")).unwrap();
        assert!(registry.is_registered(&mac(1)));
        assert_eq!(registry.registered(&mac(1)).unwrap().nickname, "Living room");

        assert!(registry.remove_registered(&mut backend, &mac(1)).unwrap());
        assert!(!registry.is_registered(&mac(1)));
        assert!(matches!(registry.registered(&mac(1)), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_add_registered_overwrites_by_mac() {
        let mut backend = MemoryBackend::new();
        let mut registry = HostRegistry::default();

        registry.add_registered(&mut backend, RegisteredHost::new(mac(1), "old")).unwrap();
        registry.add_registered(&mut backend, RegisteredHost::new(mac(1), "new")).unwrap();

        let hosts = registry.list_registered();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].nickname, "new");
    }

    #[test]
    fn test_remove_registered_absent_is_noop() {
        let mut backend = MemoryBackend::new();
        backend.fail_all_writes(true);
        let mut registry = HostRegistry::default();

        // No write happens, so the failing backend is never touched
        assert!(!registry.remove_registered(&mut backend, &mac(9)).unwrap());
        assert!(!registry.remove_manual(&mut backend, 3).unwrap());
    }

    #[test]
    fn test_manual_ids_never_reused() {
        let mut backend = MemoryBackend::new();
        let mut registry = HostRegistry::default();

        let a = registry.add_or_update_manual(&mut backend, ManualHost::new("10.0.0.2")).unwrap();
        let b = registry.add_or_update_manual(&mut backend, ManualHost::new("10.0.0.3")).unwrap();
        registry.remove_manual(&mut backend, b).unwrap();
        let c = registry.add_or_update_manual(&mut backend, ManualHost::new("10.0.0.4")).unwrap();

        assert_eq!((a, b, c), (0, 1, 2));
        assert!(!registry.manual_exists(b));
    }

    #[test]
    fn test_update_manual_requires_existing_id() {
        let mut backend = MemoryBackend::new();
        let mut registry = HostRegistry::default();
        let id = registry.add_or_update_manual(&mut backend, ManualHost::new("10.0.0.2")).unwrap();

        let mut host = registry.manual(id).unwrap();
        host.address = "10.0.0.99".to_string();
        assert_eq!(registry.add_or_update_manual(&mut backend, host).unwrap(), id);
        assert_eq!(registry.manual(id).unwrap().address, "10.0.0.99");

        let mut ghost = ManualHost::new("10.0.0.5");
        ghost.id = Some(42);
        assert!(matches!(registry.add_or_update_manual(&mut backend, ghost), Err(ConfigError::NotFound(_))));
        assert_eq!(registry.next_manual_id(), 1);
    }

    #[test]
    fn test_manual_rejects_bad_address() {
        let mut backend = MemoryBackend::new();
        let mut registry = HostRegistry::default();
        let result = registry.add_or_update_manual(&mut backend, ManualHost::new(""));
        assert!(matches!(result, Err(ConfigError::InvalidArgument(_))));
        assert_eq!(registry.next_manual_id(), 0);
    }

    #[test]
    fn test_restore_manual_advances_counter() {
        let mut backend = MemoryBackend::new();
        let mut registry = HostRegistry::default();

        let mut host = ManualHost::new("10.0.0.7");
        host.id = Some(10);
        registry.restore_manual(&mut backend, host).unwrap();

        let fresh = registry.add_or_update_manual(&mut backend, ManualHost::new("10.0.0.8")).unwrap();
        assert_eq!(fresh, 11);
        assert!(matches!(
            registry.restore_manual(&mut backend, ManualHost::new("10.0.0.9")),
            Err(ConfigError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_failed_save_keeps_state_and_counter() {
        let mut backend = MemoryBackend::new();
        let mut registry = HostRegistry::default();
        registry.add_registered(&mut backend, RegisteredHost::new(mac(1), "one")).unwrap();
        registry.add_or_update_manual(&mut backend, ManualHost::new("10.0.0.2")).unwrap();
        let before = registry.clone();
        let stored_before = backend.value(keys::HOST_REGISTRY);

        backend.fail_writes_to(keys::HOST_REGISTRY);
        assert!(matches!(
            registry.add_registered(&mut backend, RegisteredHost::new(mac(2), "two")),
            Err(ConfigError::Persistence(_))
        ));
        assert!(registry.add_or_update_manual(&mut backend, ManualHost::new("10.0.0.3")).is_err());
        assert!(registry.remove_registered(&mut backend, &mac(1)).is_err());

        assert_eq!(registry, before);
        assert_eq!(backend.value(keys::HOST_REGISTRY), stored_before);

        // The failed insert did not burn an id
        backend.clear_failures();
        assert_eq!(registry.add_or_update_manual(&mut backend, ManualHost::new("10.0.0.3")).unwrap(), 1);
    }

    #[test]
    fn test_reload_from_backend() {
        let mut backend = MemoryBackend::new();
        let mut registry = HostRegistry::default();
        registry.add_registered(&mut backend, RegisteredHost::new(mac(1), "one")).unwrap();
        let id = registry
            .add_or_update_manual(&mut backend, ManualHost::new("10.0.0.2").with_registration(mac(1)))
            .unwrap();
        registry.remove_manual(&mut backend, id).unwrap();
        registry.add_or_update_manual(&mut backend, ManualHost::new("10.0.0.3")).unwrap();

        let reloaded = HostRegistry::load(&backend);
        assert_eq!(reloaded, registry);
        assert_eq!(reloaded.next_manual_id(), 2);
    }

    #[test]
    fn test_load_corrupt_blob_is_empty() {
        let mut backend = MemoryBackend::new();
        backend.set_value(keys::HOST_REGISTRY, SettingValue::Str("{oops".into())).unwrap();
        assert_eq!(HostRegistry::load(&backend), HostRegistry::default());

        backend.set_value(keys::HOST_REGISTRY, SettingValue::Int(5)).unwrap();
        assert_eq!(HostRegistry::load(&backend), HostRegistry::default());
    }

    #[test]
    fn test_load_repairs_lagging_counter() {
        let mut backend = MemoryBackend::new();
        let json = r#"{"manual_hosts":[{"id":4,"address":"10.0.0.2"}],"manual_hosts_id_next":2}"#;
        backend.set_value(keys::HOST_REGISTRY, SettingValue::Str(json.into())).unwrap();

        let registry = HostRegistry::load(&backend);
        assert_eq!(registry.next_manual_id(), 5);
    }

    #[test]
    fn test_load_drops_manual_host_at_max_id() {
        let mut backend = MemoryBackend::new();
        let json = r#"{"manual_hosts":[{"id":0,"address":"10.0.0.1"},{"id":4294967295,"address":"10.0.0.9"}],"manual_hosts_id_next":0}"#;
        backend.set_value(keys::HOST_REGISTRY, SettingValue::Str(json.into())).unwrap();

        let mut registry = HostRegistry::load(&backend);
        assert!(!registry.manual_exists(u32::MAX));
        assert_eq!(registry.next_manual_id(), 1);

        let id = registry.add_or_update_manual(&mut backend, ManualHost::new("10.0.0.3")).unwrap();
        assert_eq!(id, 1);
        assert_eq!(registry.manual(0).unwrap().address, "10.0.0.1");
    }

    #[test]
    fn test_manual_registration_resolves_lazily() {
        let mut backend = MemoryBackend::new();
        let mut registry = HostRegistry::default();
        registry.add_registered(&mut backend, RegisteredHost::new(mac(1), "one")).unwrap();
        let id = registry
            .add_or_update_manual(&mut backend, ManualHost::new("10.0.0.2").with_registration(mac(1)))
            .unwrap();

        assert_eq!(registry.resolve_manual_registration(id).unwrap().map(|h| h.mac), Some(mac(1)));

        registry.remove_registered(&mut backend, &mac(1)).unwrap();
        // The reference stays on the manual entry but no longer resolves
        assert_eq!(registry.manual(id).unwrap().registered_mac, Some(mac(1)));
        assert_eq!(registry.resolve_manual_registration(id).unwrap(), None);
        assert!(registry.resolve_manual_registration(99).is_err());
    }
}
