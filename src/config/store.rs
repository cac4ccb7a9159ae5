//! ConfigStore: host registry, preferences and input mapping over one backend
//!
//! Registry and mapping are loaded once at construction; preferences are read
//! from the backend per call. Events fire only after a successful write.

use std::sync::mpsc::Sender;

use super::preferences::{Preferences, PreferencesMut};
use super::registry::HostRegistry;
use crate::error::ConfigResult;
use crate::events::{ChangeNotifier, ConfigEvent};
use crate::host::{HostMac, ManualHost, RegisteredHost};
use crate::input::{ControllerSnapshot, InputMapper, LogicalInput, PhysicalKey};
use crate::persistence::SettingsBackend;

#[derive(Debug)]
pub struct ConfigStore<B: SettingsBackend> {
    backend: B,
    registry: HostRegistry,
    mapper: InputMapper,
    notifier: ChangeNotifier,
}

impl<B: SettingsBackend> ConfigStore<B> {
    pub fn open(backend: B) -> Self {
        let registry = HostRegistry::load(&backend);
        let mapper = InputMapper::load(&backend);
        Self {
            backend,
            registry,
            mapper,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Direct backend access; tests use it to inject write failures
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    // ---- notifications ----

    pub fn subscribe(&mut self, listener: impl Fn(ConfigEvent) + Send + 'static) {
        self.notifier.subscribe(listener);
    }

    pub fn subscribe_channel(&mut self, sender: Sender<ConfigEvent>) {
        self.notifier.subscribe_channel(sender);
    }

    /// Number of change events emitted so far
    pub fn revision(&self) -> u64 {
        self.notifier.revision()
    }

    // ---- preferences ----

    pub fn preferences(&self) -> Preferences<'_, B> {
        Preferences::new(&self.backend)
    }

    pub fn preferences_mut(&mut self) -> PreferencesMut<'_, B> {
        PreferencesMut::new(&mut self.backend)
    }

    // ---- registered hosts ----

    pub fn list_registered(&self) -> Vec<RegisteredHost> {
        self.registry.list_registered()
    }

    pub fn is_registered(&self, mac: &HostMac) -> bool {
        self.registry.is_registered(mac)
    }

    pub fn registered(&self, mac: &HostMac) -> ConfigResult<RegisteredHost> {
        self.registry.registered(mac)
    }

    pub fn add_registered(&mut self, host: RegisteredHost) -> ConfigResult<()> {
        self.registry.add_registered(&mut self.backend, host)?;
        self.notifier.emit(ConfigEvent::RegisteredHostsChanged);
        Ok(())
    }

    pub fn remove_registered(&mut self, mac: &HostMac) -> ConfigResult<()> {
        if self.registry.remove_registered(&mut self.backend, mac)? {
            self.notifier.emit(ConfigEvent::RegisteredHostsChanged);
        }
        Ok(())
    }

    // ---- manual hosts ----

    pub fn list_manual(&self) -> Vec<ManualHost> {
        self.registry.list_manual()
    }

    pub fn manual_exists(&self, id: u32) -> bool {
        self.registry.manual_exists(id)
    }

    pub fn manual(&self, id: u32) -> ConfigResult<ManualHost> {
        self.registry.manual(id)
    }

    pub fn add_or_update_manual(&mut self, host: ManualHost) -> ConfigResult<u32> {
        let id = self.registry.add_or_update_manual(&mut self.backend, host)?;
        self.notifier.emit(ConfigEvent::ManualHostsChanged);
        Ok(id)
    }

    pub fn restore_manual(&mut self, host: ManualHost) -> ConfigResult<u32> {
        let id = self.registry.restore_manual(&mut self.backend, host)?;
        self.notifier.emit(ConfigEvent::ManualHostsChanged);
        Ok(id)
    }

    pub fn remove_manual(&mut self, id: u32) -> ConfigResult<()> {
        if self.registry.remove_manual(&mut self.backend, id)? {
            self.notifier.emit(ConfigEvent::ManualHostsChanged);
        }
        Ok(())
    }

    pub fn resolve_manual_registration(&self, id: u32) -> ConfigResult<Option<RegisteredHost>> {
        self.registry.resolve_manual_registration(id)
    }

    // ---- controller mapping ----

    pub fn set_mapping(&mut self, input: LogicalInput, key: PhysicalKey) -> ConfigResult<()> {
        self.mapper.set_mapping(&mut self.backend, input, key)?;
        self.notifier.emit(ConfigEvent::ControllerMappingChanged);
        Ok(())
    }

    pub fn clear_mapping(&mut self, input: LogicalInput) -> ConfigResult<()> {
        if self.mapper.clear_mapping(&mut self.backend, input)? {
            self.notifier.emit(ConfigEvent::ControllerMappingChanged);
        }
        Ok(())
    }

    pub fn encode_mapping(&self) -> Vec<(LogicalInput, PhysicalKey)> {
        self.mapper.encode_mapping()
    }

    pub fn decode_mapping(&self) -> std::collections::HashMap<PhysicalKey, LogicalInput> {
        self.mapper.decode_mapping()
    }

    pub fn handle_key(&self, key: PhysicalKey, pressed: bool, snapshot: &mut ControllerSnapshot) -> Option<LogicalInput> {
        self.mapper.handle_key(key, pressed, snapshot)
    }
}
