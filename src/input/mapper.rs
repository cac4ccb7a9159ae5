use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{ControllerSnapshot, LogicalInput, PhysicalKey};
use crate::constants::keys;
use crate::error::{BackendError, ConfigResult};
use crate::persistence::{SettingValue, SettingsBackend};

/// One stored binding; the id stays raw so unknown entries can be skipped on load
#[derive(Debug, Serialize, Deserialize)]
struct StoredBinding {
    input: u32,
    key: PhysicalKey,
}

/// Forward table `logical input -> physical key`, kept in write order
///
/// The decode table is rebuilt from the forward table on demand. When two
/// inputs share a key, the one written last wins; re-binding an input counts
/// as a fresh write and moves it to the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputMapper {
    bindings: Vec<(LogicalInput, PhysicalKey)>,
}

impl InputMapper {
    /// Load the stored table; corrupt data yields an empty table
    pub fn load<B: SettingsBackend + ?Sized>(backend: &B) -> Self {
        let stored: Vec<StoredBinding> = match backend.value(keys::CONTROLLER_MAPPING) {
            None => return Self::default(),
            Some(SettingValue::Str(json)) => match serde_json::from_str(&json) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(key = keys::CONTROLLER_MAPPING, error = %e, "Controller mapping is corrupt, starting empty");
                    return Self::default();
                }
            },
            Some(_) => {
                warn!(key = keys::CONTROLLER_MAPPING, "Controller mapping has unexpected type, starting empty");
                return Self::default();
            }
        };

        let mut mapper = Self::default();
        for binding in stored {
            match LogicalInput::try_from(binding.input) {
                Ok(input) => mapper.bind(input, binding.key),
                Err(_) => warn!(input = binding.input, key = %binding.key, "Skipping binding for unknown input"),
            }
        }
        info!(bindings = mapper.bindings.len(), "Loaded controller mapping");
        mapper
    }

    fn bind(&mut self, input: LogicalInput, key: PhysicalKey) {
        self.bindings.retain(|(existing, _)| *existing != input);
        self.bindings.push((input, key));
    }

    fn commit<B: SettingsBackend + ?Sized>(&mut self, backend: &mut B, next: InputMapper) -> ConfigResult<()> {
        let stored: Vec<StoredBinding> = next
            .bindings
            .iter()
            .map(|(input, key)| StoredBinding { input: input.id(), key: *key })
            .collect();
        let json = serde_json::to_string(&stored).map_err(BackendError::from)?;
        backend.set_value(keys::CONTROLLER_MAPPING, SettingValue::Str(json))?;
        *self = next;
        Ok(())
    }

    /// Bind `input` to `key`, replacing its previous key
    pub fn set_mapping<B: SettingsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        input: LogicalInput,
        key: PhysicalKey,
    ) -> ConfigResult<()> {
        let mut next = self.clone();
        next.bind(input, key);
        self.commit(backend, next)?;
        info!(input = %input, key = %key, "Controller binding saved");
        Ok(())
    }

    /// Returns false (and writes nothing) when `input` had no binding
    pub fn clear_mapping<B: SettingsBackend + ?Sized>(&mut self, backend: &mut B, input: LogicalInput) -> ConfigResult<bool> {
        if self.key_for(input).is_none() {
            return Ok(false);
        }
        let mut next = self.clone();
        next.bindings.retain(|(existing, _)| *existing != input);
        self.commit(backend, next)?;
        info!(input = %input, "Controller binding cleared");
        Ok(true)
    }

    pub fn key_for(&self, input: LogicalInput) -> Option<PhysicalKey> {
        self.bindings.iter().find(|(i, _)| *i == input).map(|(_, key)| *key)
    }

    /// Configured bindings in write order
    pub fn encode_mapping(&self) -> Vec<(LogicalInput, PhysicalKey)> {
        self.bindings.clone()
    }

    /// Inverted table; on a shared key the later binding wins
    pub fn decode_mapping(&self) -> HashMap<PhysicalKey, LogicalInput> {
        let mut decode = HashMap::with_capacity(self.bindings.len());
        for (input, key) in &self.bindings {
            if let Some(previous) = decode.insert(*key, *input) {
                debug!(key = %key, shadowed = %previous, winner = %input, "Key bound to several inputs");
            }
        }
        decode
    }

    /// Decode a key event into the snapshot; returns the input it drove
    pub fn handle_key(&self, key: PhysicalKey, pressed: bool, snapshot: &mut ControllerSnapshot) -> Option<LogicalInput> {
        let input = self.decode_mapping().get(&key).copied()?;
        snapshot.apply(input, pressed);
        Some(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::persistence::MemoryBackend;

    const KEY_A: PhysicalKey = PhysicalKey(0x41);
    const KEY_B: PhysicalKey = PhysicalKey(0x42);
    const KEY_W: PhysicalKey = PhysicalKey(0x57);

    #[test]
    fn test_encode_mapping_only_configured_inputs() {
        let mut backend = MemoryBackend::new();
        let mut mapper = InputMapper::load(&backend);
        assert!(mapper.encode_mapping().is_empty());

        mapper.set_mapping(&mut backend, LogicalInput::Cross, KEY_A).unwrap();
        mapper.set_mapping(&mut backend, LogicalInput::LeftStickYUp, KEY_W).unwrap();
        assert_eq!(
            mapper.encode_mapping(),
            vec![(LogicalInput::Cross, KEY_A), (LogicalInput::LeftStickYUp, KEY_W)]
        );
    }

    #[test]
    fn test_set_mapping_overwrites() {
        let mut backend = MemoryBackend::new();
        let mut mapper = InputMapper::default();
        mapper.set_mapping(&mut backend, LogicalInput::Cross, KEY_A).unwrap();
        mapper.set_mapping(&mut backend, LogicalInput::Cross, KEY_B).unwrap();

        assert_eq!(mapper.encode_mapping(), vec![(LogicalInput::Cross, KEY_B)]);
        assert_eq!(mapper.decode_mapping().get(&KEY_A), None);
    }

    #[test]
    fn test_decode_conflict_later_insert_wins() {
        let mut backend = MemoryBackend::new();
        let mut mapper = InputMapper::default();
        mapper.set_mapping(&mut backend, LogicalInput::Cross, KEY_A).unwrap();
        mapper.set_mapping(&mut backend, LogicalInput::Moon, KEY_A).unwrap();
        assert_eq!(mapper.decode_mapping()[&KEY_A], LogicalInput::Moon);

        // Re-binding Cross is the newest write now
        mapper.set_mapping(&mut backend, LogicalInput::Cross, KEY_A).unwrap();
        assert_eq!(mapper.decode_mapping()[&KEY_A], LogicalInput::Cross);
    }

    #[test]
    fn test_reload_preserves_order() {
        let mut backend = MemoryBackend::new();
        let mut mapper = InputMapper::default();
        mapper.set_mapping(&mut backend, LogicalInput::R2, KEY_B).unwrap();
        mapper.set_mapping(&mut backend, LogicalInput::L2, KEY_B).unwrap();

        let reloaded = InputMapper::load(&backend);
        assert_eq!(reloaded, mapper);
        assert_eq!(reloaded.decode_mapping()[&KEY_B], LogicalInput::L2);
    }

    #[test]
    fn test_load_skips_unknown_inputs() {
        let mut backend = MemoryBackend::new();
        let json = r#"[{"input":1,"key":65},{"input":3,"key":66},{"input":4194304,"key":87}]"#;
        backend.set_value(keys::CONTROLLER_MAPPING, SettingValue::Str(json.into())).unwrap();

        let mapper = InputMapper::load(&backend);
        assert_eq!(
            mapper.encode_mapping(),
            vec![(LogicalInput::Cross, KEY_A), (LogicalInput::RightStickXUp, KEY_W)]
        );
    }

    #[test]
    fn test_failed_save_keeps_table() {
        let mut backend = MemoryBackend::new();
        let mut mapper = InputMapper::default();
        mapper.set_mapping(&mut backend, LogicalInput::Cross, KEY_A).unwrap();

        backend.fail_writes_to(keys::CONTROLLER_MAPPING);
        assert!(matches!(
            mapper.set_mapping(&mut backend, LogicalInput::Box, KEY_B),
            Err(ConfigError::Persistence(_))
        ));
        assert!(mapper.clear_mapping(&mut backend, LogicalInput::Cross).is_err());
        assert_eq!(mapper.encode_mapping(), vec![(LogicalInput::Cross, KEY_A)]);
    }

    #[test]
    fn test_clear_mapping() {
        let mut backend = MemoryBackend::new();
        let mut mapper = InputMapper::default();
        mapper.set_mapping(&mut backend, LogicalInput::Cross, KEY_A).unwrap();

        assert!(mapper.clear_mapping(&mut backend, LogicalInput::Cross).unwrap());
        assert!(!mapper.clear_mapping(&mut backend, LogicalInput::Cross).unwrap());
        assert!(InputMapper::load(&backend).encode_mapping().is_empty());
    }

    #[test]
    fn test_handle_key_drives_snapshot() {
        let mut backend = MemoryBackend::new();
        let mut mapper = InputMapper::default();
        mapper.set_mapping(&mut backend, LogicalInput::LeftStickYUp, KEY_W).unwrap();
        mapper.set_mapping(&mut backend, LogicalInput::Cross, KEY_A).unwrap();

        let mut snap = ControllerSnapshot::default();
        assert_eq!(mapper.handle_key(KEY_W, true, &mut snap), Some(LogicalInput::LeftStickYUp));
        assert_eq!(mapper.handle_key(KEY_A, true, &mut snap), Some(LogicalInput::Cross));
        assert_eq!(mapper.handle_key(KEY_B, true, &mut snap), None);
        assert_eq!(snap.active_inputs(), vec![LogicalInput::Cross, LogicalInput::LeftStickYUp]);

        mapper.handle_key(KEY_W, false, &mut snap);
        assert_eq!(snap.left_y, 0);
    }
}
