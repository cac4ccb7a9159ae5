//! Settings backends
//!
//! The store talks to persistence through [`SettingsBackend`], a flat
//! name -> value map with three primitive kinds. Reads always take a default;
//! a missing or mistyped value resolves to that default.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants;
use crate::error::BackendError;

/// A stored primitive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl SettingValue {
    /// Convert a JSON value read from disk; floats, nulls, arrays, objects and
    /// integers outside `i64` have no setting kind
    fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(SettingValue::Bool(b)),
            serde_json::Value::Number(n) => n.as_i64().map(SettingValue::Int),
            serde_json::Value::String(s) => Some(SettingValue::Str(s)),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "bool",
            SettingValue::Int(_) => "int",
            SettingValue::Str(_) => "string",
        }
    }
}

pub trait SettingsBackend {
    /// Raw stored value, `None` when the key was never written
    fn value(&self, name: &str) -> Option<SettingValue>;

    /// Durable on return; on error nothing was written
    fn set_value(&mut self, name: &str, value: SettingValue) -> Result<(), BackendError>;

    fn remove(&mut self, name: &str) -> Result<(), BackendError>;

    /// Every key currently stored
    fn keys(&self) -> Vec<String>;
}

/// Primitive kinds a preference may be stored as
pub trait SettingKind: Sized {
    fn from_value(value: &SettingValue) -> Option<Self>;
    fn into_value(self) -> SettingValue;
}

impl SettingKind for bool {
    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Bool(b) => Some(*b),
            // Text stores commonly hand booleans back as strings
            SettingValue::Str(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            SettingValue::Int(_) => None,
        }
    }

    fn into_value(self) -> SettingValue {
        SettingValue::Bool(self)
    }
}

impl SettingKind for i64 {
    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Int(i) => Some(*i),
            SettingValue::Str(s) => s.trim().parse().ok(),
            SettingValue::Bool(_) => None,
        }
    }

    fn into_value(self) -> SettingValue {
        SettingValue::Int(self)
    }
}

impl SettingKind for u32 {
    fn from_value(value: &SettingValue) -> Option<Self> {
        i64::from_value(value).and_then(|i| u32::try_from(i).ok())
    }

    fn into_value(self) -> SettingValue {
        SettingValue::Int(i64::from(self))
    }
}

impl SettingKind for String {
    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> SettingValue {
        SettingValue::Str(self)
    }
}

/// Read `name`, falling back to `default` when absent or of the wrong kind
pub fn read_or<T: SettingKind, B: SettingsBackend + ?Sized>(backend: &B, name: &str, default: T) -> T {
    match backend.value(name) {
        None => default,
        Some(value) => match T::from_value(&value) {
            Some(v) => v,
            None => {
                warn!(key = %name, stored = value.kind(), "Stored setting has unexpected type, using default");
                default
            }
        },
    }
}

/// Write `value` under `name`
pub fn write<T: SettingKind, B: SettingsBackend + ?Sized>(
    backend: &mut B,
    name: &str,
    value: T,
) -> Result<(), BackendError> {
    backend.set_value(name, value.into_value())
}

/// In-process backend used by tests and by callers that bring their own medium
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: BTreeMap<String, SettingValue>,
    failing_keys: HashSet<String>,
    fail_all: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `name` fail until cleared
    pub fn fail_writes_to(&mut self, name: &str) {
        self.failing_keys.insert(name.to_string());
    }

    /// Make every write fail until cleared
    pub fn fail_all_writes(&mut self, fail: bool) {
        self.fail_all = fail;
    }

    pub fn clear_failures(&mut self) {
        self.failing_keys.clear();
        self.fail_all = false;
    }

    fn check_writable(&self, name: &str) -> Result<(), BackendError> {
        if self.fail_all || self.failing_keys.contains(name) {
            return Err(BackendError::Rejected(name.to_string()));
        }
        Ok(())
    }
}

impl SettingsBackend for MemoryBackend {
    fn value(&self, name: &str) -> Option<SettingValue> {
        self.values.get(name).cloned()
    }

    fn set_value(&mut self, name: &str, value: SettingValue) -> Result<(), BackendError> {
        self.check_writable(name)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<(), BackendError> {
        self.check_writable(name)?;
        self.values.remove(name);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Flat JSON object on disk, rewritten on every set
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    values: BTreeMap<String, SettingValue>,
}

impl JsonFileBackend {
    /// Default settings file: `$RPLAY_CONFIG_DIR/settings.json` or the platform config dir
    pub fn default_path() -> PathBuf {
        let mut path = match std::env::var_os(constants::config::DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
                dir.push(constants::config::APP_DIR);
                dir
            }
        };
        path.push(constants::config::FILENAME);
        path
    }

    pub fn open_default() -> Result<Self, BackendError> {
        Self::open(Self::default_path())
    }

    /// Open the settings file, starting empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        if !path.exists() {
            info!(path = %path.display(), "Settings file not found, starting with defaults");
            return Ok(Self { path, values: BTreeMap::new() });
        }

        let contents = fs::read_to_string(&path)?;
        let raw: BTreeMap<String, serde_json::Value> = if contents.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&contents)?
        };

        let mut values = BTreeMap::new();
        for (key, value) in raw {
            match SettingValue::from_json(value) {
                Some(value) => {
                    values.insert(key, value);
                }
                None => warn!(key = %key, "Ignoring stored setting of unsupported type"),
            }
        }
        debug!(path = %path.display(), settings = values.len(), "Loaded settings file");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `values` to a sibling temp file and rename it over the settings file
    fn persist(&self, values: &BTreeMap<String, SettingValue>) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl SettingsBackend for JsonFileBackend {
    fn value(&self, name: &str) -> Option<SettingValue> {
        self.values.get(name).cloned()
    }

    fn set_value(&mut self, name: &str, value: SettingValue) -> Result<(), BackendError> {
        let mut next = self.values.clone();
        next.insert(name.to_string(), value);
        self.persist(&next)?;
        self.values = next;
        debug!(key = %name, "Setting written");
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<(), BackendError> {
        if !self.values.contains_key(name) {
            return Ok(());
        }
        let mut next = self.values.clone();
        next.remove(name);
        self.persist(&next)?;
        self.values = next;
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}
