#![forbid(unsafe_code)]

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod host;
pub mod input;
pub mod persistence;

pub use config::ConfigStore;
pub use error::{BackendError, ConfigError, ConfigResult};
pub use events::ConfigEvent;
pub use host::{HostCredentials, HostMac, HostTarget, ManualHost, RegisteredHost};
pub use input::{ControllerSnapshot, LogicalInput, PhysicalKey};
pub use persistence::{JsonFileBackend, MemoryBackend, SettingValue, SettingsBackend};
