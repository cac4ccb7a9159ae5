//! Configuration store for the streaming client
//!
//! - **registry**: registered (paired) hosts and manually added hosts
//! - **preferences**: per-key session preferences with declared defaults
//! - **store**: ConfigStore tying both to the input mapper and one backend

pub mod preferences;
pub mod registry;
pub mod store;

// Re-export commonly used types
pub use preferences::{
    Channel, ChannelEndpoint, Codec, Decoder, DisconnectAction, FpsPreset, HardwareDecoder, Preferences,
    PreferencesMut, ResolutionPreset, VideoProfile,
};
pub use registry::HostRegistry;
pub use store::ConfigStore;
