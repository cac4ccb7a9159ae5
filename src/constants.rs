//! Application-wide constants
//!
//! Backend key names, preference defaults and file locations live here so the
//! store, the preferences view and the CLI agree on a single source of truth.

/// Config file location
pub mod config {
    /// Directory created under the platform config dir
    pub const APP_DIR: &str = "rplay-config";

    /// Settings file name inside APP_DIR
    pub const FILENAME: &str = "settings.json";

    /// Environment variable overriding the config directory
    pub const DIR_ENV: &str = "RPLAY_CONFIG_DIR";

    /// Environment variable selecting the log level for the CLI
    pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
}

/// Backend keys for the serialized blobs
pub mod keys {
    /// Registered + manual hosts, saved as one unit
    pub const HOST_REGISTRY: &str = "hosts/registry";

    /// Controller forward mapping table
    pub const CONTROLLER_MAPPING: &str = "controller/mapping";

    pub const AUTO_DISCOVERY: &str = "settings/auto_discovery";
    pub const LOG_VERBOSE: &str = "settings/log_verbose";
    pub const RESOLUTION: &str = "settings/resolution";
    pub const FPS: &str = "settings/fps";
    pub const BITRATE: &str = "settings/bitrate";
    pub const CODEC: &str = "settings/codec";
    pub const DECODER: &str = "settings/decoder";
    pub const HW_DECODER: &str = "settings/hw_decoder";
    pub const AUDIO_BUFFER_SIZE: &str = "settings/audio_buffer_size";
    pub const AUDIO_OUT_DEVICE: &str = "settings/audio_out_device";
    pub const DISCONNECT_ACTION: &str = "settings/disconnect_action";

    pub const EVENT_CHANNEL_ON: &str = "settings/zmq_on";
    pub const EVENT_CHANNEL_ADDR: &str = "settings/zmq_addr";
    pub const FRAME_CHANNEL_ON: &str = "settings/frame_zmq_on";
    pub const FRAME_CHANNEL_ADDR: &str = "settings/frame_zmq_addr";
    pub const COMMAND_CHANNEL_ON: &str = "settings/cmd_zmq_on";
    pub const COMMAND_CHANNEL_ADDR: &str = "settings/cmd_zmq_addr";
}

/// Declared preference defaults
pub mod defaults {
    pub const AUTO_DISCOVERY: bool = true;
    pub const LOG_VERBOSE: bool = false;

    /// 0 = derive from the resolution preset
    pub const BITRATE: u32 = 0;

    /// Effective audio buffer size (in samples) when the stored value is 0
    pub const AUDIO_BUFFER_SIZE: u32 = 9600;

    /// Not set means "probe for a hardware decoder"
    pub const HW_DECODER: &str = "auto";

    /// Empty = system default output device
    pub const AUDIO_OUT_DEVICE: &str = "";

    pub const EVENT_CHANNEL_ADDR: &str = "tcp://0.0.0.0:5553";
    pub const FRAME_CHANNEL_ADDR: &str = "tcp://0.0.0.0:5555";
    pub const COMMAND_CHANNEL_ADDR: &str = "tcp://0.0.0.0:5554";
    pub const CHANNEL_ENABLED: bool = true;

    /// Frame rate used when the fps preset is "automatic"
    pub const AUTOMATIC_FPS: u32 = 60;
}

/// Session log level bits (mask returned by the preferences view)
pub mod log_level {
    pub const ERROR: u32 = 1 << 0;
    pub const WARNING: u32 = 1 << 1;
    pub const INFO: u32 = 1 << 2;
    pub const VERBOSE: u32 = 1 << 3;
    pub const DEBUG: u32 = 1 << 4;
    pub const ALL: u32 = ERROR | WARNING | INFO | VERBOSE | DEBUG;
}

/// Controller snapshot limits
pub mod controller {
    /// Full press value for an analog trigger
    pub const TRIGGER_MAX: u8 = u8::MAX;

    /// Trigger magnitude at which L2/R2 count as pressed
    pub const TRIGGER_THRESHOLD: u8 = 0x40;

    /// Stick deflection at which a synthetic direction counts as active
    pub const STICK_DIRECTION_THRESHOLD: i16 = 0x3fff;
}
