//! Session preferences
//!
//! Each preference lives under its own backend key and is read on demand.
//! Reads never fail: a missing, mistyped or unrecognized value resolves to the
//! declared default.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::constants::{defaults, keys, log_level};
use crate::error::{ConfigError, ConfigResult};
use crate::persistence::{read_or, write, SettingsBackend};

/// Video resolution presets, stored as their line count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ResolutionPreset {
    R360p,
    R540p,
    #[default]
    R720p,
    R1080p,
}

impl ResolutionPreset {
    pub const ALL: [ResolutionPreset; 4] = [Self::R360p, Self::R540p, Self::R720p, Self::R1080p];

    pub fn lines(self) -> u32 {
        match self {
            Self::R360p => 360,
            Self::R540p => 540,
            Self::R720p => 720,
            Self::R1080p => 1080,
        }
    }

    pub fn from_lines(lines: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.lines() == lines)
    }

    /// (width, height, bitrate in kbit/s)
    fn stream_params(self) -> (u32, u32, u32) {
        match self {
            Self::R360p => (640, 360, 2000),
            Self::R540p => (960, 540, 6000),
            Self::R720p => (1280, 720, 10000),
            Self::R1080p => (1920, 1080, 15000),
        }
    }
}

/// Framerate presets; 0 on disk means automatic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FpsPreset {
    Automatic,
    Fps30,
    #[default]
    Fps60,
}

impl FpsPreset {
    pub const ALL: [FpsPreset; 3] = [Self::Automatic, Self::Fps30, Self::Fps60];

    pub fn raw(self) -> u32 {
        match self {
            Self::Automatic => 0,
            Self::Fps30 => 30,
            Self::Fps60 => 60,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.raw() == raw)
    }
}

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        // Same text as stored on disk
        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ConfigError::InvalidArgument(format!(
                        concat!("unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    #[default]
    H264,
    H265,
    H265Hdr,
}

string_enum!(Codec { H264 => "h264", H265 => "h265", H265Hdr => "h265_hdr" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decoder {
    #[default]
    Ffmpeg,
    Pi,
}

string_enum!(Decoder { Ffmpeg => "ffmpeg", Pi => "pi" });

/// What to do with the host when the stream is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisconnectAction {
    AlwaysNothing,
    AlwaysSleep,
    #[default]
    Ask,
}

string_enum!(DisconnectAction { AlwaysNothing => "nothing", AlwaysSleep => "sleep", Ask => "ask" });

/// Interpretation of the stored hardware decoder name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HardwareDecoder {
    /// Not set, or literally "auto": probe for a hardware decoder
    Auto,
    /// Explicit empty string: software decoding
    Software,
    Named(String),
}

/// Auxiliary messaging channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Event,
    Frame,
    Command,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Self::Event, Self::Frame, Self::Command];

    fn keys(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Event => (keys::EVENT_CHANNEL_ON, keys::EVENT_CHANNEL_ADDR, defaults::EVENT_CHANNEL_ADDR),
            Self::Frame => (keys::FRAME_CHANNEL_ON, keys::FRAME_CHANNEL_ADDR, defaults::FRAME_CHANNEL_ADDR),
            Self::Command => (keys::COMMAND_CHANNEL_ON, keys::COMMAND_CHANNEL_ADDR, defaults::COMMAND_CHANNEL_ADDR),
        }
    }
}

string_enum!(Channel { Event => "event", Frame => "frame", Command => "command" });

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelEndpoint {
    pub enabled: bool,
    pub address: String,
}

/// Resolved stream parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoProfile {
    pub width: u32,
    pub height: u32,
    pub max_fps: u32,
    pub bitrate: u32,
    pub codec: Codec,
}

/// Check `scheme://host:port`
pub fn validate_endpoint_address(address: &str) -> ConfigResult<()> {
    let invalid = |why: &str| ConfigError::InvalidArgument(format!("endpoint '{address}': {why}"));

    let (scheme, rest) = address.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("bad scheme"));
    }
    let (host, port) = rest.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
    if host.is_empty() || host.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(invalid("bad host"));
    }
    if port != "*" {
        port.parse::<u16>().map_err(|_| invalid("bad port"))?;
    }
    Ok(())
}

/// Read-only preferences over a borrowed backend
pub struct Preferences<'a, B: SettingsBackend + ?Sized> {
    backend: &'a B,
}

/// Read-write preferences over a borrowed backend
pub struct PreferencesMut<'a, B: SettingsBackend + ?Sized> {
    backend: &'a mut B,
}

/// Getters shared by both views
macro_rules! preference_getters {
    () => {
        pub fn discovery_enabled(&self) -> bool {
            read_or(&*self.backend, keys::AUTO_DISCOVERY, defaults::AUTO_DISCOVERY)
        }

        pub fn log_verbose(&self) -> bool {
            read_or(&*self.backend, keys::LOG_VERBOSE, defaults::LOG_VERBOSE)
        }

        /// Enabled session log levels
        pub fn log_level_mask(&self) -> u32 {
            if self.log_verbose() {
                log_level::ALL
            } else {
                log_level::ALL & !log_level::VERBOSE
            }
        }

        pub fn resolution(&self) -> ResolutionPreset {
            let raw = read_or(&*self.backend, keys::RESOLUTION, ResolutionPreset::default().lines());
            ResolutionPreset::from_lines(raw).unwrap_or_else(|| {
                warn!(key = keys::RESOLUTION, raw, "Unknown resolution preset, using default");
                ResolutionPreset::default()
            })
        }

        /// `FpsPreset::Automatic` when stored as 0
        pub fn fps(&self) -> FpsPreset {
            let raw = read_or(&*self.backend, keys::FPS, FpsPreset::default().raw());
            FpsPreset::from_raw(raw).unwrap_or_else(|| {
                warn!(key = keys::FPS, raw, "Unknown fps preset, using default");
                FpsPreset::default()
            })
        }

        /// 0 = derive from resolution
        pub fn bitrate(&self) -> u32 {
            read_or(&*self.backend, keys::BITRATE, defaults::BITRATE)
        }

        pub fn codec(&self) -> Codec {
            self.parsed(keys::CODEC)
        }

        pub fn decoder(&self) -> Decoder {
            self.parsed(keys::DECODER)
        }

        pub fn disconnect_action(&self) -> DisconnectAction {
            self.parsed(keys::DISCONNECT_ACTION)
        }

        pub fn hardware_decoder(&self) -> String {
            read_or(&*self.backend, keys::HW_DECODER, defaults::HW_DECODER.to_string())
        }

        pub fn hardware_decoder_choice(&self) -> HardwareDecoder {
            let name = self.hardware_decoder();
            match name.as_str() {
                "" => HardwareDecoder::Software,
                defaults::HW_DECODER => HardwareDecoder::Auto,
                _ => HardwareDecoder::Named(name),
            }
        }

        pub fn audio_buffer_size_default(&self) -> u32 {
            defaults::AUDIO_BUFFER_SIZE
        }

        /// 0 = automatic
        pub fn audio_buffer_size_raw(&self) -> u32 {
            read_or(&*self.backend, keys::AUDIO_BUFFER_SIZE, 0u32)
        }

        /// Size to actually use
        pub fn audio_buffer_size(&self) -> u32 {
            match self.audio_buffer_size_raw() {
                0 => self.audio_buffer_size_default(),
                raw => raw,
            }
        }

        /// Empty = system default device
        pub fn audio_out_device(&self) -> String {
            read_or(&*self.backend, keys::AUDIO_OUT_DEVICE, defaults::AUDIO_OUT_DEVICE.to_string())
        }

        pub fn endpoint(&self, channel: Channel) -> ChannelEndpoint {
            let (on_key, addr_key, default_addr) = channel.keys();
            ChannelEndpoint {
                enabled: read_or(&*self.backend, on_key, defaults::CHANNEL_ENABLED),
                address: read_or(&*self.backend, addr_key, default_addr.to_string()),
            }
        }

        /// Resolution preset, then fps preset, then bitrate override
        pub fn video_profile(&self) -> VideoProfile {
            let (width, height, preset_bitrate) = self.resolution().stream_params();
            let max_fps = match self.fps() {
                FpsPreset::Automatic => defaults::AUTOMATIC_FPS,
                preset => preset.raw(),
            };
            let bitrate = match self.bitrate() {
                0 => preset_bitrate,
                custom => custom,
            };
            VideoProfile {
                width,
                height,
                max_fps,
                bitrate,
                codec: self.codec(),
            }
        }

        fn parsed<T: FromStr + Default>(&self, key: &str) -> T {
            let text = read_or(&*self.backend, key, String::new());
            if text.is_empty() {
                return T::default();
            }
            text.parse().unwrap_or_else(|_| {
                warn!(key = %key, value = %text, "Unrecognized stored value, using default");
                T::default()
            })
        }
    };
}

impl<'a, B: SettingsBackend + ?Sized> Preferences<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    preference_getters!();
}

impl<'a, B: SettingsBackend + ?Sized> PreferencesMut<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        Self { backend }
    }

    preference_getters!();

    pub fn set_discovery_enabled(&mut self, enabled: bool) -> ConfigResult<()> {
        Ok(write(&mut *self.backend, keys::AUTO_DISCOVERY, enabled)?)
    }

    pub fn set_log_verbose(&mut self, enabled: bool) -> ConfigResult<()> {
        Ok(write(&mut *self.backend, keys::LOG_VERBOSE, enabled)?)
    }

    pub fn set_resolution(&mut self, resolution: ResolutionPreset) -> ConfigResult<()> {
        Ok(write(&mut *self.backend, keys::RESOLUTION, resolution.lines())?)
    }

    pub fn set_fps(&mut self, fps: FpsPreset) -> ConfigResult<()> {
        Ok(write(&mut *self.backend, keys::FPS, fps.raw())?)
    }

    pub fn set_bitrate(&mut self, bitrate: u32) -> ConfigResult<()> {
        Ok(write(&mut *self.backend, keys::BITRATE, bitrate)?)
    }

    pub fn set_codec(&mut self, codec: Codec) -> ConfigResult<()> {
        Ok(write(&mut *self.backend, keys::CODEC, codec.as_str().to_string())?)
    }

    pub fn set_decoder(&mut self, decoder: Decoder) -> ConfigResult<()> {
        Ok(write(&mut *self.backend, keys::DECODER, decoder.as_str().to_string())?)
    }

    pub fn set_disconnect_action(&mut self, action: DisconnectAction) -> ConfigResult<()> {
        Ok(write(&mut *self.backend, keys::DISCONNECT_ACTION, action.as_str().to_string())?)
    }

    /// Empty string selects software decoding
    pub fn set_hardware_decoder(&mut self, name: &str) -> ConfigResult<()> {
        Ok(write(&mut *self.backend, keys::HW_DECODER, name.to_string())?)
    }

    /// 0 = automatic
    pub fn set_audio_buffer_size(&mut self, size: u32) -> ConfigResult<()> {
        Ok(write(&mut *self.backend, keys::AUDIO_BUFFER_SIZE, size)?)
    }

    pub fn set_audio_out_device(&mut self, device: &str) -> ConfigResult<()> {
        Ok(write(&mut *self.backend, keys::AUDIO_OUT_DEVICE, device.to_string())?)
    }

    pub fn set_endpoint_enabled(&mut self, channel: Channel, enabled: bool) -> ConfigResult<()> {
        let (on_key, _, _) = channel.keys();
        Ok(write(&mut *self.backend, on_key, enabled)?)
    }

    pub fn set_endpoint_address(&mut self, channel: Channel, address: &str) -> ConfigResult<()> {
        validate_endpoint_address(address)?;
        let (_, addr_key, _) = channel.keys();
        Ok(write(&mut *self.backend, addr_key, address.to_string())?)
    }
}
