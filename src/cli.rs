//! Command-line interface for inspecting and editing the settings file

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use rplay_config::config::{
    Channel, Codec, Decoder, DisconnectAction, FpsPreset, ResolutionPreset,
};
use rplay_config::constants;
use rplay_config::{
    ConfigStore, HostMac, HostTarget, JsonFileBackend, LogicalInput, ManualHost, PhysicalKey, RegisteredHost,
};

/// Inspect and edit the streaming client's hosts, preferences and controller mapping
#[derive(Parser, Debug)]
#[command(name = "rplay-config", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (overrides RPLAY_CONFIG_DIR and the platform default)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Registered (paired) hosts
    #[command(subcommand)]
    Hosts(HostsCommand),
    /// Manually added hosts
    #[command(subcommand)]
    Manual(ManualCommand),
    /// Session preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),
    /// Controller key bindings
    #[command(subcommand)]
    Mapping(MappingCommand),
}

#[derive(Subcommand, Debug)]
pub enum HostsCommand {
    List,
    Show { mac: String },
    /// Import a host record produced by registration
    Add(AddHostArgs),
    Remove { mac: String },
}

#[derive(Args, Debug)]
pub struct AddHostArgs {
    pub mac: String,
    #[arg(long, default_value = "")]
    pub nickname: String,
    /// ps4, ps5 or unknown
    #[arg(long, default_value = "unknown")]
    pub target: String,
}

#[derive(Subcommand, Debug)]
pub enum ManualCommand {
    List,
    Add {
        address: String,
        /// Associate with a registered host
        #[arg(long)]
        mac: Option<String>,
    },
    Update {
        id: u32,
        address: String,
        #[arg(long)]
        mac: Option<String>,
    },
    Remove { id: u32 },
}

#[derive(Subcommand, Debug)]
pub enum PrefsCommand {
    Show,
    /// Set one preference, e.g. `prefs set fps 30`
    Set { name: String, value: String },
}

#[derive(Subcommand, Debug)]
pub enum MappingCommand {
    Show,
    /// Bind an input (name or id) to a key code (decimal or 0x-hex)
    Set { input: String, key: String },
    Clear { input: String },
    /// List every logical input with its id
    Inputs,
}

impl Cli {
    pub fn settings_path(&self) -> PathBuf {
        match &self.config {
            Some(dir) => dir.join(constants::config::FILENAME),
            None => JsonFileBackend::default_path(),
        }
    }

    pub fn execute(self, store: &mut ConfigStore<JsonFileBackend>) -> Result<()> {
        let json = self.json;
        match self.command {
            Commands::Hosts(cmd) => hosts(cmd, store, json),
            Commands::Manual(cmd) => manual(cmd, store, json),
            Commands::Prefs(cmd) => prefs(cmd, store, json),
            Commands::Mapping(cmd) => mapping(cmd, store, json),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

fn parse_mac(text: &str) -> Result<HostMac> {
    text.parse().with_context(|| format!("Invalid MAC '{text}'"))
}

fn parse_target(text: &str) -> Result<HostTarget> {
    Ok(match text.to_ascii_lowercase().as_str() {
        "ps4" => HostTarget::Ps4,
        "ps5" => HostTarget::Ps5,
        "unknown" => HostTarget::Unknown,
        other => bail!("Unknown target '{other}' (expected ps4, ps5 or unknown)"),
    })
}

fn parse_u32(text: &str) -> Result<u32> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.with_context(|| format!("Invalid number '{text}'"))
}

fn parse_bool(text: &str) -> Result<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid boolean '{other}'"),
    }
}

/// Accepts an id or a name ignoring case, spaces and dashes ("left stick up", "dpad-left")
fn parse_input(text: &str) -> Result<LogicalInput> {
    if let Ok(id) = parse_u32(text) {
        return Ok(LogicalInput::try_from(id)?);
    }
    let normalize = |s: &str| {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase()
    };
    let wanted = normalize(text);
    LogicalInput::all()
        .find(|input| normalize(input.name()) == wanted)
        .with_context(|| format!("Unknown controller input '{text}'"))
}

fn hosts(cmd: HostsCommand, store: &mut ConfigStore<JsonFileBackend>, json: bool) -> Result<()> {
    match cmd {
        HostsCommand::List => {
            let hosts = store.list_registered();
            if json {
                return print_json(&hosts);
            }
            if hosts.is_empty() {
                println!("No registered hosts");
            }
            for host in hosts {
                println!("{}  {:<8}  {}", host.mac, format!("{:?}", host.target), host.nickname);
            }
        }
        HostsCommand::Show { mac } => {
            let host = store.registered(&parse_mac(&mac)?)?;
            print_json(&host)?;
        }
        HostsCommand::Add(args) => {
            let mut host = RegisteredHost::new(parse_mac(&args.mac)?, args.nickname);
            host.target = parse_target(&args.target)?;
            store.add_registered(host).context("Failed to save registered host")?;
        }
        HostsCommand::Remove { mac } => {
            store.remove_registered(&parse_mac(&mac)?).context("Failed to remove registered host")?;
        }
    }
    Ok(())
}

fn manual(cmd: ManualCommand, store: &mut ConfigStore<JsonFileBackend>, json: bool) -> Result<()> {
    match cmd {
        ManualCommand::List => {
            let hosts = store.list_manual();
            if json {
                return print_json(&hosts);
            }
            if hosts.is_empty() {
                println!("No manual hosts");
            }
            for host in hosts {
                let id = host.id.map(|id| id.to_string()).unwrap_or_default();
                let link = match host.registered_mac {
                    Some(mac) if store.is_registered(&mac) => format!("-> {mac}"),
                    Some(mac) => format!("-> {mac} (no longer registered)"),
                    None => String::new(),
                };
                println!("{id:>4}  {}  {link}", host.address);
            }
        }
        ManualCommand::Add { address, mac } => {
            let mut host = ManualHost::new(address);
            host.registered_mac = mac.as_deref().map(parse_mac).transpose()?;
            let id = store.add_or_update_manual(host).context("Failed to add manual host")?;
            println!("{id}");
        }
        ManualCommand::Update { id, address, mac } => {
            let mut host = store.manual(id)?;
            host.address = address;
            if let Some(mac) = mac {
                host.registered_mac = Some(parse_mac(&mac)?);
            }
            store.add_or_update_manual(host).context("Failed to update manual host")?;
        }
        ManualCommand::Remove { id } => {
            store.remove_manual(id).context("Failed to remove manual host")?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct PrefsView {
    auto_discovery: bool,
    log_verbose: bool,
    resolution: u32,
    fps: u32,
    bitrate: u32,
    codec: Codec,
    decoder: Decoder,
    hw_decoder: String,
    audio_buffer_size_raw: u32,
    audio_buffer_size: u32,
    audio_out_device: String,
    disconnect_action: DisconnectAction,
    endpoints: Vec<(Channel, rplay_config::config::ChannelEndpoint)>,
    video_profile: rplay_config::config::VideoProfile,
}

fn prefs(cmd: PrefsCommand, store: &mut ConfigStore<JsonFileBackend>, json: bool) -> Result<()> {
    match cmd {
        PrefsCommand::Show => {
            let p = store.preferences();
            let view = PrefsView {
                auto_discovery: p.discovery_enabled(),
                log_verbose: p.log_verbose(),
                resolution: p.resolution().lines(),
                fps: p.fps().raw(),
                bitrate: p.bitrate(),
                codec: p.codec(),
                decoder: p.decoder(),
                hw_decoder: p.hardware_decoder(),
                audio_buffer_size_raw: p.audio_buffer_size_raw(),
                audio_buffer_size: p.audio_buffer_size(),
                audio_out_device: p.audio_out_device(),
                disconnect_action: p.disconnect_action(),
                endpoints: Channel::ALL.into_iter().map(|c| (c, p.endpoint(c))).collect(),
                video_profile: p.video_profile(),
            };
            if json {
                return print_json(&view);
            }
            println!("auto_discovery     {}", view.auto_discovery);
            println!("log_verbose        {}", view.log_verbose);
            println!("resolution         {}p", view.resolution);
            println!("fps                {}", if view.fps == 0 { "auto".to_string() } else { view.fps.to_string() });
            println!("bitrate            {}", view.bitrate);
            println!("codec              {}", view.codec);
            println!("decoder            {}", view.decoder);
            println!("hw_decoder         {:?}", view.hw_decoder);
            println!("audio_buffer_size  {} (stored {})", view.audio_buffer_size, view.audio_buffer_size_raw);
            println!("audio_out_device   {:?}", view.audio_out_device);
            println!("disconnect_action  {}", view.disconnect_action);
            for (channel, endpoint) in &view.endpoints {
                let state = if endpoint.enabled { "on" } else { "off" };
                println!("{:<18} {} {}", format!("{channel}_channel"), state, endpoint.address);
            }
            let v = view.video_profile;
            println!("video_profile      {}x{} @{} {}kbps {}", v.width, v.height, v.max_fps, v.bitrate, v.codec);
        }
        PrefsCommand::Set { name, value } => {
            let mut p = store.preferences_mut();
            match name.as_str() {
                "auto_discovery" => p.set_discovery_enabled(parse_bool(&value)?)?,
                "log_verbose" => p.set_log_verbose(parse_bool(&value)?)?,
                "resolution" => {
                    let lines = parse_u32(value.trim_end_matches('p'))?;
                    let preset = ResolutionPreset::from_lines(lines)
                        .with_context(|| format!("Unsupported resolution '{value}'"))?;
                    p.set_resolution(preset)?
                }
                "fps" => {
                    let raw = if value == "auto" { 0 } else { parse_u32(&value)? };
                    let preset = FpsPreset::from_raw(raw).with_context(|| format!("Unsupported fps '{value}'"))?;
                    p.set_fps(preset)?
                }
                "bitrate" => p.set_bitrate(parse_u32(&value)?)?,
                "codec" => p.set_codec(value.parse()?)?,
                "decoder" => p.set_decoder(value.parse()?)?,
                "hw_decoder" => p.set_hardware_decoder(&value)?,
                "audio_buffer_size" => p.set_audio_buffer_size(parse_u32(&value)?)?,
                "audio_out_device" => p.set_audio_out_device(&value)?,
                "disconnect_action" => p.set_disconnect_action(value.parse()?)?,
                other => {
                    // <channel>_channel_on / <channel>_channel_addr
                    let Some((channel, field)) = other
                        .strip_suffix("_channel_on")
                        .map(|c| (c, "on"))
                        .or_else(|| other.strip_suffix("_channel_addr").map(|c| (c, "addr")))
                    else {
                        bail!("Unknown preference '{other}'");
                    };
                    let channel: Channel = channel.parse()?;
                    if field == "on" {
                        p.set_endpoint_enabled(channel, parse_bool(&value)?)?
                    } else {
                        p.set_endpoint_address(channel, &value)?
                    }
                }
            }
            info!(preference = %name, value = %value, "Preference updated");
        }
    }
    Ok(())
}

fn mapping(cmd: MappingCommand, store: &mut ConfigStore<JsonFileBackend>, json: bool) -> Result<()> {
    match cmd {
        MappingCommand::Show => {
            let table = store.encode_mapping();
            if json {
                return print_json(&table);
            }
            if table.is_empty() {
                println!("No controller bindings");
            }
            let decode = store.decode_mapping();
            for (input, key) in table {
                let shadowed = if decode.get(&key) != Some(&input) { "  (shadowed)" } else { "" };
                println!("{:<18} {key}{shadowed}", input.name());
            }
        }
        MappingCommand::Set { input, key } => {
            let input = parse_input(&input)?;
            let key = PhysicalKey(parse_u32(&key)?);
            store.set_mapping(input, key).context("Failed to save controller binding")?;
        }
        MappingCommand::Clear { input } => {
            store.clear_mapping(parse_input(&input)?).context("Failed to clear controller binding")?;
        }
        MappingCommand::Inputs => {
            for input in LogicalInput::all() {
                println!("{:#09x}  {}", input.id(), input.name());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_by_name_and_id() {
        assert_eq!(parse_input("cross").unwrap(), LogicalInput::Cross);
        assert_eq!(parse_input("D-Pad Left").unwrap(), LogicalInput::DpadLeft);
        assert_eq!(parse_input("left-stick-up").unwrap(), LogicalInput::LeftStickYUp);
        assert_eq!(parse_input("0x10000").unwrap(), LogicalInput::L2);
        assert_eq!(parse_input("1").unwrap(), LogicalInput::Cross);
        assert!(parse_input("3").is_err());
        assert!(parse_input("jump").is_err());
    }

    #[test]
    fn test_parse_bool_and_target() {
        assert!(parse_bool("on").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
        assert_eq!(parse_target("PS5").unwrap(), HostTarget::Ps5);
        assert!(parse_target("xbox").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["rplay-config", "--config", "/tmp/x", "mapping", "set", "cross", "0x20"]).unwrap();
        assert_eq!(cli.settings_path(), PathBuf::from("/tmp/x").join(constants::config::FILENAME));
        assert!(matches!(cli.command, Commands::Mapping(MappingCommand::Set { .. })));
    }
}
