//! Host identity and host records
//!
//! Registered hosts come out of the pairing flow and are keyed by hardware
//! address. Manual hosts are user-entered addresses keyed by a local id.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// 6-byte hardware address identifying a registered host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostMac([u8; 6]);

impl HostMac {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for HostMac {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for HostMac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` or bare `aabbccddeeff`
impl FromStr for HostMac {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidArgument(format!("malformed hardware address '{s}'"));

        let text = s.trim().as_bytes();
        let digits: Vec<u8> = match text.len() {
            12 => text.to_vec(),
            // Separator after every octet, one kind throughout
            17 => {
                let sep = text[2];
                if sep != b':' && sep != b'-' {
                    return Err(invalid());
                }
                let mut digits = Vec::with_capacity(12);
                for (i, &b) in text.iter().enumerate() {
                    if i % 3 == 2 {
                        if b != sep {
                            return Err(invalid());
                        }
                    } else {
                        digits.push(b);
                    }
                }
                digits
            }
            _ => return Err(invalid()),
        };

        let mut bytes = [0u8; 6];
        hex::decode_to_slice(&digits, &mut bytes).map_err(|_| invalid())?;
        Ok(Self(bytes))
    }
}

impl Serialize for HostMac {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HostMac {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Console generation reported by the pairing flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostTarget {
    Ps4,
    Ps5,
    #[default]
    Unknown,
}

/// Credential material handed over by registration; opaque to the store
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostCredentials {
    #[serde(default)]
    pub ap_ssid: String,
    #[serde(default)]
    pub ap_bssid: String,
    #[serde(default)]
    pub ap_key: String,
    #[serde(default)]
    pub ap_name: String,
    /// Hex-encoded registration key
    #[serde(default)]
    pub regist_key: String,
    #[serde(default)]
    pub rp_key_type: u32,
    /// Hex-encoded remote-play key
    #[serde(default)]
    pub rp_key: String,
}

/// A paired host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredHost {
    pub mac: HostMac,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub target: HostTarget,
    #[serde(default)]
    pub credentials: HostCredentials,
}

impl RegisteredHost {
    pub fn new(mac: HostMac, nickname: impl Into<String>) -> Self {
        Self {
            mac,
            nickname: nickname.into(),
            target: HostTarget::default(),
            credentials: HostCredentials::default(),
        }
    }
}

/// A user-entered host address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualHost {
    /// `None` until the registry assigns one
    #[serde(default)]
    pub id: Option<u32>,
    pub address: String,
    /// Optional link to a registered host, resolved lazily
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_mac: Option<HostMac>,
}

impl ManualHost {
    /// New entry without an id
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            id: None,
            address: address.into(),
            registered_mac: None,
        }
    }

    pub fn with_registration(mut self, mac: HostMac) -> Self {
        self.registered_mac = Some(mac);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let address = self.address.trim();
        if address.is_empty() || address.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidArgument(format!(
                "manual host address '{}' is not a host name or IP",
                self.address
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_parse_and_display() {
        let mac: HostMac = "AA:bb:01:02:03:ff".parse().unwrap();
        assert_eq!(mac.bytes(), [0xaa, 0xbb, 0x01, 0x02, 0x03, 0xff]);
        assert_eq!(mac.to_string(), "aa:bb:01:02:03:ff");

        assert_eq!("aa-bb-01-02-03-ff".parse::<HostMac>().unwrap(), mac);
        assert_eq!("aabb010203ff".parse::<HostMac>().unwrap(), mac);
    }

    #[test]
    fn test_mac_parse_rejects_malformed() {
        let malformed = [
            "",
            "aa:bb",
            "aa:bb:cc:dd:ee:gg",
            "aa:bb:cc:dd:ee:ff:00",
            "aab:bcc:dd:ee:ff",
            "é1:22:33:44:55:66",
            "+a:bb:cc:dd:ee:ff",
            "aab:bcc:dd:ee:f:f",
            "a:a:bbccddeeff:::",
            "aa:bb-cc:dd:ee:ff",
            "+abbccddeeff",
            "aa:bb:cc:dd:ee:f ",
        ];
        for bad in malformed {
            assert!(
                matches!(bad.parse::<HostMac>(), Err(ConfigError::InvalidArgument(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_mac_serializes_as_string() {
        let mac = HostMac::new([1, 2, 3, 4, 5, 6]);
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"01:02:03:04:05:06\"");
        assert_eq!(serde_json::from_str::<HostMac>(&json).unwrap(), mac);
    }

    #[test]
    fn test_manual_host_validation() {
        assert!(ManualHost::new("192.168.1.20").validate().is_ok());
        assert!(ManualHost::new("ps5.lan").validate().is_ok());
        assert!(ManualHost::new("   ").validate().is_err());
        assert!(ManualHost::new("my host").validate().is_err());
    }

    #[test]
    fn test_registered_host_defaults_on_sparse_json() {
        let host: RegisteredHost = serde_json::from_str(r#"{"mac":"00:11:22:33:44:55"}"#).unwrap();
        assert_eq!(host.nickname, "");
        assert_eq!(host.target, HostTarget::Unknown);
        assert_eq!(host.credentials, HostCredentials::default());
    }
}
