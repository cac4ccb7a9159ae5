//! Controller inputs and their key bindings
//!
//! Logical inputs are single-bit identifiers. Native buttons and the two
//! analog buttons use the low bits; the eight synthetic stick directions sit
//! directly above them so a bit test against a native mask never matches a
//! synthetic direction.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

mod mapper;
mod snapshot;

pub use mapper::InputMapper;
pub use snapshot::ControllerSnapshot;

/// First bit used by synthetic stick directions
pub const SYNTHETIC_INPUT_BASE_BIT: u32 = 18;

/// Every native identifier is strictly below this value
pub const SYNTHETIC_INPUT_BASE: u32 = 1 << SYNTHETIC_INPUT_BASE_BIT;

/// Platform key code a logical input is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhysicalKey(pub u32);

impl fmt::Display for PhysicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Abstract controller action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(u32)]
pub enum LogicalInput {
    Cross = 1 << 0,
    Moon = 1 << 1,
    Box = 1 << 2,
    Pyramid = 1 << 3,
    DpadLeft = 1 << 4,
    DpadRight = 1 << 5,
    DpadUp = 1 << 6,
    DpadDown = 1 << 7,
    L1 = 1 << 8,
    R1 = 1 << 9,
    L3 = 1 << 10,
    R3 = 1 << 11,
    Options = 1 << 12,
    Share = 1 << 13,
    Touchpad = 1 << 14,
    Ps = 1 << 15,
    // analog buttons
    L2 = 1 << 16,
    R2 = 1 << 17,
    // synthetic stick directions
    LeftStickXUp = 1 << 18,
    LeftStickXDown = 1 << 19,
    LeftStickYUp = 1 << 20,
    LeftStickYDown = 1 << 21,
    RightStickXUp = 1 << 22,
    RightStickXDown = 1 << 23,
    RightStickYUp = 1 << 24,
    RightStickYDown = 1 << 25,
}

impl LogicalInput {
    pub const NATIVE: [LogicalInput; 18] = [
        Self::Cross,
        Self::Moon,
        Self::Box,
        Self::Pyramid,
        Self::DpadLeft,
        Self::DpadRight,
        Self::DpadUp,
        Self::DpadDown,
        Self::L1,
        Self::R1,
        Self::L3,
        Self::R3,
        Self::Options,
        Self::Share,
        Self::Touchpad,
        Self::Ps,
        Self::L2,
        Self::R2,
    ];

    pub const SYNTHETIC: [LogicalInput; 8] = [
        Self::LeftStickXUp,
        Self::LeftStickXDown,
        Self::LeftStickYUp,
        Self::LeftStickYDown,
        Self::RightStickXUp,
        Self::RightStickXDown,
        Self::RightStickYUp,
        Self::RightStickYDown,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn is_synthetic(self) -> bool {
        self.id() >= SYNTHETIC_INPUT_BASE
    }

    /// Every identifier, native first
    pub fn all() -> impl Iterator<Item = LogicalInput> {
        Self::NATIVE.into_iter().chain(Self::SYNTHETIC)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cross => "Cross",
            Self::Moon => "Moon",
            Self::Box => "Box",
            Self::Pyramid => "Pyramid",
            Self::DpadLeft => "D-Pad Left",
            Self::DpadRight => "D-Pad Right",
            Self::DpadUp => "D-Pad Up",
            Self::DpadDown => "D-Pad Down",
            Self::L1 => "L1",
            Self::R1 => "R1",
            Self::L3 => "L3",
            Self::R3 => "R3",
            Self::Options => "Options",
            Self::Share => "Share",
            Self::Touchpad => "Touchpad",
            Self::Ps => "PS",
            Self::L2 => "L2",
            Self::R2 => "R2",
            Self::LeftStickXUp => "Left Stick Right",
            Self::LeftStickXDown => "Left Stick Left",
            Self::LeftStickYUp => "Left Stick Up",
            Self::LeftStickYDown => "Left Stick Down",
            Self::RightStickXUp => "Right Stick Right",
            Self::RightStickXDown => "Right Stick Left",
            Self::RightStickYUp => "Right Stick Up",
            Self::RightStickYDown => "Right Stick Down",
        }
    }
}

const fn all_native_below_synthetic_base() -> bool {
    let mut i = 0;
    while i < LogicalInput::NATIVE.len() {
        if LogicalInput::NATIVE[i] as u32 >= SYNTHETIC_INPUT_BASE {
            return false;
        }
        i += 1;
    }
    let mut j = 0;
    while j < LogicalInput::SYNTHETIC.len() {
        if (LogicalInput::SYNTHETIC[j] as u32) < SYNTHETIC_INPUT_BASE {
            return false;
        }
        j += 1;
    }
    true
}

const _: () = assert!(all_native_below_synthetic_base(), "synthetic inputs overlap native identifiers");

impl From<LogicalInput> for u32 {
    fn from(input: LogicalInput) -> Self {
        input.id()
    }
}

impl TryFrom<u32> for LogicalInput {
    type Error = ConfigError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        LogicalInput::all()
            .find(|input| input.id() == id)
            .ok_or_else(|| ConfigError::InvalidArgument(format!("unknown logical input {id:#x}")))
    }
}

impl fmt::Display for LogicalInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Label for a raw identifier
pub fn name_of(id: u32) -> Result<&'static str, ConfigError> {
    LogicalInput::try_from(id).map(LogicalInput::name)
}
