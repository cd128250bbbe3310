//! Lantern (base LED ring) values.
//!
//! The lantern color parameter holds eight bytes. A plain color is
//! `[r, g, b, 0, 1, 0, 0, 0]`; animation presets use fixed patterns in the
//! same slot.

use crate::error::{Error, Result};

/// Size of a lantern or profile color value.
pub const COLOR_SIZE: usize = 8;

/// Number of individually dimmable lantern LEDs.
pub const LANTERN_LED_COUNT: usize = 4;

/// A solid RGB lantern or profile color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LanternColor {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

impl LanternColor {
    /// Create a color from its channels.
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Encode as the 8-byte color value.
    pub fn to_bytes(&self) -> [u8; COLOR_SIZE] {
        [self.red, self.green, self.blue, 0, 1, 0, 0, 0]
    }

    /// Decode the RGB channels of a color value.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        match data {
            [red, green, blue, ..] => Some(Self::new(*red, *green, *blue)),
            _ => None,
        }
    }

    /// Format as `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{}", hex::encode([self.red, self.green, self.blue]))
    }

    /// Parse `rrggbb` or `#rrggbb`.
    pub fn from_hex(text: &str) -> Result<Self> {
        let digits = text.trim().trim_start_matches('#');
        let invalid = || Error::InvalidParameter {
            name: "color".to_string(),
            value: text.to_string(),
        };

        let bytes = hex::decode(digits).map_err(|_| invalid())?;
        match bytes.as_slice() {
            [red, green, blue] => Ok(Self::new(*red, *green, *blue)),
            _ => Err(invalid()),
        }
    }
}

/// Built-in lantern animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LanternAnimation {
    /// Slow brightness pulse.
    Pulsing,
    /// Rotating segments.
    Rotating,
    /// Fast color cycling.
    DiscoMode,
}

impl LanternAnimation {
    /// All presets.
    pub const ALL: [LanternAnimation; 3] = [Self::Pulsing, Self::Rotating, Self::DiscoMode];

    /// The color value that selects this animation.
    pub fn pattern(&self) -> [u8; COLOR_SIZE] {
        match self {
            Self::Pulsing => [0xFF, 0xFF, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00],
            Self::Rotating => [0xFF, 0xFF, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00],
            Self::DiscoMode => [0xFF, 0x20, 0x08, 0x01, 0x00, 0x00, 0x00, 0x00],
        }
    }

    /// Identify the animation a color value selects, if any.
    pub fn from_pattern(data: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|animation| data == animation.pattern().as_slice())
    }

    /// Get a human-readable name for this animation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pulsing => "Pulsing",
            Self::Rotating => "Rotating",
            Self::DiscoMode => "Disco",
        }
    }
}

/// Encode a brightness for all lantern LEDs.
pub fn brightness_bytes(brightness: u8) -> [u8; LANTERN_LED_COUNT] {
    [brightness; LANTERN_LED_COUNT]
}

/// Decode a brightness as the brightest LED.
pub fn brightness_from_bytes(data: &[u8]) -> Option<u8> {
    data.iter().take(LANTERN_LED_COUNT).copied().max()
}

/// Encode an on/off flag as the device stores it.
pub fn flag_bytes(enabled: bool) -> [u8; 4] {
    [enabled as u8, 0, 0, 0]
}

/// Decode an on/off flag.
pub fn flag_from_bytes(data: &[u8]) -> Option<bool> {
    data.first().map(|&b| b != 0)
}
