//! Lorax tunnel wire format.
//!
//! Commands are written to the command characteristic as
//! `[seq:u16-le][opcode:u8][payload...]`. Replies arrive on the reply
//! characteristic as `[seq:u16-le][status:u8][data...]`.

use crate::error::{Error, Result};
use crate::protocol::buffer::ByteBuffer;
use crate::protocol::paths::is_name_path;

/// Size of both the command and the reply header.
pub const HEADER_SIZE: usize = 3;

/// Payload budget used until `GET_LIMITS` has been answered.
pub const DEFAULT_MAX_PAYLOAD: u16 = 112;

/// `WRITE_SHORT` flag marking a text name parameter.
pub const NAME_FLAG: u16 = 4;

/// Lorax command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LoraxOpCode {
    /// Request a 16-byte access seed.
    GetAccessSeed = 0,
    /// Present the unlock token derived from the seed.
    UnlockAccess = 1,
    /// Request the device's payload and queue limits.
    GetLimits = 2,
    /// Read a path.
    ReadShort = 16,
    /// Write a path with the path embedded in the payload.
    WriteShort = 17,
    /// Full write, used for per-profile colors.
    Write = 34,
}

impl LoraxOpCode {
    /// Create from raw value.
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::GetAccessSeed),
            1 => Some(Self::UnlockAccess),
            2 => Some(Self::GetLimits),
            16 => Some(Self::ReadShort),
            17 => Some(Self::WriteShort),
            34 => Some(Self::Write),
            _ => None,
        }
    }

    /// Convert to raw value.
    pub fn to_raw(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for LoraxOpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::GetAccessSeed => "GET_ACCESS_SEED",
            Self::UnlockAccess => "UNLOCK_ACCESS",
            Self::GetLimits => "GET_LIMITS",
            Self::ReadShort => "READ_SHORT",
            Self::WriteShort => "WRITE_SHORT",
            Self::Write => "WRITE",
        };
        write!(f, "{}", name)
    }
}

/// Encode a full command: header followed by `payload`.
pub fn encode_command(sequence_id: u16, opcode: LoraxOpCode, payload: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = ByteBuffer::new(HEADER_SIZE + payload.len());
    let offset = buffer.write_u16_le(sequence_id, 0)?;
    let offset = buffer.write_u8(opcode.to_raw(), offset)?;
    buffer.write_bytes(payload, offset)?;
    Ok(buffer.into_vec())
}

/// A decoded reply notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Sequence id of the transaction being answered.
    pub sequence_id: u16,
    /// Zero on success.
    pub status: u8,
    /// Everything after the header.
    pub data: Vec<u8>,
}

impl Reply {
    /// Parse a raw reply notification.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_SIZE {
            return Err(Error::InvalidData {
                context: format!(
                    "Lorax reply too short: {} bytes, expected at least {}",
                    raw.len(),
                    HEADER_SIZE
                ),
            });
        }

        let buffer = ByteBuffer::from_bytes(raw);
        Ok(Self {
            sequence_id: buffer.read_u16_le(0)?,
            status: buffer.read_u8(2)?,
            data: raw[HEADER_SIZE..].to_vec(),
        })
    }

    /// Check if the device reported success.
    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Limits reported by `GET_LIMITS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoraxLimits {
    /// Largest reply payload the device will send.
    pub max_payload: u16,
    /// Maximum number of open files.
    pub max_files: u16,
    /// Maximum number of queued commands.
    pub max_commands: u16,
}

impl LoraxLimits {
    /// Size of the `GET_LIMITS` reply payload.
    pub const SIZE: usize = 6;

    /// Parse a `GET_LIMITS` reply payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::InvalidData {
                context: format!(
                    "Lorax limits too short: {} bytes, expected {}",
                    data.len(),
                    Self::SIZE
                ),
            });
        }

        let buffer = ByteBuffer::from_bytes(data);
        Ok(Self {
            max_payload: buffer.read_u16_le(0)?,
            max_files: buffer.read_u16_le(2)?,
            max_commands: buffer.read_u16_le(4)?,
        })
    }
}

impl Default for LoraxLimits {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            max_files: 1,
            max_commands: 1,
        }
    }
}

/// `READ_SHORT` payload: `[0:u16][max_payload:u16][path]`.
pub fn read_short_payload(max_payload: u16, path: &str) -> Result<Vec<u8>> {
    let mut buffer = ByteBuffer::new(4 + path.len());
    buffer.write_u16_le(0, 0)?;
    let offset = buffer.write_u16_le(max_payload, 2)?;
    buffer.write_str(path, offset, None)?;
    Ok(buffer.into_vec())
}

/// `WRITE_SHORT` payload: `[0:u16][flag:u16][path][0x00][value]`.
///
/// `flag` is [`NAME_FLAG`] for paths ending in `/name`, otherwise 0.
pub fn write_short_payload(path: &str, value: &[u8]) -> Result<Vec<u8>> {
    let flag = if is_name_path(path) { NAME_FLAG } else { 0 };

    let mut buffer = ByteBuffer::new(4 + path.len() + 1 + value.len());
    buffer.write_u16_le(0, 0)?;
    let mut offset = buffer.write_u16_le(flag, 2)?;
    offset += buffer.write_str(path, offset, None)?;
    offset = buffer.write_u8(0, offset)?;
    buffer.write_bytes(value, offset)?;
    Ok(buffer.into_vec())
}

/// `WRITE` payload: `[0:u16][0:u16][value]`.
///
/// The target path is not part of this payload.
pub fn write_payload(value: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = ByteBuffer::new(4 + value.len());
    buffer.write_u16_le(0, 0)?;
    let offset = buffer.write_u16_le(0, 2)?;
    buffer.write_bytes(value, offset)?;
    Ok(buffer.into_vec())
}
