//! Protocol module for encoding and correlating device traffic.
//!
//! This module contains the implementations for:
//! - Fixed-size byte buffers
//! - The legacy characteristic to tunnel path registry
//! - Lorax command and reply framing
//! - The tunnel transaction ledger
//! - The unlock handshake
//! - Firmware revision strings

pub mod auth;
pub mod buffer;
pub mod ledger;
pub mod lorax;
pub mod paths;
pub mod revision;

pub use auth::{compute_token, HandshakeState, HandshakeStep, TunnelHandshake};
pub use buffer::ByteBuffer;
pub use ledger::{Completion, PendingReply, TransactionLedger};
pub use lorax::{LoraxLimits, LoraxOpCode, Reply};
pub use paths::{PathEntry, PathRegistry, ProtocolMode, ResolvedKey};
pub use revision::decode_revision;
