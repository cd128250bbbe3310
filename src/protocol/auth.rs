//! Challenge-response unlock for both protocol variants.
//!
//! The token is the first 16 bytes of `SHA-256(key || seed)`, where the key
//! and the seed fill 16 bytes each. Legacy firmware and the Lorax tunnel use
//! different keys.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::ble::transport::BleTransport;
use crate::ble::uuids::ACCESS_SEED_KEY_UUID;
use crate::error::{Error, Result};
use crate::protocol::buffer::ByteBuffer;
use crate::protocol::ledger::TransactionLedger;
use crate::protocol::lorax::LoraxOpCode;

/// Size of the seed, the key and the token.
pub const BLOCK_SIZE: usize = 16;

/// Device key for the legacy characteristic handshake.
pub const LEGACY_DEVICE_KEY: &str = "FUrZc0WilhUBteT2JlCc+A==";

/// Device key for the tunnel handshake.
pub const TUNNEL_DEVICE_KEY: &str = "ZMZFYlbyb1scoSc3pd1x+w==";

/// Decode a base64 device key into its 16 raw bytes.
pub fn device_key(encoded: &str) -> Result<[u8; BLOCK_SIZE]> {
    let bytes = BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| Error::InvalidParameter {
            name: "device_key".to_string(),
            value: e.to_string(),
        })?;

    bytes.try_into().map_err(|bytes: Vec<u8>| Error::InvalidParameter {
        name: "device_key".to_string(),
        value: format!("{} bytes, expected {}", bytes.len(), BLOCK_SIZE),
    })
}

/// Derive the unlock token for `seed`.
///
/// Seeds shorter than 16 bytes are zero-padded and longer ones truncated.
pub fn compute_token(key: &[u8; BLOCK_SIZE], seed: &[u8]) -> Result<[u8; BLOCK_SIZE]> {
    if seed.len() != BLOCK_SIZE {
        warn!(
            "Access seed is {} bytes, expected {}",
            seed.len(),
            BLOCK_SIZE
        );
    }

    let mut block = ByteBuffer::new(BLOCK_SIZE * 2);
    block.write_bytes(key, 0)?;
    block.write_bytes(&seed[..seed.len().min(BLOCK_SIZE)], BLOCK_SIZE)?;

    let digest = hex::encode(Sha256::digest(block.as_bytes()));
    let token = hex::decode(&digest[..BLOCK_SIZE * 2]).map_err(|e| Error::Internal(e.to_string()))?;

    token
        .try_into()
        .map_err(|_| Error::Internal("token digest truncated".to_string()))
}

/// Unlock legacy firmware by exchanging the seed on the access characteristic.
///
/// The device sends no confirmation. A wrong token only shows up later as
/// unreadable parameters.
pub async fn legacy_handshake(transport: &dyn BleTransport) -> Result<()> {
    let key = device_key(LEGACY_DEVICE_KEY)?;
    let seed = transport.read_characteristic(&ACCESS_SEED_KEY_UUID).await?;
    debug!("Received {} byte access seed", seed.len());

    let token = compute_token(&key, &seed)?;
    transport
        .write_characteristic(&ACCESS_SEED_KEY_UUID, &token, true)
        .await?;

    info!("Sent legacy unlock token");
    Ok(())
}

/// Progress of the tunnel handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// `GET_ACCESS_SEED` sent, waiting for the seed.
    AwaitingSeed,
    /// `UNLOCK_ACCESS` sent, waiting for the acknowledgement.
    AwaitingUnlock,
    /// Unlock acknowledged.
    Authenticated,
}

/// What the driver should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeStep {
    /// Submit a transaction and feed its reply back to the handshake.
    Send {
        /// Opcode to send.
        opcode: LoraxOpCode,
        /// Command payload.
        payload: Vec<u8>,
    },
    /// The handshake is finished.
    Complete,
}

/// Tunnel handshake: `AwaitingSeed -> AwaitingUnlock -> Authenticated`.
#[derive(Debug, Clone)]
pub struct TunnelHandshake {
    key: [u8; BLOCK_SIZE],
    state: HandshakeState,
}

impl TunnelHandshake {
    /// Create a handshake using `key`.
    pub fn new(key: [u8; BLOCK_SIZE]) -> Self {
        Self {
            key,
            state: HandshakeState::AwaitingSeed,
        }
    }

    /// Create a handshake with the built-in tunnel key.
    pub fn with_device_key() -> Result<Self> {
        Ok(Self::new(device_key(TUNNEL_DEVICE_KEY)?))
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// The first transaction to send.
    pub fn start(&self) -> HandshakeStep {
        HandshakeStep::Send {
            opcode: LoraxOpCode::GetAccessSeed,
            payload: Vec::new(),
        }
    }

    /// Advance with the payload of the reply to the previous step.
    pub fn on_reply(&mut self, data: &[u8]) -> Result<HandshakeStep> {
        match self.state {
            HandshakeState::AwaitingSeed => {
                let token = compute_token(&self.key, data)?;
                self.state = HandshakeState::AwaitingUnlock;
                Ok(HandshakeStep::Send {
                    opcode: LoraxOpCode::UnlockAccess,
                    payload: token.to_vec(),
                })
            }
            HandshakeState::AwaitingUnlock | HandshakeState::Authenticated => {
                self.state = HandshakeState::Authenticated;
                Ok(HandshakeStep::Complete)
            }
        }
    }
}

/// Run the tunnel handshake through `ledger`.
///
/// The returned receiver fires once the unlock is acknowledged. If the device
/// rejects a step the sender is dropped instead.
pub fn start_tunnel_handshake(
    ledger: &TransactionLedger,
    handshake: TunnelHandshake,
) -> Result<oneshot::Receiver<()>> {
    let (done_tx, done_rx) = oneshot::channel();
    let step = handshake.start();
    drive(ledger, handshake, step, done_tx)?;
    Ok(done_rx)
}

fn drive(
    ledger: &TransactionLedger,
    mut handshake: TunnelHandshake,
    step: HandshakeStep,
    done: oneshot::Sender<()>,
) -> Result<()> {
    match step {
        HandshakeStep::Complete => {
            debug!("Tunnel handshake complete");
            let _ = done.send(());
        }
        HandshakeStep::Send { opcode, payload } => {
            ledger.submit_with(opcode, None, &payload, move |ledger, data| {
                let result = handshake
                    .on_reply(&data)
                    .and_then(|next| drive(ledger, handshake, next, done));
                if let Err(e) = result {
                    warn!("Tunnel handshake stopped: {}", e);
                }
            })?;
        }
    }
    Ok(())
}
