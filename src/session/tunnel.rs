//! Parameter access through the Lorax tunnel.
//!
//! Commands are queued to a writer task that owns the command
//! characteristic. A listener task feeds reply notifications into the
//! [`TransactionLedger`] and logs events.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::ble::transport::BleTransport;
use crate::ble::uuids::*;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::protocol::auth::{start_tunnel_handshake, TunnelHandshake};
use crate::protocol::ledger::TransactionLedger;
use crate::protocol::lorax::{
    read_short_payload, write_payload, write_short_payload, LoraxLimits, LoraxOpCode,
};
use crate::protocol::paths::{is_profile_color_path, PathRegistry, ProtocolMode};
use crate::session::ParameterIo;

/// Path-based access over the four Lorax characteristics.
pub struct TunnelProtocol {
    transport: Arc<dyn BleTransport>,
    ledger: Arc<TransactionLedger>,
    registry: &'static PathRegistry,
    version: u8,
    limits: RwLock<LoraxLimits>,
    reply_timeout: Option<Duration>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TunnelProtocol {
    /// Start the tunnel on a connected transport and run negotiation.
    ///
    /// Negotiation reads the protocol version, runs the unlock handshake and
    /// requests the device limits. The handshake and the limits request are
    /// bounded by the configured timeouts; if either does not finish in time
    /// the session continues with defaults.
    pub async fn negotiate(transport: Arc<dyn BleTransport>, config: &SessionConfig) -> Result<Self> {
        let version = transport
            .read_characteristic(&LORAX_VERSION_UUID)
            .await?
            .first()
            .copied()
            .unwrap_or(0);
        info!("Lorax protocol version {}", version);

        let protocol = Self::start(transport, version, config.reply_timeout).await?;

        let handshake = TunnelHandshake::with_device_key()?;
        let unlocked = start_tunnel_handshake(&protocol.ledger, handshake)?;
        match tokio::time::timeout(config.auth_timeout, unlocked).await {
            Ok(Ok(())) => info!("Tunnel access unlocked"),
            Ok(Err(_)) => warn!("Tunnel unlock was rejected, continuing"),
            Err(_) => warn!(
                "Tunnel unlock not confirmed within {:?}, continuing",
                config.auth_timeout
            ),
        }

        protocol.negotiate_limits(config.negotiation_timeout).await;

        Ok(protocol)
    }

    /// Subscribe to the reply and event characteristics and spawn the I/O tasks.
    async fn start(
        transport: Arc<dyn BleTransport>,
        version: u8,
        reply_timeout: Option<Duration>,
    ) -> Result<Self> {
        // Take the receiver before anything is sent so no reply is missed.
        let notifications = transport.notifications();
        transport.subscribe(&LORAX_REPLY_UUID).await?;
        if let Err(e) = transport.subscribe(&LORAX_EVENT_UUID).await {
            warn!("Failed to subscribe to Lorax events: {}", e);
        }

        let ledger = Arc::new(TransactionLedger::new());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        ledger.attach(command_tx);

        let listener = tokio::spawn(listen(notifications, ledger.clone()));
        let writer = tokio::spawn(write_commands(command_rx, transport.clone()));

        Ok(Self {
            transport,
            ledger,
            registry: PathRegistry::standard(),
            version,
            limits: RwLock::new(LoraxLimits::default()),
            reply_timeout,
            tasks: Mutex::new(vec![listener, writer]),
        })
    }

    async fn negotiate_limits(&self, timeout: Duration) {
        let pending = match self.ledger.submit_waiting(LoraxOpCode::GetLimits, None, &[]) {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Failed to request Lorax limits: {}", e);
                return;
            }
        };

        let reply = tokio::time::timeout(timeout, self.ledger.wait(&pending)).await;
        let limits = match reply {
            Ok(Ok(Some(data))) => LoraxLimits::parse(&data),
            Ok(Ok(None)) => Err(Error::InvalidData {
                context: "GET_LIMITS failed".to_string(),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                self.ledger.abandon(&pending);
                Err(Error::Timeout)
            }
        };

        match limits {
            Ok(limits) => {
                info!("Lorax limits: {:?}", limits);
                *self.limits.write() = limits;
            }
            Err(e) => warn!("Using default Lorax limits: {}", e),
        }
    }

    /// Protocol version reported by the device.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Limits in effect for this session.
    pub fn limits(&self) -> LoraxLimits {
        *self.limits.read()
    }

    /// The transaction ledger.
    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    async fn read_path(&self, path: String) -> Result<Vec<u8>> {
        let payload = read_short_payload(self.limits().max_payload, &path)?;
        let pending = self
            .ledger
            .submit_waiting(LoraxOpCode::ReadShort, Some(path), &payload)?;

        let reply = match self.reply_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.ledger.wait(&pending)).await {
                Ok(reply) => reply?,
                Err(_) => {
                    self.ledger.abandon(&pending);
                    return Err(Error::Timeout);
                }
            },
            None => self.ledger.wait(&pending).await?,
        };

        Ok(reply.unwrap_or_default())
    }
}

#[async_trait]
impl ParameterIo for TunnelProtocol {
    fn mode(&self) -> ProtocolMode {
        ProtocolMode::Tunnel
    }

    async fn read(&self, characteristic: &Uuid, index: Option<u8>) -> Result<Vec<u8>> {
        if is_lorax_protocol_characteristic(characteristic) {
            return self.transport.read_characteristic(characteristic).await;
        }

        let path = self.registry.tunnel_path(characteristic, index)?;
        trace!("Tunnel read {}", path);
        self.read_path(path).await
    }

    async fn write(&self, characteristic: &Uuid, value: &[u8], index: Option<u8>) -> Result<()> {
        if is_lorax_protocol_characteristic(characteristic) {
            return self
                .transport
                .write_characteristic(characteristic, value, true)
                .await;
        }

        let path = self.registry.tunnel_path(characteristic, index)?;
        let (opcode, payload) = if is_profile_color_path(&path) {
            (LoraxOpCode::Write, write_payload(value)?)
        } else {
            (LoraxOpCode::WriteShort, write_short_payload(&path, value)?)
        };

        let sequence_id = self.ledger.submit_detached(opcode, Some(path), &payload)?;
        debug!("Tunnel {} #{} queued", opcode, sequence_id);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.ledger.clear();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        Ok(())
    }
}

impl Drop for TunnelProtocol {
    fn drop(&mut self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

async fn listen(
    mut notifications: broadcast::Receiver<crate::ble::NotificationEvent>,
    ledger: Arc<TransactionLedger>,
) {
    loop {
        match notifications.recv().await {
            Ok(event) if event.characteristic_uuid == LORAX_REPLY_UUID => {
                ledger.deliver(&event.data);
            }
            Ok(event) if event.characteristic_uuid == LORAX_EVENT_UUID => {
                debug!("Lorax event: {:02X?}", event.data);
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Dropped {} notifications", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Notification channel closed");
                break;
            }
        }
    }
}

async fn write_commands(
    mut commands: mpsc::UnboundedReceiver<Bytes>,
    transport: Arc<dyn BleTransport>,
) {
    while let Some(command) = commands.recv().await {
        if let Err(e) = transport
            .write_characteristic(&LORAX_COMMAND_UUID, &command, true)
            .await
        {
            error!("Failed to write Lorax command: {}", e);
        }
    }
    debug!("Lorax command queue closed");
}
