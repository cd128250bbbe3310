//! The BLE capability the protocol layer is written against.
//!
//! [`BtleplugTransport`] is the real implementation; tests substitute a mock.

use async_trait::async_trait;
use btleplug::api::Peripheral as _;
use btleplug::platform::Peripheral;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::ble::characteristics::{CharacteristicHandler, NotificationEvent};
use crate::ble::connection::{ConnectionManager, ConnectionState};
use crate::config::SessionConfig;
use crate::error::Result;

/// Connect, discover, read, write and subscribe by characteristic UUID.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BleTransport: Send + Sync {
    /// Establish the link.
    async fn connect(&self) -> Result<()>;

    /// Tear down the link.
    async fn disconnect(&self) -> Result<()>;

    /// Discover services and return their UUIDs.
    async fn discover_services(&self) -> Result<Vec<Uuid>>;

    /// Read a characteristic.
    async fn read_characteristic(&self, uuid: &Uuid) -> Result<Vec<u8>>;

    /// Write a characteristic, optionally waiting for the peripheral's acknowledgement.
    async fn write_characteristic(&self, uuid: &Uuid, data: &[u8], with_response: bool)
        -> Result<()>;

    /// Enable notifications for a characteristic.
    async fn subscribe(&self, uuid: &Uuid) -> Result<()>;

    /// Receiver for notifications from all subscribed characteristics.
    fn notifications(&self) -> broadcast::Receiver<NotificationEvent>;

    /// Address of the peripheral.
    fn address(&self) -> String;
}

/// [`BleTransport`] backed by a btleplug peripheral.
pub struct BtleplugTransport {
    connection: ConnectionManager,
    characteristics: CharacteristicHandler,
}

impl BtleplugTransport {
    /// Wrap a peripheral, using the retry settings from `config`.
    pub fn new(peripheral: Peripheral, config: &SessionConfig) -> Self {
        let characteristics = CharacteristicHandler::new(peripheral.clone());
        let connection = ConnectionManager::new(peripheral)
            .with_retry(config.max_connect_attempts, config.reconnect_delay);

        Self {
            connection,
            characteristics,
        }
    }

    /// Current link state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// The connection manager, for subscribing to state events.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }
}

#[async_trait]
impl BleTransport for BtleplugTransport {
    async fn connect(&self) -> Result<()> {
        self.connection.connect().await?;
        self.characteristics.discover_characteristics();
        self.characteristics.start_notifications().await
    }

    async fn disconnect(&self) -> Result<()> {
        self.characteristics.stop_notifications();
        self.characteristics.clear();
        self.connection.disconnect().await
    }

    async fn discover_services(&self) -> Result<Vec<Uuid>> {
        if self.connection.peripheral().services().is_empty() {
            debug!("No cached services, discovering");
            self.connection.peripheral().discover_services().await?;
        }
        Ok(self.characteristics.discover_characteristics())
    }

    async fn read_characteristic(&self, uuid: &Uuid) -> Result<Vec<u8>> {
        self.characteristics.read(uuid).await
    }

    async fn write_characteristic(
        &self,
        uuid: &Uuid,
        data: &[u8],
        with_response: bool,
    ) -> Result<()> {
        self.characteristics.write(uuid, data, with_response).await
    }

    async fn subscribe(&self, uuid: &Uuid) -> Result<()> {
        self.characteristics.subscribe(uuid).await
    }

    fn notifications(&self) -> broadcast::Receiver<NotificationEvent> {
        self.characteristics.subscribe_notifications()
    }

    fn address(&self) -> String {
        self.connection.address().to_string()
    }
}
