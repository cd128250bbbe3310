//! BLE scanning functionality.
//!
//! Finds a Peak Pro either by its MAC address or by scanning for the Puffco
//! advertised service and vendor address prefix.

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::ble::uuids::{PUFFCO_ADDRESS_PREFIX, PUFFCO_SERVICE_UUID};
use crate::error::{Error, Result};

/// Which device to connect to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectTarget {
    /// A specific MAC address, compared case-insensitively.
    Address(String),
    /// The first Peak Pro found by service UUID or vendor prefix.
    #[default]
    Scan,
}

impl ConnectTarget {
    /// Build a target from an optional address.
    pub fn from_address(address: Option<&str>) -> Self {
        match address {
            Some(address) if !address.trim().is_empty() => Self::Address(address.trim().to_string()),
            _ => Self::Scan,
        }
    }

    /// Check if a peripheral with this address and these advertised services matches.
    pub fn matches(&self, address: &str, services: &[Uuid]) -> bool {
        match self {
            Self::Address(wanted) => wanted.eq_ignore_ascii_case(address),
            Self::Scan => {
                services.contains(&PUFFCO_SERVICE_UUID)
                    || address.to_ascii_uppercase().starts_with(PUFFCO_ADDRESS_PREFIX)
            }
        }
    }
}

impl std::fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(address) => write!(f, "{}", address),
            Self::Scan => write!(f, "any Peak Pro"),
        }
    }
}

/// A peripheral seen during a scan.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// MAC address.
    pub address: String,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
    /// The peripheral handle.
    pub peripheral: Peripheral,
}

/// BLE scanner for discovering Peak Pro devices.
pub struct BleScanner {
    adapter: Adapter,
    /// Devices seen during the last scan, by address.
    discovered: Arc<RwLock<HashMap<String, DiscoveredDevice>>>,
}

impl BleScanner {
    /// Create a scanner on the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapter = manager
            .adapters()
            .await
            .map_err(Error::Bluetooth)?
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Create a scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            discovered: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Devices seen during the last scan.
    pub fn discovered_devices(&self) -> Vec<DiscoveredDevice> {
        self.discovered.read().values().cloned().collect()
    }

    /// Scan until a peripheral matching `target` appears or `timeout` elapses.
    ///
    /// Addresses in `skip` are ignored, so a caller can move on from devices
    /// that already failed to connect.
    pub async fn find(
        &self,
        target: &ConnectTarget,
        timeout: Duration,
        skip: &HashSet<String>,
    ) -> Result<Peripheral> {
        info!("Scanning for {} ({:?})", target, timeout);

        self.discovered.write().clear();
        let mut events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let result = tokio::time::timeout(timeout, self.search(&mut events, target, skip)).await;

        if let Err(e) = self.adapter.stop_scan().await {
            debug!("Failed to stop scan: {}", e);
        }

        match result {
            Ok(found) => found,
            Err(_) => Err(Error::DeviceNotFound {
                identifier: target.to_string(),
            }),
        }
    }

    async fn search(
        &self,
        events: &mut (impl futures::Stream<Item = CentralEvent> + Unpin),
        target: &ConnectTarget,
        skip: &HashSet<String>,
    ) -> Result<Peripheral> {
        // Peripherals already known to the adapter never produce a discovery event.
        for peripheral in self.adapter.peripherals().await? {
            if let Some(found) = self.check(&peripheral, target, skip).await {
                return Ok(found);
            }
        }

        while let Some(event) = events.next().await {
            let id = match event {
                CentralEvent::DeviceDiscovered(id)
                | CentralEvent::DeviceUpdated(id)
                | CentralEvent::ServicesAdvertisement { id, .. } => id,
                _ => continue,
            };

            if let Some(found) = self.check_id(&id, target, skip).await {
                return Ok(found);
            }
        }

        Err(Error::DeviceNotFound {
            identifier: target.to_string(),
        })
    }

    async fn check_id(
        &self,
        id: &PeripheralId,
        target: &ConnectTarget,
        skip: &HashSet<String>,
    ) -> Option<Peripheral> {
        let peripheral = self.adapter.peripheral(id).await.ok()?;
        self.check(&peripheral, target, skip).await
    }

    async fn check(
        &self,
        peripheral: &Peripheral,
        target: &ConnectTarget,
        skip: &HashSet<String>,
    ) -> Option<Peripheral> {
        let properties = peripheral.properties().await.ok()??;
        let address = properties.address.to_string();

        trace!(
            "Seen {} {:?} services={:?}",
            address,
            properties.local_name,
            properties.services
        );

        self.discovered.write().insert(
            address.clone(),
            DiscoveredDevice {
                address: address.clone(),
                name: properties.local_name.clone(),
                rssi: properties.rssi,
                peripheral: peripheral.clone(),
            },
        );

        if skip.contains(&address) {
            trace!("Skipping previously attempted device {}", address);
            return None;
        }

        if target.matches(&address, &properties.services) {
            info!(
                "Found {} ({})",
                address,
                properties.local_name.as_deref().unwrap_or("unnamed")
            );
            Some(peripheral.clone())
        } else {
            None
        }
    }
}
