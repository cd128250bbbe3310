//! BLE communication module.
//!
//! This module provides the Bluetooth Low Energy side of the client: device
//! discovery, connection management, characteristic access, and the
//! [`BleTransport`] capability the protocol layer talks to.

pub mod characteristics;
pub mod connection;
#[cfg(test)]
pub mod mock;
pub mod scanner;
pub mod transport;
pub mod uuids;

pub use characteristics::{CharacteristicHandler, NotificationEvent};
pub use connection::{ConnectionManager, ConnectionState};
pub use scanner::{BleScanner, ConnectTarget, DiscoveredDevice};
pub use transport::{BleTransport, BtleplugTransport};
pub use uuids::*;
