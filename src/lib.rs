// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]
// Allow derivable impls for clarity
#![allow(clippy::derivable_impls)]

//! # puffco-rust-ble
//!
//! A cross-platform Rust library for talking to Puffco Peak Pro devices over
//! Bluetooth Low Energy.
//!
//! Two generations of firmware are supported:
//!
//! - **Legacy**: every setting is its own GATT characteristic, unlocked with a
//!   seed/token handshake on the access characteristic.
//! - **Lorax**: newer firmware tunnels every setting through a command/reply
//!   characteristic pair, addressing parameters by path.
//!
//! The protocol is chosen once per connection from the services the device
//! exposes. [`PeakPro`] hides the difference behind typed accessors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use puffco_rust_ble::{ConnectTarget, PeakPro, Result, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let peak = PeakPro::connect(ConnectTarget::Scan, SessionConfig::default()).await?;
//!
//!     println!("Connected over {} protocol", peak.mode());
//!     if let Some(battery) = peak.battery_percentage().await? {
//!         println!("  Battery: {}%", battery);
//!     }
//!     if let Some(state) = peak.operating_state().await? {
//!         println!("  State: {}", state);
//!     }
//!
//!     peak.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod protocol;
pub mod session;
pub mod utils;

// Re-exports for convenience
pub use config::SessionConfig;
pub use device::PeakPro;
pub use error::{Error, Result};
pub use session::Session;
pub use utils::{celsius_to_fahrenheit, fahrenheit_to_celsius};

// Re-export commonly used types from submodules
pub use ble::connection::ConnectionState;
pub use ble::scanner::ConnectTarget;
pub use data::{
    ChargeState, DeviceCommand, DeviceModel, HeatProfile, LanternAnimation, LanternColor,
    OperatingState,
};
pub use protocol::ProtocolMode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<PeakPro>();
        let _ = std::any::TypeId::of::<Session>();
        let _ = std::any::TypeId::of::<SessionConfig>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<ConnectTarget>();
        let _ = std::any::TypeId::of::<HeatProfile>();
        let _ = std::any::TypeId::of::<ProtocolMode>();
    }

    #[test]
    fn test_temperature_conversion() {
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 0.001);
    }
}
