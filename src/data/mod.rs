//! Data structures for device parameters.
//!
//! This module contains the typed values read from and written to a Peak Pro:
//! operating and charge states, commands, lantern settings, heat profiles and
//! device identity.

pub mod device_info;
pub mod lantern;
pub mod profile;
pub mod state;

pub use device_info::DeviceModel;
pub use lantern::{LanternAnimation, LanternColor};
pub use profile::HeatProfile;
pub use state::{ChargeState, DeviceCommand, OperatingState};
