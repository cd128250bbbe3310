//! Correspondence between legacy characteristics and Lorax tunnel paths.
//!
//! Both protocols expose the same device parameters under different names. The
//! registry joins the two tables on their symbolic names, so a parameter only
//! exists in tunnel mode when both sides know it.

use std::collections::HashMap;
use std::sync::OnceLock;

use uuid::Uuid;

use crate::ble::uuids::*;
use crate::error::{Error, Result};

/// Placeholder replaced with the 0-based profile index in per-profile paths.
pub const INDEX_PLACEHOLDER: &str = "%N";

/// Lorax path templates.
pub mod path {
    pub const MODEL_NUMBER: &str = "/p/sys/hw/mdcd";
    pub const SERIAL_NUMBER: &str = "/p/sys/hw/ser";
    pub const HARDWARE_REVISION: &str = "/p/sys/hw/ver";
    pub const SOFTWARE_REVISION: &str = "/p/sys/fw/ver";
    pub const SOFTWARE_REV_GIT_HASH: &str = "/p/sys/fw/gith";

    pub const MODE_COMMAND: &str = "/p/app/mc";
    pub const HEATER_TEMP: &str = "/p/app/htr/temp";
    pub const HEATER_TARGET_TEMP: &str = "/p/app/htr/tcmd";
    pub const DEVICE_NAME: &str = "/u/sys/name";
    pub const READY_MODE_CYCLE_SELECT: &str = "/u/app/rdym/hc";
    pub const OPERATING_STATE: &str = "/p/app/stat/id";
    pub const STATE_ELAPSED_TIME: &str = "/p/app/stat/elap";
    pub const STATE_TOTAL_TIME: &str = "/p/app/stat/tott";

    pub const LANTERN_STATUS: &str = "/p/app/ltrn/cmd";
    pub const LANTERN_COLOR: &str = "/p/app/ltrn/colr";
    pub const LANTERN_BRIGHTNESS: &str = "/u/app/ui/lbrt";
    pub const DABS_PER_DAY: &str = "/p/app/info/dpd";
    pub const TOTAL_DAB_COUNT: &str = "/p/app/odom/0/nc";
    pub const STEALTH_STATUS: &str = "/u/app/ui/stlm";
    pub const DEVICE_BIRTHDAY: &str = "/u/sys/bday";

    pub const PROFILE_CURRENT: &str = "/p/app/hcs";
    pub const PROFILE_NAME: &str = "/u/app/hc/%N/name";
    pub const PROFILE_PREHEAT_TEMP: &str = "/u/app/hc/%N/temp";
    pub const PROFILE_PREHEAT_TIME: &str = "/u/app/hc/%N/time";
    pub const PROFILE_COLOR: &str = "/u/app/hc/%N/colr";

    pub const BATTERY_SOC: &str = "/p/bat/soc";
    pub const BATTERY_CHARGE_STATE: &str = "/p/bat/chg/stat";
    pub const BATTERY_CHARGE_FULL_ETA: &str = "/p/bat/chg/etf";

    pub const BOOST_TEMP: &str = "/u/app/hc/%N/btmp";
    pub const BOOST_TIME: &str = "/u/app/hc/%N/btim";
    pub const TEMPERATURE_OVERRIDE: &str = "/p/app/tmpo";
    pub const TIME_OVERRIDE: &str = "/p/app/timo";
}

/// Legacy characteristics by symbolic name.
pub const LEGACY_CHARACTERISTICS: &[(&str, Uuid)] = &[
    ("MANUFACTURER_NAME", MANUFACTURER_NAME_UUID),
    ("MODEL_NUMBER", MODEL_NUMBER_UUID),
    ("SERIAL_NUMBER", SERIAL_NUMBER_UUID),
    ("HARDWARE_REVISION", HARDWARE_REVISION_UUID),
    ("SOFTWARE_REVISION", SOFTWARE_REVISION_UUID),
    ("SOFTWARE_REV_GIT_HASH", SOFTWARE_REV_GIT_HASH_UUID),
    ("ACCESS_SEED_KEY", ACCESS_SEED_KEY_UUID),
    ("MODE_COMMAND", MODE_COMMAND_UUID),
    ("HEATER_TEMP", HEATER_TEMP_UUID),
    ("HEATER_TARGET_TEMP", HEATER_TARGET_TEMP_UUID),
    ("DEVICE_NAME", DEVICE_NAME_UUID),
    ("OPERATING_STATE", OPERATING_STATE_UUID),
    ("STATE_ELAPSED_TIME", STATE_ELAPSED_TIME_UUID),
    ("STATE_TOTAL_TIME", STATE_TOTAL_TIME_UUID),
    ("LANTERN_STATUS", LANTERN_STATUS_UUID),
    ("LANTERN_COLOR", LANTERN_COLOR_UUID),
    ("LANTERN_BRIGHTNESS", LANTERN_BRIGHTNESS_UUID),
    ("DABS_PER_DAY", DABS_PER_DAY_UUID),
    ("TOTAL_DAB_COUNT", TOTAL_DAB_COUNT_UUID),
    ("STEALTH_STATUS", STEALTH_STATUS_UUID),
    ("DEVICE_BIRTHDAY", DEVICE_BIRTHDAY_UUID),
    ("PROFILE_CURRENT", PROFILE_CURRENT_UUID),
    ("PROFILE", PROFILE_UUID),
    ("PROFILE_NAME", PROFILE_NAME_UUID),
    ("PROFILE_PREHEAT_TEMP", PROFILE_PREHEAT_TEMP_UUID),
    ("PROFILE_PREHEAT_TIME", PROFILE_PREHEAT_TIME_UUID),
    ("PROFILE_COLOR", PROFILE_COLOR_UUID),
    ("BATTERY_SOC", BATTERY_SOC_UUID),
    ("BATTERY_CHARGE_STATE", BATTERY_CHARGE_STATE_UUID),
    ("BATTERY_CHARGE_FULL_ETA", BATTERY_CHARGE_FULL_ETA_UUID),
    ("BOOST_TEMP", BOOST_TEMP_UUID),
    ("BOOST_TIME", BOOST_TIME_UUID),
    ("TEMPERATURE_OVERRIDE", TEMPERATURE_OVERRIDE_UUID),
    ("TIME_OVERRIDE", TIME_OVERRIDE_UUID),
];

/// Lorax path templates by symbolic name.
pub const TUNNEL_PATHS: &[(&str, &str)] = &[
    ("MODEL_NUMBER", path::MODEL_NUMBER),
    ("SERIAL_NUMBER", path::SERIAL_NUMBER),
    ("HARDWARE_REVISION", path::HARDWARE_REVISION),
    ("SOFTWARE_REVISION", path::SOFTWARE_REVISION),
    ("SOFTWARE_REV_GIT_HASH", path::SOFTWARE_REV_GIT_HASH),
    ("MODE_COMMAND", path::MODE_COMMAND),
    ("HEATER_TEMP", path::HEATER_TEMP),
    ("HEATER_TARGET_TEMP", path::HEATER_TARGET_TEMP),
    ("DEVICE_NAME", path::DEVICE_NAME),
    ("READY_MODE_CYCLE_SELECT", path::READY_MODE_CYCLE_SELECT),
    ("OPERATING_STATE", path::OPERATING_STATE),
    ("STATE_ELAPSED_TIME", path::STATE_ELAPSED_TIME),
    ("STATE_TOTAL_TIME", path::STATE_TOTAL_TIME),
    ("LANTERN_STATUS", path::LANTERN_STATUS),
    ("LANTERN_COLOR", path::LANTERN_COLOR),
    ("LANTERN_BRIGHTNESS", path::LANTERN_BRIGHTNESS),
    ("DABS_PER_DAY", path::DABS_PER_DAY),
    ("TOTAL_DAB_COUNT", path::TOTAL_DAB_COUNT),
    ("STEALTH_STATUS", path::STEALTH_STATUS),
    ("DEVICE_BIRTHDAY", path::DEVICE_BIRTHDAY),
    ("PROFILE_CURRENT", path::PROFILE_CURRENT),
    ("PROFILE_NAME", path::PROFILE_NAME),
    ("PROFILE_PREHEAT_TEMP", path::PROFILE_PREHEAT_TEMP),
    ("PROFILE_PREHEAT_TIME", path::PROFILE_PREHEAT_TIME),
    ("PROFILE_COLOR", path::PROFILE_COLOR),
    ("BATTERY_SOC", path::BATTERY_SOC),
    ("BATTERY_CHARGE_STATE", path::BATTERY_CHARGE_STATE),
    ("BATTERY_CHARGE_FULL_ETA", path::BATTERY_CHARGE_FULL_ETA),
    ("BOOST_TEMP", path::BOOST_TEMP),
    ("BOOST_TIME", path::BOOST_TIME),
    ("TEMPERATURE_OVERRIDE", path::TEMPERATURE_OVERRIDE),
    ("TIME_OVERRIDE", path::TIME_OVERRIDE),
];

/// Which protocol a session speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProtocolMode {
    /// Direct GATT characteristic access.
    Legacy,
    /// Lorax tunnel over the four protocol characteristics.
    Tunnel,
}

impl ProtocolMode {
    /// Check if this is the legacy protocol.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy)
    }

    /// Check if this is the tunnel protocol.
    pub fn is_tunnel(&self) -> bool {
        matches!(self, Self::Tunnel)
    }
}

impl std::fmt::Display for ProtocolMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "Legacy"),
            Self::Tunnel => write!(f, "Lorax"),
        }
    }
}

/// The key a parameter is addressed by in a given protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedKey {
    /// Legacy mode: the characteristic itself.
    Characteristic(Uuid),
    /// Tunnel mode: the concrete path with any index substituted.
    Path(String),
}

impl ResolvedKey {
    /// The protocol this key belongs to.
    pub fn mode(&self) -> ProtocolMode {
        match self {
            Self::Characteristic(_) => ProtocolMode::Legacy,
            Self::Path(_) => ProtocolMode::Tunnel,
        }
    }
}

/// One parameter known to both protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathEntry {
    /// Symbolic name shared by both tables.
    pub name: &'static str,
    /// Legacy characteristic.
    pub characteristic: Uuid,
    /// Tunnel path template.
    pub template: &'static str,
}

impl PathEntry {
    /// Check if the path is per-profile.
    pub fn is_indexed(&self) -> bool {
        self.template.contains(INDEX_PLACEHOLDER)
    }

    /// Concrete path for a profile index (default 0).
    pub fn path(&self, index: Option<u8>) -> String {
        if self.is_indexed() {
            self.template
                .replace(INDEX_PLACEHOLDER, &index.unwrap_or(0).to_string())
        } else {
            self.template.to_string()
        }
    }
}

/// Immutable lookup from legacy characteristic to tunnel path.
#[derive(Debug, Clone, Default)]
pub struct PathRegistry {
    entries: HashMap<Uuid, PathEntry>,
}

impl PathRegistry {
    /// Join the two tables on their symbolic names.
    ///
    /// Names present in only one table are left out.
    pub fn build(
        legacy: &[(&'static str, Uuid)],
        tunnel: &[(&'static str, &'static str)],
    ) -> Self {
        let templates: HashMap<&str, &'static str> = tunnel.iter().copied().collect();

        let entries = legacy
            .iter()
            .filter_map(|&(name, characteristic)| {
                templates.get(name).map(|&template| {
                    (
                        characteristic,
                        PathEntry {
                            name,
                            characteristic,
                            template,
                        },
                    )
                })
            })
            .collect();

        Self { entries }
    }

    /// The registry for the Peak Pro parameter set, built on first use.
    pub fn standard() -> &'static PathRegistry {
        static REGISTRY: OnceLock<PathRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| Self::build(LEGACY_CHARACTERISTICS, TUNNEL_PATHS))
    }

    /// Look up the entry for a characteristic.
    pub fn entry(&self, characteristic: &Uuid) -> Option<&PathEntry> {
        self.entries.get(characteristic)
    }

    /// Number of parameters known to both protocols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries.
    pub fn entries(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.values()
    }

    /// Resolve how `characteristic` is addressed in `mode`.
    ///
    /// A missing index on a per-profile path defaults to profile 0.
    pub fn resolve(
        &self,
        mode: ProtocolMode,
        characteristic: &Uuid,
        index: Option<u8>,
    ) -> Result<ResolvedKey> {
        match mode {
            ProtocolMode::Legacy => Ok(ResolvedKey::Characteristic(*characteristic)),
            ProtocolMode::Tunnel => self
                .entry(characteristic)
                .map(|entry| ResolvedKey::Path(entry.path(index)))
                .ok_or_else(|| Error::UnknownParameter {
                    uuid: characteristic.to_string(),
                }),
        }
    }

    /// Resolve the tunnel path for `characteristic`.
    pub fn tunnel_path(&self, characteristic: &Uuid, index: Option<u8>) -> Result<String> {
        match self.resolve(ProtocolMode::Tunnel, characteristic, index)? {
            ResolvedKey::Path(path) => Ok(path),
            ResolvedKey::Characteristic(uuid) => Err(Error::Internal(format!(
                "tunnel resolution returned characteristic {}",
                uuid
            ))),
        }
    }
}

/// Check if a concrete path addresses a per-profile color.
///
/// These paths are written with the full `WRITE` opcode instead of `WRITE_SHORT`.
pub fn is_profile_color_path(path: &str) -> bool {
    let mut parts = path.split('/');
    matches!(
        (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next()
        ),
        (Some(""), Some("u"), Some("app"), Some("hc"), Some(index), Some("colr"), None)
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())
    )
}

/// Check if a concrete path names a text name parameter.
pub fn is_name_path(path: &str) -> bool {
    path.ends_with("/name")
}
