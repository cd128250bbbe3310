//! Operating, charging and command enumerations.
//!
//! The device stores all of these as `f32` values holding small integers.

/// What the device is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum OperatingState {
    /// Loading persisted settings after power-up.
    InitMemory = 0,
    /// Showing the firmware version after power-up.
    InitVersionDisplay = 1,
    /// Showing the battery level after power-up.
    InitBatteryDisplay = 2,
    /// Fully off.
    MasterOff = 3,
    /// Asleep.
    Sleep = 4,
    /// Awake and idle.
    Idle = 5,
    /// Choosing a heat profile.
    TempSelect = 6,
    /// Heating up.
    HeatCyclePreheat = 7,
    /// At temperature.
    HeatCycleActive = 8,
    /// Cooling down at the end of a cycle.
    HeatCycleFade = 9,
    /// Showing the firmware version.
    VersionDisplay = 10,
    /// Showing the battery level.
    BatteryDisplay = 11,
    /// Factory test mode.
    FactoryTest = 12,
    /// Pairing.
    Bonding = 13,
}

impl OperatingState {
    /// Create from raw value.
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::InitMemory,
            1 => Self::InitVersionDisplay,
            2 => Self::InitBatteryDisplay,
            3 => Self::MasterOff,
            4 => Self::Sleep,
            5 => Self::Idle,
            6 => Self::TempSelect,
            7 => Self::HeatCyclePreheat,
            8 => Self::HeatCycleActive,
            9 => Self::HeatCycleFade,
            10 => Self::VersionDisplay,
            11 => Self::BatteryDisplay,
            12 => Self::FactoryTest,
            13 => Self::Bonding,
            _ => return None,
        })
    }

    /// Create from the float the device reports.
    pub fn from_value(value: f32) -> Option<Self> {
        if value.is_finite() && value >= 0.0 && value <= u8::MAX as f32 {
            Self::from_raw(value as u8)
        } else {
            None
        }
    }

    /// Convert to raw value.
    pub fn to_raw(self) -> u8 {
        self as u8
    }

    /// Check if a heat cycle is in progress.
    pub fn is_heating(&self) -> bool {
        matches!(
            self,
            Self::HeatCyclePreheat | Self::HeatCycleActive | Self::HeatCycleFade
        )
    }

    /// Get a human-readable name for this state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitMemory => "Initializing",
            Self::InitVersionDisplay => "Initializing (version)",
            Self::InitBatteryDisplay => "Initializing (battery)",
            Self::MasterOff => "Off",
            Self::Sleep => "Sleeping",
            Self::Idle => "Idle",
            Self::TempSelect => "Selecting profile",
            Self::HeatCyclePreheat => "Preheating",
            Self::HeatCycleActive => "Heat cycle active",
            Self::HeatCycleFade => "Heat cycle fading",
            Self::VersionDisplay => "Showing version",
            Self::BatteryDisplay => "Showing battery",
            Self::FactoryTest => "Factory test",
            Self::Bonding => "Bonding",
        }
    }
}

impl std::fmt::Display for OperatingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Battery charger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ChargeState {
    /// Constant-current charging.
    Bulk = 0,
    /// Constant-voltage top-up.
    TopUp = 1,
    /// Fully charged.
    Full = 2,
    /// Charging paused because the battery is too hot.
    OverTemperature = 3,
    /// No charger attached.
    CableDisconnected = 4,
}

impl ChargeState {
    /// Create from raw value.
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Bulk),
            1 => Some(Self::TopUp),
            2 => Some(Self::Full),
            3 => Some(Self::OverTemperature),
            4 => Some(Self::CableDisconnected),
            _ => None,
        }
    }

    /// Create from the float the device reports.
    pub fn from_value(value: f32) -> Option<Self> {
        if value.is_finite() && value >= 0.0 && value <= u8::MAX as f32 {
            Self::from_raw(value as u8)
        } else {
            None
        }
    }

    /// Check if current is flowing into the battery.
    pub fn is_charging(&self) -> bool {
        matches!(self, Self::Bulk | Self::TopUp)
    }

    /// Get a human-readable name for this state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bulk => "Charging (bulk)",
            Self::TopUp => "Charging (top-up)",
            Self::Full => "Fully charged",
            Self::OverTemperature => "Over temperature",
            Self::CableDisconnected => "Not charging",
        }
    }
}

impl std::fmt::Display for ChargeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Commands written to the mode command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DeviceCommand {
    /// Power off.
    MasterOff = 0,
    /// Go to sleep.
    Sleep = 1,
    /// Wake to idle.
    Idle = 2,
    /// Enter profile selection.
    TempSelectBegin = 3,
    /// Leave profile selection.
    TempSelectStop = 4,
    /// Show the battery level on the lantern.
    ShowBatteryLevel = 5,
    /// Show the firmware version on the lantern.
    ShowVersion = 6,
    /// Start a heat cycle with the current profile.
    HeatCycleStart = 7,
    /// Abort the running heat cycle.
    HeatCycleAbort = 8,
    /// Boost the running heat cycle.
    HeatCycleBoost = 9,
    /// Enter factory test mode.
    FactoryTest = 10,
    /// Enter pairing mode.
    Bonding = 11,
}

impl DeviceCommand {
    /// Convert to raw value.
    pub fn to_raw(self) -> u8 {
        self as u8
    }

    /// Encode the command as the device expects it.
    pub fn to_bytes(self) -> [u8; 4] {
        (self.to_raw() as f32).to_le_bytes()
    }
}
